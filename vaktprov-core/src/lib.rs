//! # vaktprov-core
//!
//! Scenario model and matching engine of the vaktprov conformance harness.
//!
//! A [`Scenario`] declares virtual interfaces and an ordered script of
//! [`ExpectedEvent`]s. While the code under test runs, every receive and send
//! it performs is fed to the scenario, which matches it against the next
//! unresolved event and records a verdict. Nothing in this crate performs
//! I/O on the network or sleeps: timeouts advance a [`VirtualClock`].
//!
//! ### Key Submodules:
//! - `scenario`: definition and run progress
//! - `matching`: the ordered matching rules
//! - `predicate` / `wildcard`: relaxed output matching
//! - `document`: YAML persistence and compiled envelopes

pub mod document;
pub mod error;
pub mod event;
pub mod interface;
pub mod matching;
pub mod packet;
pub mod predicate;
pub mod result;
pub mod scenario;
pub mod time;
pub mod wildcard;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::event::*;
    pub use crate::interface::*;
    pub use crate::packet::*;
    pub use crate::predicate::{Predicate, PredicateRegistry};
    pub use crate::result::*;
    pub use crate::scenario::Scenario;
    pub use crate::time::VirtualClock;
    pub use crate::wildcard::Wildcard;
}

pub use document::{CompiledScenario, ScenarioDocument};
pub use error::ScenarioError;
pub use event::{EventKind, ExpectedEvent};
pub use interface::{Interface, InterfaceRegistry};
pub use packet::Packet;
pub use predicate::{Predicate, PredicateRegistry};
pub use result::{
    Anomaly, Delivery, EventResult, FailureKind, Outcome, ReceiveOutcome, Resolution, Termination,
};
pub use scenario::Scenario;
pub use time::VirtualClock;
pub use wildcard::Wildcard;
pub use vaktprov_protocols::{HeaderKind, MacAddr};
