//! # vaktprov-engine
//!
//! Runs an implementation under test against a scenario: the execution shim
//! it talks to, the runner that supervises it, and the resulting report.

pub mod engine;
pub mod runtime;

pub use engine::{
    DiagnosticsCollector, PacketProcessor, Received, RecvError, RunError, RunReport,
    ScenarioRunner, Shim, ShutdownHandle,
};

// Re-export the runtime functions so frontends can simply do:
pub use runtime::{compile_scenario_file, inspect_scenario_file, run_scenario, run_scenario_file};
