//! ## vaktprov-core::scenario
//! **Scenario definition and run progress**
//!
//! A scenario is the script the code under test is held against: the
//! interfaces it owns, text files it may read, and the ordered events it must
//! produce or consume. Progress through the script lives next to the
//! definition so that one value can be handed to a run and inspected
//! afterwards. The matching rules themselves are in [`crate::matching`].

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use vaktprov_protocols::MacAddr;

use crate::error::ScenarioError;
use crate::event::ExpectedEvent;
use crate::interface::{Interface, InterfaceRegistry};
use crate::result::{Anomaly, EventResult, Outcome, Termination};
use crate::time::VirtualClock;

#[derive(Debug, Default)]
pub(crate) struct Progress {
    pub(crate) cursor: usize,
    pub(crate) completed: Vec<EventResult>,
    pub(crate) anomalies: Vec<Anomaly>,
    pub(crate) clock: VirtualClock,
    pub(crate) calls: u64,
    pub(crate) termination: Option<Termination>,
}

// A cloned scenario must not share virtual time with the original.
impl Clone for Progress {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            completed: self.completed.clone(),
            anomalies: self.anomalies.clone(),
            clock: self.clock.fork(),
            calls: self.calls,
            termination: self.termination.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    interfaces: InterfaceRegistry,
    files: BTreeMap<String, String>,
    events: Vec<ExpectedEvent>,
    pub(crate) progress: Progress,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: InterfaceRegistry::new(),
            files: BTreeMap::new(),
            events: Vec::new(),
            progress: Progress::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_interface(
        &mut self,
        name: impl Into<String>,
        mac: MacAddr,
        ip: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<&Interface, ScenarioError> {
        let name = name.into();
        self.interfaces
            .insert(Interface::new(name.clone(), mac, ip, netmask)?)?;
        self.interfaces
            .get(&name)
            .ok_or(ScenarioError::UnknownInterface(name))
    }

    /// Attaches a named text file the implementation can read at run time.
    /// A later file with the same name replaces the earlier one.
    pub fn add_file(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(name.into(), contents.into());
    }

    pub fn file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Appends an event to the script.
    pub fn expect(&mut self, event: ExpectedEvent) -> Result<(), ScenarioError> {
        if let Some(name) = event.interface() {
            if !self.interfaces.contains(name) {
                return Err(ScenarioError::UnknownInterface(name.to_string()));
            }
        }
        self.events.push(event);
        Ok(())
    }

    pub fn interfaces(&self) -> &InterfaceRegistry {
        &self.interfaces
    }

    pub fn events(&self) -> &[ExpectedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True once every event has been resolved.
    pub fn done(&self) -> bool {
        self.progress.cursor >= self.events.len()
    }

    pub fn next_expected(&self) -> Option<&ExpectedEvent> {
        self.events.get(self.progress.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.progress.cursor
    }

    /// Events not yet resolved, in script order.
    pub fn pending(&self) -> &[ExpectedEvent] {
        &self.events[self.progress.cursor.min(self.events.len())..]
    }

    pub fn completed(&self) -> &[EventResult] {
        &self.progress.completed
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.progress.anomalies
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.progress.termination.as_ref()
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.progress.clock
    }

    /// Virtual time elapsed since the run started.
    pub fn elapsed(&self) -> Duration {
        self.progress.clock.now()
    }

    /// Number of engine calls made so far.
    pub fn calls(&self) -> u64 {
        self.progress.calls
    }

    pub fn passed_count(&self) -> usize {
        self.count(Outcome::Passed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(Outcome::Failed)
    }

    pub fn pending_count(&self) -> usize {
        self.events.len() - self.passed_count() - self.failed_count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.progress
            .completed
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }

    /// Discards all run progress so the script can be replayed.
    pub fn reset(&mut self) {
        self.progress = Progress::default();
    }
}

/// Two scenarios are equal when their definitions are; run progress is
/// ignored.
impl PartialEq for Scenario {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.interfaces == other.interfaces
            && self.files == other.files
            && self.events == other.events
    }
}
