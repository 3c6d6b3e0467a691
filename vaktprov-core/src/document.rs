//! ## vaktprov-core::document
//! **Scenario persistence**
//!
//! A scenario is stored as a YAML document: interfaces, attached files and
//! events, with packets written as hex and predicates by name. The compiled
//! form wraps the same document in an envelope carrying a blake3 digest of
//! its canonical YAML so that a tampered or truncated file is rejected.
//!
//! ```yaml
//! name: arp
//! interfaces:
//!   - name: eth0
//!     mac: 10:00:00:00:00:01
//!     ip: 192.168.1.1
//!     netmask: 255.255.255.0
//! events:
//!   - kind: input
//!     interface: eth0
//!     packet: ffffffffffff...
//!     description: ARP request arrives
//!   - kind: timeout
//!     duration: {secs: 1, nanos: 500000}
//!     description: nothing else happens
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vaktprov_protocols::HeaderKind;

use crate::error::ScenarioError;
use crate::event::{EventKind, ExpectedEvent};
use crate::interface::Interface;
use crate::packet::Packet;
use crate::predicate::PredicateRegistry;
use crate::scenario::Scenario;
use crate::wildcard::Wildcard;

pub const COMPILED_FORMAT: &str = "vaktprov/compiled-v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub events: Vec<EventDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventDocument {
    Input {
        interface: String,
        packet: String,
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display: Option<HeaderKind>,
    },
    Output {
        interface: String,
        packet: String,
        description: String,
        #[serde(default = "exact_by_default")]
        exact: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        predicates: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        wildcards: Vec<Wildcard>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display: Option<HeaderKind>,
    },
    Timeout {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<Duration>,
        description: String,
    },
}

fn exact_by_default() -> bool {
    true
}

/// Envelope written by `vaktprov compile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledScenario {
    pub format: String,
    pub digest: String,
    pub document: ScenarioDocument,
}

impl ScenarioDocument {
    /// Canonical digest: blake3 over the document's YAML form.
    pub fn digest(&self) -> Result<String, ScenarioError> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(blake3::hash(yaml.as_bytes()).to_hex().to_string())
    }

    pub fn compile(self) -> Result<CompiledScenario, ScenarioError> {
        Ok(CompiledScenario {
            format: COMPILED_FORMAT.to_string(),
            digest: self.digest()?,
            document: self,
        })
    }

    /// Parses either a plain document or a compiled envelope, verifying the
    /// envelope's digest.
    pub fn parse(text: &str) -> Result<Self, ScenarioError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        if value.get("format").is_none() {
            return Ok(serde_yaml::from_value(value)?);
        }

        let compiled: CompiledScenario = serde_yaml::from_value(value)?;
        if compiled.format != COMPILED_FORMAT {
            return Err(ScenarioError::UnsupportedFormat(compiled.format));
        }
        let computed = compiled.document.digest()?;
        if computed != compiled.digest {
            return Err(ScenarioError::ChecksumMismatch {
                recorded: compiled.digest,
                computed,
            });
        }
        Ok(compiled.document)
    }
}

impl Scenario {
    pub fn to_document(&self) -> ScenarioDocument {
        ScenarioDocument {
            name: self.name().to_string(),
            interfaces: self.interfaces().iter().cloned().collect(),
            files: self
                .files()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            events: self.events().iter().map(event_document).collect(),
        }
    }

    /// Rebuilds a scenario definition; predicate names are resolved through
    /// `registry`.
    pub fn from_document(
        doc: ScenarioDocument,
        registry: &PredicateRegistry,
    ) -> Result<Self, ScenarioError> {
        let mut scenario = Scenario::new(doc.name);
        for iface in doc.interfaces {
            scenario.add_interface(iface.name, iface.mac, iface.ip, iface.netmask)?;
        }
        for (name, contents) in doc.files {
            scenario.add_file(name, contents);
        }
        for event in doc.events {
            scenario.expect(expected_event(event, registry)?)?;
        }
        Ok(scenario)
    }

    pub fn to_yaml(&self) -> Result<String, ScenarioError> {
        Ok(serde_yaml::to_string(&self.to_document())?)
    }

    /// Compiled envelope as YAML.
    pub fn compile(&self) -> Result<String, ScenarioError> {
        Ok(serde_yaml::to_string(&self.to_document().compile()?)?)
    }

    /// Loads a plain or compiled scenario from YAML text.
    pub fn from_yaml(text: &str, registry: &PredicateRegistry) -> Result<Self, ScenarioError> {
        Self::from_document(ScenarioDocument::parse(text)?, registry)
    }

    pub fn load_from_file(
        path: impl AsRef<Path>,
        registry: &PredicateRegistry,
    ) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading scenario");
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text, registry)
    }
}

fn event_document(event: &ExpectedEvent) -> EventDocument {
    let description = event.description.clone();
    match &event.kind {
        EventKind::Input { interface, packet } => EventDocument::Input {
            interface: interface.clone(),
            packet: packet.to_hex(),
            description,
            display: event.display,
        },
        EventKind::Output {
            interface,
            packet,
            exact,
            predicates,
            wildcards,
        } => EventDocument::Output {
            interface: interface.clone(),
            packet: packet.to_hex(),
            description,
            exact: *exact,
            predicates: predicates.iter().map(|p| p.name().to_string()).collect(),
            wildcards: wildcards.clone(),
            display: event.display,
        },
        EventKind::Timeout { duration } => EventDocument::Timeout {
            duration: *duration,
            description,
        },
    }
}

fn expected_event(
    doc: EventDocument,
    registry: &PredicateRegistry,
) -> Result<ExpectedEvent, ScenarioError> {
    let event = match doc {
        EventDocument::Input {
            interface,
            packet,
            description,
            display,
        } => {
            let event = ExpectedEvent::input(interface, Packet::from_hex(&packet)?, description);
            with_display(event, display)
        }
        EventDocument::Output {
            interface,
            packet,
            description,
            exact,
            predicates,
            wildcards,
            display,
        } => {
            let mut event =
                ExpectedEvent::output(interface, Packet::from_hex(&packet)?, description);
            if !exact {
                event = event.inexact();
            }
            for name in &predicates {
                event = event.with_predicate(registry.resolve(name)?);
            }
            for wildcard in wildcards {
                event = event.with_wildcard(wildcard);
            }
            with_display(event, display)
        }
        EventDocument::Timeout {
            duration,
            description,
        } => ExpectedEvent::timeout(duration, description),
    };
    Ok(event)
}

fn with_display(event: ExpectedEvent, display: Option<HeaderKind>) -> ExpectedEvent {
    match display {
        Some(kind) => event.display(kind),
        None => event,
    }
}
