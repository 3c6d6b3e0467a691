//! ## vaktprov-core::event
//! Scripted events of a scenario.

use std::time::Duration;

use vaktprov_protocols::HeaderKind;

use crate::packet::Packet;
use crate::predicate::Predicate;
use crate::wildcard::Wildcard;

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A packet the implementation will receive.
    Input { interface: String, packet: Packet },
    /// A packet the implementation must send.
    Output {
        interface: String,
        packet: Packet,
        exact: bool,
        predicates: Vec<Predicate>,
        wildcards: Vec<Wildcard>,
    },
    /// A period during which nothing should arrive or be sent.
    Timeout { duration: Option<Duration> },
}

/// One step of the script. Never mutated once added to a scenario: the
/// outcome of an event is kept in the scenario's run progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedEvent {
    pub kind: EventKind,
    pub description: String,
    pub display: Option<HeaderKind>,
}

impl ExpectedEvent {
    pub fn input(
        interface: impl Into<String>,
        packet: impl Into<Packet>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Input {
                interface: interface.into(),
                packet: packet.into(),
            },
            description: description.into(),
            display: None,
        }
    }

    /// An exact output event; relax it with [`ExpectedEvent::inexact`].
    pub fn output(
        interface: impl Into<String>,
        packet: impl Into<Packet>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Output {
                interface: interface.into(),
                packet: packet.into(),
                exact: true,
                predicates: Vec::new(),
                wildcards: Vec::new(),
            },
            description: description.into(),
            display: None,
        }
    }

    pub fn timeout(duration: Option<Duration>, description: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Timeout { duration },
            description: description.into(),
            display: None,
        }
    }

    /// Matches the output by predicates instead of bytes. No effect on
    /// other event kinds.
    pub fn inexact(mut self) -> Self {
        if let EventKind::Output { exact, .. } = &mut self.kind {
            *exact = false;
        }
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        if let EventKind::Output { predicates, .. } = &mut self.kind {
            predicates.push(predicate);
        }
        self
    }

    pub fn with_wildcard(mut self, wildcard: Wildcard) -> Self {
        if let EventKind::Output { wildcards, .. } = &mut self.kind {
            if !wildcards.contains(&wildcard) {
                wildcards.push(wildcard);
            }
        }
        self
    }

    pub fn display(mut self, kind: HeaderKind) -> Self {
        self.display = Some(kind);
        self
    }

    pub fn interface(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Input { interface, .. } | EventKind::Output { interface, .. } => {
                Some(interface)
            }
            EventKind::Timeout { .. } => None,
        }
    }

    pub fn packet(&self) -> Option<&Packet> {
        match &self.kind {
            EventKind::Input { packet, .. } | EventKind::Output { packet, .. } => Some(packet),
            EventKind::Timeout { .. } => None,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, EventKind::Input { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self.kind, EventKind::Output { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, EventKind::Timeout { .. })
    }

    /// Name of the shim call that would satisfy this event.
    pub fn awaited_call(&self) -> &'static str {
        match self.kind {
            EventKind::Output { .. } => "send_packet",
            EventKind::Input { .. } | EventKind::Timeout { .. } => "recv_packet",
        }
    }

    /// Short form used in logs and inspection output.
    pub fn summary(&self) -> String {
        match &self.kind {
            EventKind::Input { interface, packet } => {
                format!("input on {interface}: {}", packet.summary(self.display))
            }
            EventKind::Output {
                interface,
                packet,
                exact,
                ..
            } => format!(
                "{} output on {interface}: {}",
                if *exact { "exact" } else { "inexact" },
                packet.summary(self.display)
            ),
            EventKind::Timeout {
                duration: Some(duration),
            } => format!("timeout after {duration:?}"),
            EventKind::Timeout { duration: None } => "timeout".to_string(),
        }
    }
}
