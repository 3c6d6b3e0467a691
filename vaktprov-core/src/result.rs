//! ## vaktprov-core::result
//! Verdicts recorded while a scenario runs.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::packet::Packet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
}

/// Why an event or the run itself failed. Recorded, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DeviceMismatch,
    ExactMatchFailed,
    PredicateMatchFailed,
    OrderViolation,
    UnexpectedTimeout,
    UnexpectedExtraCall,
    ImplementationCrash,
    ImplementationReturned,
    DeadlineExceeded,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::DeviceMismatch => "device mismatch",
            FailureKind::ExactMatchFailed => "exact match failed",
            FailureKind::PredicateMatchFailed => "predicate match failed",
            FailureKind::OrderViolation => "order violation",
            FailureKind::UnexpectedTimeout => "unexpected timeout",
            FailureKind::UnexpectedExtraCall => "unexpected extra call",
            FailureKind::ImplementationCrash => "implementation crashed",
            FailureKind::ImplementationReturned => "implementation returned",
            FailureKind::DeadlineExceeded => "deadline exceeded",
        };
        f.write_str(text)
    }
}

/// Verdict for one resolved event. `at` is the virtual time of resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventResult {
    pub index: usize,
    pub description: String,
    pub outcome: Outcome,
    pub failure: Option<FailureKind>,
    pub message: Option<String>,
    pub at: Duration,
}

impl EventResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// A failure that does not resolve any event, e.g. a send after the script
/// was exhausted. `cursor` is the event that was current at the time.
/// Back-to-back identical anomalies are folded into one entry; `at` is the
/// first occurrence and `repeats` counts all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub kind: FailureKind,
    pub message: String,
    pub cursor: usize,
    pub at: Duration,
    pub repeats: usize,
}

/// How the implementation under test stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Returned,
    Crashed(String),
    DeadlineExceeded(Duration),
}

impl Termination {
    pub fn is_crash(&self) -> bool {
        matches!(self, Termination::Crashed(_))
    }

    pub(crate) fn failure(&self) -> (FailureKind, String) {
        match self {
            Termination::Returned => (
                FailureKind::ImplementationReturned,
                "your code returned before this event was handled".to_string(),
            ),
            Termination::Crashed(reason) => (
                FailureKind::ImplementationCrash,
                format!("your code crashed before this event was handled: {reason}"),
            ),
            Termination::DeadlineExceeded(limit) => (
                FailureKind::DeadlineExceeded,
                format!("your code did not finish within {limit:?}"),
            ),
        }
    }
}

/// What a single engine call did to the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Passed { index: usize },
    Failed { index: usize, kind: FailureKind },
    Anomaly(FailureKind),
}

impl Resolution {
    pub fn is_passed(&self) -> bool {
        matches!(self, Resolution::Passed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub timestamp: Duration,
    pub interface: String,
    pub packet: Packet,
}

/// Result of a receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Delivered(Delivery),
    NoPackets(Resolution),
}
