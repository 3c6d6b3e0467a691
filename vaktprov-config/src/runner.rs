//! Limits applied while the code under test runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Scenario runner configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Wall-clock limit for one run; the implementation is told to shut down
    /// and then aborted once it passes.
    #[serde(default = "default_run_deadline_ms")]
    #[validate(range(min = 1, max = 600000))]
    pub run_deadline_ms: u64,

    /// Period without any shim call after which a scripted timeout counts as
    /// observed. 0 disables the idle timer.
    #[serde(default)]
    #[validate(range(max = 60000))]
    pub idle_timeout_ms: u64,

    /// Time between the shutdown signal and aborting the task.
    #[serde(default = "default_shutdown_grace_ms")]
    #[validate(range(max = 60000))]
    pub shutdown_grace_ms: u64,

    /// Return `Shutdown` from `recv_packet` once the script is exhausted
    /// instead of recording an extra call.
    #[serde(default = "default_true")]
    pub shutdown_on_done: bool,

    /// Timeout used when the implementation passes none to `recv_packet`.
    #[serde(default)]
    pub default_recv_timeout_ms: Option<u64>,
}

fn default_run_deadline_ms() -> u64 {
    5000
}

fn default_shutdown_grace_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

impl RunnerConfig {
    pub fn run_deadline(&self) -> Duration {
        Duration::from_millis(self.run_deadline_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn default_recv_timeout(&self) -> Option<Duration> {
        self.default_recv_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            run_deadline_ms: default_run_deadline_ms(),
            idle_timeout_ms: 0,
            shutdown_grace_ms: default_shutdown_grace_ms(),
            shutdown_on_done: default_true(),
            default_recv_timeout_ms: None,
        }
    }
}
