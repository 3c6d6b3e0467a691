use thiserror::Error;
use vaktprov_config::ConfigError;
use vaktprov_core::ScenarioError;

/// Recoverable signals returned by `recv_packet`. Propagating `Shutdown`
/// out of the implementation with `?` counts as a clean return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    #[error("no packets available")]
    NoPackets,

    #[error("shutdown requested by the harness")]
    Shutdown,
}

/// Failures of the harness itself, never of the code under test.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
