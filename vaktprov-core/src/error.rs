use std::net::Ipv4Addr;

use thiserror::Error;

/// Errors raised while building, loading or saving a scenario. None of these
/// can occur while a scenario is being run.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("interface `{0}` is already defined")]
    DuplicateInterface(String),

    #[error("event references unknown interface `{0}`")]
    UnknownInterface(String),

    #[error("invalid netmask {netmask} for interface `{name}`")]
    InvalidNetmask { name: String, netmask: Ipv4Addr },

    #[error("invalid packet encoding: {0}")]
    InvalidPacket(#[from] hex::FromHexError),

    #[error("unknown predicate `{0}`")]
    UnknownPredicate(String),

    #[error("invalid predicate `{expr}`: {reason}")]
    InvalidPredicate { expr: String, reason: String },

    #[error("compiled scenario digest mismatch (recorded {recorded}, computed {computed})")]
    ChecksumMismatch { recorded: String, computed: String },

    #[error("unsupported scenario format `{0}`")]
    UnsupportedFormat(String),

    #[error("scenario I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scenario parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
