//! # vaktprov Configuration System
//!
//! Layered configuration for the harness: how long the code under test may
//! run, how reports are rendered, and how much telemetry is emitted.
//!
//! ## Features
//! - **Layering**: defaults, then YAML files, then `VAKTPROV_*` environment
//! - **Validation**: every loaded value is checked with `validator`

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod report;
mod runner;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use report::ReportConfig;
pub use runner::RunnerConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/vaktprov.yaml";
const ENV_PREFIX: &str = "VAKTPROV_";

/// Top-level configuration container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Default)]
pub struct HarnessConfig {
    /// Limits applied to each scenario run.
    #[validate(nested)]
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Report rendering and bug report output.
    #[validate(nested)]
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging and metrics.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl HarnessConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/vaktprov.yaml`, if present
    /// 3. `config/<VAKTPROV_ENV>.yaml`, if present (`VAKTPROV_ENV` defaults to `default`)
    /// 4. `VAKTPROV_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(HarnessConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("VAKTPROV_ENV").unwrap_or_else(|_| "default".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific file, still honouring environment
    /// overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(HarnessConfig::default()))
            .merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
