//! Report rendering options.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ReportConfig {
    /// Include anomaly timestamps and termination details.
    #[serde(default)]
    pub verbose: bool,

    /// List events that could not be tested.
    #[serde(default = "default_true")]
    pub show_pending: bool,

    /// Directory receiving a YAML report for every failing run.
    #[serde(default)]
    #[validate(custom(function = validation::validate_report_dir))]
    pub bug_report_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            show_pending: default_true(),
            bug_report_dir: None,
        }
    }
}
