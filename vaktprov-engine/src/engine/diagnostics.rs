use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use vaktprov_core::{Scenario, ScenarioDocument};

use crate::engine::error::RunError;
use crate::engine::report::RunReport;

/// Everything needed to reproduce a failing run.
#[derive(Debug, Serialize)]
struct BugReport<'a> {
    generated_at: DateTime<Utc>,
    scenario_digest: &'a str,
    report: &'a RunReport,
    scenario: ScenarioDocument,
}

#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    bug_reports: Vec<PathBuf>,
    scenario_hashes: HashMap<String, String>,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `bug_report_<scenario>_<timestamp>.yaml` into `dir`.
    pub fn record_bug_report(
        &mut self,
        dir: &Path,
        scenario: &Scenario,
        report: &RunReport,
    ) -> Result<PathBuf, RunError> {
        let document = scenario.to_document();
        let digest = document.digest()?;
        self.record_scenario_hash(scenario.name(), &digest);

        let now = Utc::now();
        let bug = BugReport {
            generated_at: now,
            scenario_digest: &digest,
            report,
            scenario: document,
        };

        fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "bug_report_{}_{}.yaml",
            sanitize(scenario.name()),
            now.format("%Y%m%dT%H%M%S%3f")
        ));
        fs::write(&path, serde_yaml::to_string(&bug)?)?;
        info!(path = %path.display(), "bug report written");

        self.bug_reports.push(path.clone());
        Ok(path)
    }

    pub fn record_scenario_hash(&mut self, scenario: &str, hash: &str) {
        self.scenario_hashes
            .insert(scenario.to_string(), hash.to_string());
    }

    pub fn bug_reports(&self) -> &[PathBuf] {
        &self.bug_reports
    }

    pub fn scenario_hash(&self, scenario: &str) -> Option<&str> {
        self.scenario_hashes.get(scenario).map(String::as_str)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vaktprov_core::Termination;

    #[test]
    fn test_writes_report() {
        let dir = std::env::temp_dir().join(format!("vaktprov-diag-{}", std::process::id()));
        let mut scenario = Scenario::new("arp test/1");
        scenario.finish(Termination::Crashed("boom".into()));
        let report = RunReport::from_scenario(&scenario, Duration::ZERO);

        let mut diagnostics = DiagnosticsCollector::new();
        let path = diagnostics
            .record_bug_report(&dir, &scenario, &report)
            .unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("bug_report_arp_test_1_"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("scenario_digest"));
        assert!(text.contains("boom"));
        assert_eq!(diagnostics.bug_reports().len(), 1);
        assert_eq!(diagnostics.scenario_hash("arp test/1").map(str::len), Some(64));
        let _ = fs::remove_dir_all(dir);
    }
}
