//! Run reports: per-event verdict lines, counts and the final verdict text.
use std::fmt::Write;
use std::time::Duration;

use serde::Serialize;

use vaktprov_config::ReportConfig;
use vaktprov_core::{Anomaly, EventResult, Outcome, Scenario, Termination};

/// Outcome of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub passed_count: usize,
    pub failed_count: usize,
    pub pending_count: usize,
    /// One line per passed, failed and pending event, then one per anomaly.
    /// Passed and pending lines are numbered within their own section.
    pub lines: Vec<String>,
    pub all_passed: bool,
    pub crashed: bool,
    pub termination: Option<Termination>,
    pub results: Vec<EventResult>,
    pub anomalies: Vec<Anomaly>,
    /// `(index, description)` of every event that was never resolved.
    pub pending: Vec<(usize, String)>,
    /// Virtual time consumed by the script.
    pub elapsed: Duration,
    /// Real time the run took.
    pub wall_time: Duration,
}

impl RunReport {
    /// Builds the report of a finished scenario.
    pub fn from_scenario(scenario: &Scenario, wall_time: Duration) -> Self {
        let results = scenario.completed().to_vec();
        let anomalies = scenario.anomalies().to_vec();
        let pending: Vec<(usize, String)> = scenario
            .pending()
            .iter()
            .enumerate()
            .map(|(offset, event)| (scenario.cursor() + offset, event.description.clone()))
            .collect();
        let termination = scenario.termination().cloned();
        let crashed = termination.as_ref().is_some_and(Termination::is_crash);

        let passed_count = scenario.passed_count();
        let failed_count = scenario.failed_count();
        let pending_count = scenario.len() - passed_count - failed_count;

        let mut lines = Vec::with_capacity(results.len() + pending.len() + anomalies.len());
        lines.extend(
            results
                .iter()
                .filter(|r| r.passed())
                .enumerate()
                .map(|(n, r)| format!("Passed: {} {}", n + 1, r.description)),
        );
        lines.extend(results.iter().filter(|r| !r.passed()).map(|r| {
            format!(
                "Failed: {} \u{2014} {}",
                r.description,
                r.message.as_deref().unwrap_or("failed")
            )
        }));
        lines.extend(
            pending
                .iter()
                .enumerate()
                .map(|(n, (_, description))| format!("Pending: {} {}", n + 1, description)),
        );
        lines.extend(anomalies.iter().map(|a| format!("Failed: {}", anomaly_text(a))));

        let all_passed = failed_count == 0 && pending_count == 0 && anomalies.is_empty() && !crashed;

        Self {
            scenario: scenario.name().to_string(),
            passed_count,
            failed_count,
            pending_count,
            lines,
            all_passed,
            crashed,
            termination,
            results,
            anomalies,
            pending,
            elapsed: scenario.elapsed(),
            wall_time,
        }
    }

    /// Every anomalous call, counting folded repeats.
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().map(|a| a.repeats).sum()
    }

    pub fn verdict(&self) -> String {
        if let Some(Termination::Crashed(reason)) = &self.termination {
            format!("Your code crashed (or caused the harness to crash) before all tests completed: {reason}")
        } else if self.all_passed {
            "All tests passed!".to_string()
        } else {
            "Your code didn't crash, but something unexpected happened.".to_string()
        }
    }

    /// Human-readable report.
    pub fn render(&self, config: &ReportConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Results for test scenario {}: {} passed, {} failed, {} pending",
            self.scenario, self.passed_count, self.failed_count, self.pending_count
        );

        let passed: Vec<_> = self.results.iter().filter(|r| r.passed()).collect();
        if !passed.is_empty() {
            out.push_str("\nPassed:\n");
            for (n, r) in passed.into_iter().enumerate() {
                let _ = writeln!(out, "{:<4}{}", n + 1, r.description);
            }
        }

        let failed: Vec<_> = self
            .results
            .iter()
            .filter(|r| r.outcome == Outcome::Failed)
            .collect();
        if !failed.is_empty() || !self.anomalies.is_empty() {
            out.push_str("\nFailed:\n");
            for r in failed {
                let _ = writeln!(out, "    {}", r.description);
                if let Some(message) = &r.message {
                    let _ = writeln!(out, "        {message}");
                }
            }
            for a in &self.anomalies {
                let _ = writeln!(out, "    {}", anomaly_text(a));
                if config.verbose {
                    let _ = writeln!(out, "        ({} at {:?}, event {})", a.kind, a.at, a.cursor + 1);
                }
            }
        }

        if config.show_pending && !self.pending.is_empty() {
            out.push_str("\nPending (couldn't test because of prior failure):\n");
            for (n, (_, description)) in self.pending.iter().enumerate() {
                let _ = writeln!(out, "{:<4}{}", n + 1, description);
            }
        }

        if config.verbose {
            let _ = writeln!(
                out,
                "\nTermination: {:?}, virtual time {:?}, wall time {:?}",
                self.termination, self.elapsed, self.wall_time
            );
        }

        let _ = writeln!(out, "\n{}", self.verdict());
        out
    }
}

fn anomaly_text(anomaly: &Anomaly) -> String {
    match anomaly.repeats {
        0 | 1 => anomaly.message.clone(),
        n => format!("{} (repeated {n} times)", anomaly.message),
    }
}
