//! Scenario runner - drives one implementation through one scenario
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use parking_lot::Mutex;
use tokio::task::JoinError;
use tokio::time::{interval_at, sleep, timeout, Interval};
use tracing::{debug, error, info, instrument, warn};

use vaktprov_config::HarnessConfig;
use vaktprov_core::{Scenario, Termination};
use vaktprov_telemetry::{logging::EventLogger, MetricsRecorder, RunSample};

use crate::engine::diagnostics::DiagnosticsCollector;
use crate::engine::error::RecvError;
use crate::engine::processor::PacketProcessor;
use crate::engine::report::RunReport;
use crate::engine::shim::{ShutdownHandle, Shim};

/// Runs implementations against scenarios and reports on them.
pub struct ScenarioRunner {
    /// Harness configuration parameters
    config: Arc<HarnessConfig>,
    /// Metrics collection subsystem
    metrics: Option<Arc<MetricsRecorder>>,
    /// Diagnostic data collector
    diagnostics: Mutex<DiagnosticsCollector>,
}

impl ScenarioRunner {
    pub fn new(config: HarnessConfig) -> Self {
        debug!(runner = ?config.runner, "initializing scenario runner");
        Self {
            config: Arc::new(config),
            metrics: None,
            diagnostics: Mutex::new(DiagnosticsCollector::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&MetricsRecorder> {
        self.metrics.as_deref()
    }

    /// Bug reports written by this runner so far.
    pub fn bug_reports(&self) -> Vec<std::path::PathBuf> {
        self.diagnostics.lock().bug_reports().to_vec()
    }

    /// Runs `entry` on its own task against a fresh copy of `scenario`'s
    /// script and reports on the outcome. Matching failures, crashes and
    /// overruns all end up in the report; this never fails.
    #[instrument(skip_all, fields(scenario = %scenario.name()))]
    pub async fn run<F, Fut>(&self, mut scenario: Scenario, entry: F) -> RunReport
    where
        F: FnOnce(Shim) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        info!(events = scenario.len(), "starting scenario run");
        let started = Instant::now();
        scenario.reset();

        let shared = Arc::new(Mutex::new(scenario));
        let shutdown = ShutdownHandle::new();
        let runner_config = Arc::new(self.config.runner.clone());
        let shim = Shim::new(shared.clone(), shutdown.clone(), runner_config.clone());

        let mut task = tokio::spawn(entry(shim));
        let deadline = sleep(runner_config.run_deadline());
        tokio::pin!(deadline);
        let mut idle = runner_config
            .idle_timeout()
            .map(|period| interval_at(tokio::time::Instant::now() + period, period));
        let mut last_calls = 0;

        let termination = loop {
            tokio::select! {
                joined = &mut task => break classify(joined),
                _ = &mut deadline => {
                    warn!(deadline = ?runner_config.run_deadline(), "run deadline exceeded, signalling shutdown");
                    shutdown.shutdown();
                    let outcome = match timeout(runner_config.shutdown_grace(), &mut task).await {
                        Ok(joined) => classify(joined),
                        Err(_) => {
                            warn!("implementation ignored shutdown, aborting task");
                            task.abort();
                            Termination::Returned
                        }
                    };
                    break match outcome {
                        crash @ Termination::Crashed(_) => crash,
                        _ => Termination::DeadlineExceeded(runner_config.run_deadline()),
                    };
                }
                _ = tick(&mut idle) => {
                    let mut s = shared.lock();
                    if s.calls() != last_calls {
                        last_calls = s.calls();
                    } else if s.done() && runner_config.shutdown_on_done {
                        debug!("idle after script exhausted, signalling shutdown");
                        shutdown.shutdown();
                    } else {
                        debug!(cursor = s.cursor(), "idle period elapsed");
                        s.on_timeout_elapsed();
                        last_calls = s.calls();
                    }
                }
            }
        };

        let scenario = {
            let mut s = shared.lock();
            s.finish(termination);
            s.clone()
        };
        let report = RunReport::from_scenario(&scenario, started.elapsed());
        self.complete(&scenario, &report).await;
        report
    }

    /// Runs a named processor through [`ScenarioRunner::run`].
    pub async fn run_processor(
        &self,
        scenario: Scenario,
        processor: Arc<dyn PacketProcessor>,
    ) -> RunReport {
        debug!(processor = processor.name(), "running processor");
        self.run(scenario, move |shim| async move { processor.run(shim).await })
            .await
    }

    async fn complete(&self, scenario: &Scenario, report: &RunReport) {
        if report.all_passed {
            info!(passed = report.passed_count, "scenario passed");
        } else {
            warn!(
                passed = report.passed_count,
                failed = report.failed_count,
                pending = report.pending_count,
                anomalies = report.anomaly_count(),
                crashed = report.crashed,
                "scenario failed"
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_run(&RunSample {
                passed: report.passed_count,
                failed: report.failed_count,
                pending: report.pending_count,
                anomalies: report.anomaly_count(),
                crashed: report.crashed,
                wall_time: report.wall_time,
            });
        }

        if let (false, Some(dir)) = (report.all_passed, &self.config.report.bug_report_dir) {
            let written = self
                .diagnostics
                .lock()
                .record_bug_report(dir, scenario, report);
            if let Err(e) = written {
                error!("Failed to write bug report: {e}");
            }
        }

        EventLogger::log_event(
            "run_complete",
            vec![
                KeyValue::new("scenario", report.scenario.clone()),
                KeyValue::new("passed", report.passed_count as i64),
                KeyValue::new("failed", report.failed_count as i64),
                KeyValue::new("pending", report.pending_count as i64),
                KeyValue::new("anomalies", report.anomaly_count() as i64),
                KeyValue::new("all_passed", report.all_passed),
            ],
        )
        .await;
    }
}

async fn tick(idle: &mut Option<Interval>) {
    match idle {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn classify(joined: Result<anyhow::Result<()>, JoinError>) -> Termination {
    match joined {
        Ok(Ok(())) => Termination::Returned,
        Ok(Err(e)) if e.downcast_ref::<RecvError>() == Some(&RecvError::Shutdown) => {
            debug!("implementation propagated shutdown");
            Termination::Returned
        }
        Ok(Err(e)) => {
            error!("implementation returned an error: {e:#}");
            Termination::Crashed(format!("{e:#}"))
        }
        Err(e) if e.is_panic() => {
            let reason = panic_message(e.into_panic());
            error!("implementation panicked: {reason}");
            Termination::Crashed(format!("panicked: {reason}"))
        }
        Err(e) => Termination::Crashed(e.to_string()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Ok(Ok(()))), Termination::Returned);
        assert_eq!(
            classify(Ok(Err(anyhow::Error::new(RecvError::Shutdown)))),
            Termination::Returned
        );
        assert_eq!(
            classify(Ok(Err(anyhow::anyhow!("bad table")))),
            Termination::Crashed("bad table".into())
        );
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic payload");
    }
}
