//! ## vaktprov-telemetry::metrics
//! **Prometheus counters and histograms for scenario runs**

use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

/// Summary of one finished run, as fed to [`MetricsRecorder::record_run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSample {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub anomalies: usize,
    pub crashed: bool,
    pub wall_time: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub runs: IntCounter,
    pub events: IntCounterVec,
    pub anomalies: IntCounter,
    pub crashes: IntCounter,
    pub run_duration: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let runs = IntCounter::new("vaktprov_runs_total", "Scenario runs completed")?;
        let events = IntCounterVec::new(
            Opts::new("vaktprov_events_total", "Scripted events by final outcome"),
            &["outcome"],
        )?;
        let anomalies = IntCounter::new(
            "vaktprov_anomalies_total",
            "Calls that did not resolve any scripted event",
        )?;
        let crashes = IntCounter::new("vaktprov_crashes_total", "Runs whose implementation crashed")?;
        let run_duration = Histogram::with_opts(
            HistogramOpts::new("vaktprov_run_duration_seconds", "Wall-clock time per run")
                .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0]),
        )?;

        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(anomalies.clone()))?;
        registry.register(Box::new(crashes.clone()))?;
        registry.register(Box::new(run_duration.clone()))?;

        Ok(Self {
            registry,
            runs,
            events,
            anomalies,
            crashes,
            run_duration,
        })
    }

    pub fn record_run(&self, sample: &RunSample) {
        self.runs.inc();
        for (outcome, count) in [
            ("passed", sample.passed),
            ("failed", sample.failed),
            ("pending", sample.pending),
        ] {
            self.events
                .with_label_values(&[outcome])
                .inc_by(count as u64);
        }
        self.anomalies.inc_by(sample.anomalies as u64);
        if sample.crashed {
            self.crashes.inc();
        }
        self.run_duration.observe(sample.wall_time.as_secs_f64());
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
