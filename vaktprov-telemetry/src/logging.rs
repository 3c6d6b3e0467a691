//! ## vaktprov-telemetry::logging
//! Structured logging with tracing and OpenTelemetry key/value metadata.

use opentelemetry::KeyValue;
use tracing::{info_span, Instrument};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` overrides `default_level`.
    /// Returns false when a subscriber was already installed.
    pub fn init(default_level: &str) -> bool {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_target(false)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .is_ok()
    }

    /// Emits one structured harness event, e.g. `run_complete`.
    pub async fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "harness_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );

        async {
            let fields = metadata
                .iter()
                .map(|kv| format!("{}={}", kv.key, kv.value))
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!(metadata = %fields, "Harness event recorded");
        }
        .instrument(span)
        .await
    }
}
