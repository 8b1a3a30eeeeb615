//! Nexus Telemetry
//!
//! Structured logging setup and lightweight in-process metrics.

mod config;
mod tracing_setup;
mod metrics;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;
pub use metrics::{Counter, Histogram, Gauge};

/// Initialize telemetry from an explicit configuration
pub fn init_with(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_tracing(&config.service_name, &config)?;
    Ok(TelemetryGuard { _private: () })
}

/// Guard that flushes telemetry on drop
pub struct TelemetryGuard {
    _private: (),
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[error("Invalid log directive: {0}")]
    Directive(String),
}
