//! Presence Service binary

use nexus_core::{MicroserviceRuntime, NexusError, Result};
use nexus_telemetry::TelemetryConfig;
use presence_service::PresenceService;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = nexus_telemetry::init_with(
        TelemetryConfig::from_env()
            .with_service_name("presence-service")
            .with_directive("presence_service=debug"),
    )
    .map_err(|e| NexusError::Config(e.to_string()))?;

    info!("Starting Presence microservice");

    let service = Arc::new(PresenceService::new()?);
    MicroserviceRuntime::run(service).await
}
