//! Runs one presence session against a live server until Ctrl+C

use anyhow::{Context, Result};
use nexus_core::Role;
use nexus_presence_client::{ClientConfig, HttpTransport, PresenceClient, SessionIdentity};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = nexus_telemetry::init_with(
        nexus_telemetry::TelemetryConfig::from_env()
            .with_service_name("presence-sim")
            .with_directive("nexus_presence_client=debug"),
    )?;

    let config = ClientConfig::from_env()?;
    let token = std::env::var("PRESENCE_TOKEN").context("PRESENCE_TOKEN must be set")?;
    let user_id = std::env::var("PRESENCE_USER_ID").context("PRESENCE_USER_ID must be set")?;
    let role = std::env::var("PRESENCE_ROLE")
        .map(|raw| Role::from(raw.as_str()))
        .unwrap_or(Role::InternalUser);

    let transport =
        Arc::new(HttpTransport::new(&config.base_url, config.request_timeout)?.with_token(token));
    let client = PresenceClient::new(transport, config);
    let mut updates = client.subscribe();

    client.start(SessionIdentity::new(user_id, role)).await;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().clone();
                info!(
                    phase = ?status.phase,
                    health = ?status.health,
                    retry_count = status.retry_count,
                    online_total = status.online_total,
                    roster = status.roster.len(),
                    "Presence status"
                );
                if status.phase.is_terminal() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                break;
            }
        }
    }

    client.stop().await;
    let latency = client.heartbeat_latency();
    info!(
        samples = latency.count(),
        p50_ms = latency.percentile(50.0),
        p99_ms = latency.percentile(99.0),
        "Presence session ended"
    );
    Ok(())
}
