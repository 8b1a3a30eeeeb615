//! Presence Service
//!
//! Tracks which authenticated identities are currently online:
//! - Online/heartbeat/offline announcements over REST
//! - Periodic eviction of entries that stopped heartbeating
//! - Role-gated roster, aggregate stats for every role

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod infrastructure;

pub use config::PresenceConfig;
pub use infrastructure::{PresenceStore, PresenceSweeper};

use axum::Router;
use nexus_core::{
    Clock, DependencyStatus, Environment, HealthStatus, MonotonicClock, NexusService, ReadinessStatus, Result,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use auth::{Authenticator, InMemoryUserDirectory, TokenService, UserDirectory};

pub struct PresenceService {
    config: PresenceConfig,
    store: Arc<PresenceStore>,
    sweeper: PresenceSweeper,
    auth: Arc<Authenticator>,
    start_time: std::time::Instant,
}

impl PresenceService {
    /// Build from environment; must run inside a tokio runtime
    pub fn new() -> Result<Self> {
        Self::with_config(PresenceConfig::from_env()?)
    }

    /// Loads the user directory from `users_file` when configured
    pub fn with_config(config: PresenceConfig) -> Result<Self> {
        let directory: Option<Arc<dyn UserDirectory>> = match &config.users_file {
            Some(path) => Some(Arc::new(InMemoryUserDirectory::load(path)?)),
            None => None,
        };
        Ok(Self::with_directory(config, directory))
    }

    pub fn with_directory(config: PresenceConfig, directory: Option<Arc<dyn UserDirectory>>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        Self::with_clock(config, directory, clock)
    }

    pub fn with_clock(
        config: PresenceConfig,
        directory: Option<Arc<dyn UserDirectory>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(PresenceStore::new(config.user_timeout, clock));
        let sweeper = PresenceSweeper::spawn(store.clone(), config.sweep_interval);
        let tokens = TokenService::new(&config.jwt_secret, &config.jwt_issuer, config.jwt_expiry_secs);
        let auth = Arc::new(Authenticator::new(tokens, directory));

        Self {
            config,
            store,
            sweeper,
            auth,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn router(&self) -> Router {
        api::create_router(api::AppState {
            store: self.store.clone(),
            auth: self.auth.clone(),
            environment: self.config.environment,
            started_at: self.start_time,
        })
    }

    /// Serve the REST API on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    pub fn store(&self) -> &Arc<PresenceStore> {
        &self.store
    }

    pub fn tokens(&self) -> &TokenService {
        self.auth.tokens()
    }
}

#[async_trait::async_trait]
impl NexusService for PresenceService {
    fn service_id(&self) -> &'static str {
        "presence-service"
    }

    fn environment(&self) -> Environment {
        self.config.environment
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        let sweeper_running = self.sweeper.is_running();
        ReadinessStatus {
            ready: sweeper_running,
            dependencies: vec![DependencyStatus {
                name: "presence-sweeper".to_string(),
                available: sweeper_running,
                latency_ms: None,
            }],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!(online = self.store.len(), "Shutting down Presence service");
        self.sweeper.stop().await;
        self.store.clear();
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(
            http = %self.config.http_bind,
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            user_timeout_secs = self.config.user_timeout.as_secs(),
            "Starting Presence HTTP server"
        );

        let listener = TcpListener::bind(&self.config.http_bind).await?;
        self.serve(listener).await
    }
}
