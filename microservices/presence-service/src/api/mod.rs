//! API module - REST routes for presence

pub mod rest;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use nexus_core::Environment;
use nexus_presence_sdk::routes;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::Authenticator;
use crate::infrastructure::PresenceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PresenceStore>,
    pub auth: Arc<Authenticator>,
    pub environment: Environment,
    pub started_at: Instant,
}

impl FromRef<AppState> for Arc<Authenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::ready_check))
        // Presence endpoints
        .route(routes::ONLINE, post(rest::update_presence))
        .route(routes::HEARTBEAT, post(rest::update_presence))
        .route(routes::ROSTER, get(rest::online_users))
        .route(routes::STATS, get(rest::online_stats))
        .route(routes::DEBUG, get(rest::debug_online))
        .with_state(state)
}
