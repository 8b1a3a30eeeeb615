//! REST API handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use nexus_core::NexusError;
use nexus_presence_sdk::{
    AnnounceResponse, DebugResponse, PresenceAction, RosterResponse, ServerStats, StatsResponse,
    UpdatePresenceRequest,
};
use tracing::{debug, warn};

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;

// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn ready_check() -> &'static str {
    "OK"
}

/// Online and heartbeat refresh the caller's entry; offline removes it
pub async fn update_presence(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<UpdatePresenceRequest>, JsonRejection>,
) -> Result<Json<AnnounceResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        NexusError::Validation(format!(
            "Invalid action. Use online, heartbeat or offline ({})",
            rejection.body_text()
        ))
    })?;

    match request.action {
        PresenceAction::Online | PresenceAction::Heartbeat => {
            state
                .store
                .upsert(user.id.clone(), user.role.clone(), &user.name, &user.email);
        }
        PresenceAction::Offline => {
            state.store.remove(&user.id);
        }
    }

    debug!(user_id = %user.id, action = %request.action, "Presence update accepted");

    Ok(Json(AnnounceResponse {
        success: true,
        message: format!("Presence {} recorded", request.action),
        total_online: state.store.len(),
    }))
}

/// Full roster for internal roles, empty list for everyone else
pub async fn online_users(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<RosterResponse> {
    let data = state.store.list_visible_to(&user.role);

    Json(RosterResponse {
        success: true,
        total: data.len(),
        data,
        timestamp: Utc::now(),
    })
}

pub async fn online_stats(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        data: ServerStats {
            snapshot: state.store.stats(),
            server_time: Utc::now(),
            uptime: state.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

/// Per-entry inactivity; admins only outside development
pub async fn debug_online(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<DebugResponse>, ApiError> {
    if !user.role.is_admin() && !state.environment.is_development() {
        warn!(user_id = %user.id, role = %user.role, "Debug view denied");
        return Err(NexusError::Forbidden("Debug access requires admin role".to_string()).into());
    }

    Ok(Json(DebugResponse {
        success: true,
        data: state.store.debug_info(),
    }))
}
