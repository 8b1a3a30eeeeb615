//! HTTP envelopes for the presence endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::presence::{DebugInfo, PresenceAction, PresenceEntry, PresenceSnapshot};

/// Route paths served by the presence service
pub mod routes {
    pub const ONLINE: &str = "/api/auth/online";
    pub const HEARTBEAT: &str = "/api/auth/online/heartbeat";
    pub const ROSTER: &str = "/api/auth/online-users";
    pub const STATS: &str = "/api/auth/online-stats";
    pub const DEBUG: &str = "/api/auth/online/debug";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePresenceRequest {
    pub action: PresenceAction,
    /// Client-side send time; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl UpdatePresenceRequest {
    pub fn new(action: PresenceAction) -> Self {
        Self {
            action,
            timestamp: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub total_online: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterResponse {
    pub success: bool,
    pub data: Vec<PresenceEntry>,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot plus server process facts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    #[serde(flatten)]
    pub snapshot: PresenceSnapshot,
    pub server_time: DateTime<Utc>,
    pub uptime: u64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub data: ServerStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugResponse {
    pub success: bool,
    pub data: DebugInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
}
