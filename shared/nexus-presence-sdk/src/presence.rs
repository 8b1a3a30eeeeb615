//! Presence entries and aggregate snapshots

use chrono::{DateTime, Utc};
use nexus_core::{Role, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One currently tracked identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub last_seen: DateTime<Utc>,
}

impl PresenceEntry {
    pub fn new(
        user_id: UserId,
        role: Role,
        name: impl Into<String>,
        email: impl Into<String>,
        last_seen: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            role,
            name: name.into(),
            email: email.into(),
            last_seen,
        }
    }

    /// Milliseconds since the last announce or heartbeat
    pub fn inactive_for_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_seen).num_milliseconds().max(0)
    }
}

/// Aggregate view of the online set; available to every role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub total: usize,
    pub by_role: BTreeMap<String, usize>,
    /// Last sweep, or store construction before the first sweep
    #[serde(rename = "lastCleanup", with = "chrono::serde::ts_milliseconds")]
    pub last_sweep: DateTime<Utc>,
    /// Resident memory of the serving process in MiB
    pub memory_usage: f64,
}

impl PresenceSnapshot {
    pub fn count_for(&self, role: &Role) -> usize {
        self.by_role.get(role.as_str()).copied().unwrap_or(0)
    }
}

/// Presence announcements a session can make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Online,
    Heartbeat,
    Offline,
}

impl PresenceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Heartbeat => "heartbeat",
            Self::Offline => "offline",
        }
    }

    /// Whether this action refreshes the caller's entry
    pub fn keeps_alive(&self) -> bool {
        matches!(self, Self::Online | Self::Heartbeat)
    }
}

impl fmt::Display for PresenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry annotated with its inactivity, for operator debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugEntry {
    #[serde(flatten)]
    pub entry: PresenceEntry,
    pub inactive_for_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub users: Vec<DebugEntry>,
    pub total: usize,
    pub memory_usage: f64,
    pub timestamp: DateTime<Utc>,
}
