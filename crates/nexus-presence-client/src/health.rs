//! Session phases and connection health

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle of one presence session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Active,
    Degraded,
    /// Terminal for the session
    Offline,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionHealth {
    Healthy,
    Degraded,
    Offline,
}

/// Outcome of a periodic health evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    Fresh,
    Stale,
    Expired,
}

/// Classify the silence since the last successful beat; both bounds are exclusive
pub fn evaluate(silence: Duration, soft: Duration, hard: Duration) -> HealthVerdict {
    if silence > hard {
        HealthVerdict::Expired
    } else if silence > soft {
        HealthVerdict::Stale
    } else {
        HealthVerdict::Fresh
    }
}
