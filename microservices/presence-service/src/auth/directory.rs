//! User directory lookups

use async_trait::async_trait;
use dashmap::DashMap;
use nexus_core::{NexusError, Result, Role, UserId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Identity metadata resolved for an authenticated caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, id: &UserId) -> Result<Option<UserRecord>>;
}

/// Directory held in memory, optionally seeded from a JSON file
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, UserRecord>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserRecord) {
        self.users.insert(user.id.clone(), user);
    }

    /// Parse a JSON array of user records
    pub fn from_json(raw: &str) -> Result<Self> {
        let records: Vec<UserRecord> = serde_json::from_str(raw)?;
        let directory = Self::new();
        for record in records {
            directory.insert(record);
        }
        Ok(directory)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NexusError::Config(format!("Cannot read users file {}: {}", path.display(), e))
        })?;
        let directory = Self::from_json(&raw)
            .map_err(|e| NexusError::Config(format!("Invalid users file {}: {}", path.display(), e)))?;

        info!(path = %path.display(), users = directory.len(), "Loaded user directory");
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, id: &UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.get(id).map(|user| user.clone()))
    }
}
