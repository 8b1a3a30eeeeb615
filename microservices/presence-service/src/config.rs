//! Presence Service Configuration

use nexus_core::{Environment, NexusError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub http_bind: String,
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiry_secs: u64,
    /// Period of the background eviction sweep
    pub sweep_interval: Duration,
    /// Entries idle for longer than this are evicted by the next sweep
    pub user_timeout: Duration,
    /// Optional JSON array of `{id, name, email, role}` used as the user directory
    pub users_file: Option<PathBuf>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            http_bind: "0.0.0.0:5000".to_string(),
            environment: Environment::Production,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_issuer: "nexus".to_string(),
            jwt_expiry_secs: 3600,
            sweep_interval: Duration::from_secs(60),
            user_timeout: Duration::from_secs(120),
            users_file: None,
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| NexusError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

impl PresenceConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or(defaults.http_bind),
            environment: env_parse("APP_ENV", defaults.environment)?,
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_expiry_secs: env_parse("JWT_EXPIRY_SECS", defaults.jwt_expiry_secs)?,
            sweep_interval: Duration::from_secs(env_parse(
                "PRESENCE_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )?),
            user_timeout: Duration::from_secs(env_parse(
                "PRESENCE_USER_TIMEOUT_SECS",
                defaults.user_timeout.as_secs(),
            )?),
            users_file: std::env::var("PRESENCE_USERS_FILE").ok().map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(NexusError::Config(
                "PRESENCE_SWEEP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.user_timeout.is_zero() {
            return Err(NexusError::Config(
                "PRESENCE_USER_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if chrono::Duration::from_std(self.user_timeout).is_err() {
            return Err(NexusError::Config(
                "PRESENCE_USER_TIMEOUT_SECS is out of range".to_string(),
            ));
        }
        if self.jwt_secret.is_empty() {
            return Err(NexusError::Config("JWT_SECRET must not be empty".to_string()));
        }
        Ok(())
    }
}
