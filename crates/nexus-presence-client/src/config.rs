//! Presence client configuration

use std::str::FromStr;
use std::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub heartbeat_interval: Duration,
    pub health_check_interval: Duration,
    pub refresh_interval: Duration,
    /// Silence after which the session is degraded
    pub soft_threshold: Duration,
    /// Silence after which the session goes offline for good
    pub hard_threshold: Duration,
    pub request_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            heartbeat_interval: Duration::from_secs(45),
            health_check_interval: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(60),
            soft_threshold: Duration::from_secs(60),
            hard_threshold: Duration::from_secs(90),
            request_timeout: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
        }
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    env_parse(key, default.as_secs()).map(Duration::from_secs)
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
            .map_err(|e| ClientError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backoff = BackoffPolicy::new()
            .with_initial_interval(Duration::from_millis(env_parse(
                "PRESENCE_BACKOFF_INITIAL_MS",
                defaults.backoff.initial_interval.as_millis() as u64,
            )?))
            .with_maximum_interval(Duration::from_millis(env_parse(
                "PRESENCE_BACKOFF_MAX_MS",
                defaults.backoff.maximum_interval.as_millis() as u64,
            )?));

        let config = Self {
            base_url: std::env::var("PRESENCE_BASE_URL").unwrap_or(defaults.base_url),
            heartbeat_interval: env_secs("PRESENCE_HEARTBEAT_SECS", defaults.heartbeat_interval)?,
            health_check_interval: env_secs(
                "PRESENCE_HEALTH_CHECK_SECS",
                defaults.health_check_interval,
            )?,
            refresh_interval: env_secs("PRESENCE_REFRESH_SECS", defaults.refresh_interval)?,
            soft_threshold: env_secs("PRESENCE_SOFT_THRESHOLD_SECS", defaults.soft_threshold)?,
            hard_threshold: env_secs("PRESENCE_HARD_THRESHOLD_SECS", defaults.hard_threshold)?,
            request_timeout: env_secs("PRESENCE_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            backoff,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("heartbeat interval", self.heartbeat_interval),
            ("health check interval", self.health_check_interval),
            ("refresh interval", self.refresh_interval),
        ];
        for (name, period) in periods {
            if period.is_zero() {
                return Err(ClientError::Config(format!("{} must be greater than zero", name)));
            }
        }
        if self.soft_threshold > self.hard_threshold {
            return Err(ClientError::Config(
                "soft threshold must not exceed hard threshold".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(45));
        assert_eq!(config.health_check_interval, Duration::from_secs(30));
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.soft_threshold, Duration::from_secs(60));
        assert_eq!(config.hard_threshold, Duration::from_secs(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = ClientConfig {
            soft_threshold: Duration::from_secs(120),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
    }
}
