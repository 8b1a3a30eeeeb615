//! Nexus Core - Shared domain types and service infrastructure
//!
//! This crate provides:
//! - Standard service trait all Nexus services implement
//! - Common domain types (UserId, SessionId, Role)
//! - Error handling utilities
//! - Configuration management
//! - A clock seam for time-driven components

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Environment;
pub use domain::*;
pub use error::{NexusError, Result};
pub use service::{DependencyStatus, HealthStatus, MicroserviceRuntime, NexusService, ReadinessStatus};
