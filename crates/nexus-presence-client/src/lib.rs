//! Nexus Presence Client
//!
//! Session-bound synchronization loop for the presence service:
//! announces online, emits heartbeats, watches its own connection health
//! with exponential backoff, refreshes roster/stats and announces offline
//! on teardown.

pub mod backoff;
pub mod config;
pub mod error;
pub mod health;
pub mod session;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use config::ClientConfig;
pub use error::{ClientError, Result, TransportError};
pub use health::{ConnectionHealth, SessionPhase};
pub use session::{ClientStatus, PresenceClient, SessionIdentity};
pub use transport::{HttpTransport, PresenceTransport};
