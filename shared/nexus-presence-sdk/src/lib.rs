//! Nexus Presence SDK
//!
//! Wire types for the "who is online" protocol: entries, snapshots,
//! announce actions and the JSON envelopes exchanged over HTTP.

pub mod api;
pub mod presence;


pub use api::{
    routes, AnnounceResponse, DebugResponse, ErrorResponse, RosterResponse, ServerStats,
    StatsResponse, UpdatePresenceRequest,
};
pub use presence::{DebugEntry, DebugInfo, PresenceAction, PresenceEntry, PresenceSnapshot};
