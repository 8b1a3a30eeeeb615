//! Presence Store - authoritative registry of online identities
//!
//! One entry per user id, refreshed by announce/heartbeat calls and evicted
//! by the periodic sweep once idle for longer than the configured timeout.
//! Eviction is sweep-based: a stale entry stays visible until the next sweep.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use nexus_core::{Clock, Role, UserId};
use nexus_presence_sdk::{DebugEntry, DebugInfo, PresenceEntry, PresenceSnapshot};
use nexus_telemetry::{Counter, Gauge};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::memory::MemoryProbe;

#[derive(Clone)]
pub struct StoreMetrics {
    pub upserts: Counter,
    pub removals: Counter,
    pub evictions: Counter,
    pub online: Gauge,
}

impl StoreMetrics {
    fn new() -> Self {
        Self {
            upserts: Counter::new("presence_upserts_total"),
            removals: Counter::new("presence_removals_total"),
            evictions: Counter::new("presence_evictions_total"),
            online: Gauge::new("presence_online_users"),
        }
    }
}

pub struct PresenceStore {
    entries: DashMap<UserId, PresenceEntry>,
    last_sweep: Mutex<DateTime<Utc>>,
    timeout: ChronoDuration,
    clock: Arc<dyn Clock>,
    memory: MemoryProbe,
    metrics: StoreMetrics,
}

impl PresenceStore {
    /// Timeouts beyond the chrono range saturate to the largest representable span
    pub fn new(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        let timeout = ChronoDuration::from_std(timeout).unwrap_or(ChronoDuration::MAX);
        let created_at = clock.now();

        Self {
            entries: DashMap::new(),
            last_sweep: Mutex::new(created_at),
            timeout,
            clock,
            memory: MemoryProbe::new(),
            metrics: StoreMetrics::new(),
        }
    }

    /// Create or refresh the entry for `user_id`
    pub fn upsert(&self, user_id: UserId, role: Role, name: &str, email: &str) {
        let now = self.clock.now();

        // The shard guard must be released before `len()` below.
        let created = match self.entries.entry(user_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.role = role;
                entry.name = name.to_string();
                entry.email = email.to_string();
                if now > entry.last_seen {
                    entry.last_seen = now;
                }
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(PresenceEntry::new(user_id.clone(), role, name, email, now));
                true
            }
        };

        self.metrics.upserts.inc();
        let total = self.refresh_gauge();

        if created {
            info!(user_id = %user_id, name, total, "User came online");
        } else {
            debug!(user_id = %user_id, total, "Presence refreshed");
        }
    }

    /// Drop the entry for `user_id`; absent ids are ignored
    pub fn remove(&self, user_id: &UserId) -> bool {
        let removed = self.entries.remove(user_id);
        let total = self.refresh_gauge();

        match removed {
            Some((_, entry)) => {
                self.metrics.removals.inc();
                info!(user_id = %user_id, name = %entry.name, total, "User went offline");
                true
            }
            None => false,
        }
    }

    /// Evict every entry idle for strictly longer than the timeout
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let timeout = self.timeout;
        let mut evicted = 0usize;

        self.entries.retain(|user_id, entry| {
            let idle = now - entry.last_seen;
            if idle > timeout {
                debug!(
                    user_id = %user_id,
                    name = %entry.name,
                    idle_secs = idle.num_seconds(),
                    "Evicting inactive user"
                );
                evicted += 1;
                false
            } else {
                true
            }
        });

        *self.last_sweep.lock() = now;
        self.metrics.evictions.add(evicted as u64);
        self.refresh_gauge();

        evicted
    }

    /// Entries the requester may enumerate: everything for internal roles,
    /// nothing for external ones
    pub fn list_visible_to(&self, requester: &Role) -> Vec<PresenceEntry> {
        if !requester.can_enumerate_presence() {
            return Vec::new();
        }

        let mut entries: Vec<PresenceEntry> =
            self.entries.iter().map(|item| item.value().clone()).collect();
        entries.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        entries
    }

    pub fn stats(&self) -> PresenceSnapshot {
        let mut by_role: BTreeMap<String, usize> = BTreeMap::new();
        let mut total = 0usize;

        // Single pass keeps `total == sum(by_role)` under concurrent writes.
        for item in self.entries.iter() {
            *by_role.entry(item.role.as_str().to_string()).or_insert(0) += 1;
            total += 1;
        }

        PresenceSnapshot {
            total,
            by_role,
            last_sweep: *self.last_sweep.lock(),
            memory_usage: self.memory.resident_mib(),
        }
    }

    pub fn debug_info(&self) -> DebugInfo {
        let now = self.clock.now();
        let mut users: Vec<DebugEntry> = self
            .entries
            .iter()
            .map(|item| DebugEntry {
                inactive_for_ms: item.inactive_for_ms(now),
                entry: item.value().clone(),
            })
            .collect();
        users.sort_by_key(|user| user.inactive_for_ms);

        DebugInfo {
            total: users.len(),
            users,
            memory_usage: self.memory.resident_mib(),
            timestamp: now,
        }
    }

    pub fn get(&self, user_id: &UserId) -> Option<PresenceEntry> {
        self.entries.get(user_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries; used at shutdown
    pub fn clear(&self) {
        self.entries.clear();
        self.refresh_gauge();
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    fn refresh_gauge(&self) -> usize {
        let total = self.entries.len();
        self.metrics.online.set(total as u64);
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::ManualClock;

    fn store_with_clock() -> (PresenceStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = PresenceStore::new(Duration::from_secs(120), clock.clone());
        (store, clock)
    }

    fn uid(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn test_repeated_upsert_keeps_single_entry() {
        let (store, clock) = store_with_clock();

        for _ in 0..5 {
            store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");
            clock.advance(Duration::from_secs(10));
        }
        let last_call = clock.now();
        store.upsert(uid("u1"), Role::Admin, "Ana Maria", "ana@nexus.test");

        assert_eq!(store.len(), 1);
        let entry = store.get(&uid("u1")).unwrap();
        assert_eq!(entry.last_seen, last_call);
        assert_eq!(entry.name, "Ana Maria");
        assert_eq!(store.metrics().upserts.get(), 6);
    }

    #[test]
    fn test_last_seen_never_moves_backwards() {
        let (store, clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Customer, "C", "c@x");
        let first = store.get(&uid("u1")).unwrap().last_seen;

        clock.set(first - ChronoDuration::seconds(30));
        store.upsert(uid("u1"), Role::Customer, "C", "c@x");

        assert_eq!(store.get(&uid("u1")).unwrap().last_seen, first);
    }

    #[test]
    fn test_sweep_after_timeout_evicts() {
        let (store, clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");

        clock.advance(Duration::from_secs(120) + Duration::from_millis(1));
        assert_eq!(store.sweep(), 1);

        assert!(store.list_visible_to(&Role::Admin).is_empty());
        assert_eq!(store.stats().total, 0);
        assert_eq!(store.metrics().evictions.get(), 1);
    }

    #[test]
    fn test_sweep_keeps_entry_at_exact_timeout() {
        let (store, clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");

        clock.advance(Duration::from_secs(60));
        assert_eq!(store.sweep(), 0);
        clock.advance(Duration::from_secs(60));
        assert_eq!(store.sweep(), 0, "exactly 120s idle is not past the timeout");
        clock.advance(Duration::from_secs(60));
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.stats().total, 0);
    }

    #[test]
    fn test_stale_entry_visible_until_sweep() {
        let (store, clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");

        clock.advance(Duration::from_secs(150));
        assert_eq!(store.stats().total, 1);
        assert_eq!(store.list_visible_to(&Role::Admin).len(), 1);

        store.sweep();
        assert_eq!(store.stats().total, 0);
    }

    #[test]
    fn test_role_gating() {
        let (store, _clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");
        store.upsert(uid("u2"), Role::Customer, "Carl", "carl@client.test");

        assert!(store.list_visible_to(&Role::Customer).is_empty());
        assert!(store.list_visible_to(&Role::Provider).is_empty());
        assert!(store.list_visible_to(&Role::Other("auditor".into())).is_empty());
        assert_eq!(store.list_visible_to(&Role::Admin).len(), 2);
        assert_eq!(store.list_visible_to(&Role::InternalUser).len(), 2);
    }

    #[test]
    fn test_returned_list_is_detached_copy() {
        let (store, _clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");

        let mut listed = store.list_visible_to(&Role::Admin);
        listed[0].name = "tampered".to_string();
        listed.clear();

        assert_eq!(store.get(&uid("u1")).unwrap().name, "Ana");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let (store, clock) = store_with_clock();
        store.upsert(uid("old"), Role::Admin, "Old", "o@x");
        clock.advance(Duration::from_secs(5));
        store.upsert(uid("new"), Role::Provider, "New", "n@x");

        let listed = store.list_visible_to(&Role::Admin);
        assert_eq!(listed[0].user_id, uid("new"));
        assert_eq!(listed[1].user_id, uid("old"));
    }

    #[test]
    fn test_stats_totals_agree() {
        let (store, _clock) = store_with_clock();
        store.upsert(uid("a1"), Role::Admin, "A", "a@x");
        store.upsert(uid("c1"), Role::Customer, "C1", "c1@x");
        store.upsert(uid("c2"), Role::Customer, "C2", "c2@x");
        store.upsert(uid("x1"), Role::Other("auditor".into()), "X", "x@x");

        let stats = store.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_role.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_role.get("customer"), Some(&2));
        assert_eq!(stats.by_role.get("auditor"), Some(&1));
        assert_eq!(stats.total, store.list_visible_to(&Role::Admin).len());
    }

    #[test]
    fn test_remove_is_immediate_and_idempotent() {
        let (store, _clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");

        assert!(store.remove(&uid("u1")));
        assert!(!store.remove(&uid("u1")));
        assert!(!store.remove(&uid("ghost")));

        assert!(store.get(&uid("u1")).is_none());
        assert_eq!(store.stats().total, 0);
        assert!(store.list_visible_to(&Role::Admin).is_empty());
        assert_eq!(store.metrics().removals.get(), 1);
    }

    #[test]
    fn test_stats_before_first_sweep_reports_construction_time() {
        let (store, clock) = store_with_clock();
        let created = clock.now();
        clock.advance(Duration::from_secs(30));

        let stats = store.stats();
        assert_eq!(stats.last_sweep, created);
        assert_eq!(stats.total, 0);
        assert!(stats.memory_usage >= 0.0);

        store.sweep();
        assert_eq!(store.stats().last_sweep, clock.now());
    }

    #[test]
    fn test_debug_info_reports_inactivity() {
        let (store, clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "Ana", "ana@nexus.test");
        clock.advance(Duration::from_secs(7));

        let info = store.debug_info();
        assert_eq!(info.total, 1);
        assert_eq!(info.users[0].inactive_for_ms, 7000);
    }

    #[test]
    fn test_gauge_tracks_online_count() {
        let (store, _clock) = store_with_clock();
        store.upsert(uid("u1"), Role::Admin, "A", "a@x");
        store.upsert(uid("u2"), Role::Admin, "B", "b@x");
        assert_eq!(store.metrics().online.get(), 2);

        store.clear();
        assert_eq!(store.metrics().online.get(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_upserts_same_id() {
        let (store, _clock) = store_with_clock();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.upsert(UserId::new("u1"), Role::Admin, "Ana", "ana@nexus.test");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().total, 1);
    }
}
