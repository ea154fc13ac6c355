//! Per-server snapshot cache.
//!
//! Holds the expensive home-statistics + user-list pair per server so that
//! frequent polls don't refetch them. Freshness is judged by the caller.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use upstream_api::{HomeStat, User};

/// Default freshness window for cached snapshots (2 minutes).
pub const METADATA_TTL: Duration = Duration::from_secs(120);

/// Expensive per-server data fetched together.
#[derive(Debug, Clone, Default)]
pub struct ServerSnapshot {
    pub home_stats: Vec<HomeStat>,
    pub users: Vec<User>,
}

/// A cached snapshot with the instant it was fetched.
#[derive(Debug, Clone)]
pub struct MetadataCacheEntry {
    pub timestamp: Instant,
    pub stats: Arc<ServerSnapshot>,
}

impl MetadataCacheEntry {
    pub fn new(stats: ServerSnapshot) -> Self {
        Self {
            timestamp: Instant::now(),
            stats: Arc::new(stats),
        }
    }

    /// `now - timestamp < ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.timestamp.elapsed() < ttl
    }
}

/// Thread-safe snapshot cache keyed by server id.
///
/// Entries are never evicted on their own; a newer `set` overwrites in place
/// and `clear` drops everything when the server registry changes.
#[derive(Clone, Default)]
pub struct MetadataCache {
    entries: Arc<DashMap<String, MetadataCacheEntry>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached entry for a server, fresh or not.
    pub fn get(&self, server_key: &str) -> Option<MetadataCacheEntry> {
        self.entries.get(server_key).map(|entry| entry.clone())
    }

    /// Get the entry only if it is younger than `ttl`.
    pub fn get_fresh(&self, server_key: &str, ttl: Duration) -> Option<Arc<ServerSnapshot>> {
        self.get(server_key)
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.stats)
    }

    /// Insert or overwrite a server's entry. Last writer wins.
    pub fn set(&self, server_key: impl Into<String>, entry: MetadataCacheEntry) {
        self.entries.insert(server_key.into(), entry);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
