//! Time-windowed suppression of replayed requests
//!
//! Keys are `(request id, method, caller hash)`. An entry younger than the TTL
//! marks the key as a duplicate; older entries are refreshed in place and
//! purged by [`DedupCache::sweep_expired`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub id: String,
    pub method: String,
    pub caller_hash: u64,
}

impl DedupKey {
    pub fn new(id: impl Into<String>, method: impl Into<String>, caller_hash: u64) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            caller_hash,
        }
    }
}

#[derive(Clone)]
pub struct DedupCache {
    entries: Arc<DashMap<DedupKey, Instant>>,
    ttl: Duration,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// True if `key` was seen within the TTL (state untouched); otherwise records
    /// it with the current time and returns false.
    pub fn is_duplicate(&self, key: DedupKey) -> bool {
        let now = Instant::now();
        match self.entries.entry(key) {
            Entry::Occupied(entry) if now.duration_since(*entry.get()) < self.ttl => true,
            Entry::Occupied(mut entry) => {
                entry.insert(now);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                false
            }
        }
    }

    /// Drops entries older than the TTL and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, seen| seen.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep_expired();
                if removed > 0 {
                    debug!(removed, remaining = cache.len(), "dedup cache swept");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
