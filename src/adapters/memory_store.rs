//! In-process counter store for single-instance deployments and tests.
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use scc::{HashMap, hash_map::Entry};

use crate::ports::{CounterStore, StoreResult};

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    expires_at: Instant,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Increments between sweeps of expired counters.
pub const SWEEP_INTERVAL: usize = 1024;

/// Counters live in an `scc::HashMap`; each increment holds the entry lock for
/// its key, so concurrent increments never lose updates. Expired counters read
/// as absent. Bucket keys change every window, so expired entries are swept out
/// every [`SWEEP_INTERVAL`] increments.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: HashMap<String, Counter>,
    ops: AtomicUsize,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored counters, expired ones included.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop every expired counter and return how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        let removed_ref = &mut removed;
        self.counters
            .retain_async(|_, counter| {
                let keep = !counter.is_expired(now);
                if !keep {
                    *removed_ref += 1;
                }
                keep
            })
            .await;
        if removed > 0 {
            tracing::debug!("Purged {} expired rate limit counters", removed);
        }
        removed
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    fn name(&self) -> &'static str {
        "Memory"
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> StoreResult<i64> {
        let now = Instant::now();
        let fresh = Counter {
            count: 1,
            expires_at: now + Duration::from_secs(ttl_secs),
        };

        let count = match self.counters.entry_async(key.to_string()).await {
            Entry::Occupied(mut occupied) => {
                let counter = occupied.get_mut();
                if counter.is_expired(now) {
                    *counter = fresh;
                } else {
                    counter.count += 1;
                }
                counter.count
            }
            Entry::Vacant(vacant) => {
                vacant.insert_entry(fresh);
                1
            }
        };

        if (self.ops.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            self.purge_expired().await;
        }
        Ok(count)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        let now = Instant::now();
        match self.counters.entry_async(key.to_string()).await {
            Entry::Occupied(occupied) if occupied.get().is_expired(now) => {
                occupied.remove();
                Ok(None)
            }
            Entry::Occupied(occupied) => Ok(Some(occupied.get().count)),
            Entry::Vacant(_) => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.counters.remove_async(key).await;
        Ok(())
    }
}
