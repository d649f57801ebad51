use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};

use crate::client_key::ClientKey;

// Attempt record - tracks attempts per client key in the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub count: u32,
    pub window_started_at: Instant,
}

// Result of recording one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub allowed: bool,
    pub count: u32,
    pub retry_after: Duration,
}

impl AttemptOutcome {
    fn allow(count: u32) -> Self {
        Self {
            allowed: true,
            count,
            retry_after: Duration::ZERO,
        }
    }
}

/// Fixed-window-with-reset attempt counter keyed by client.
///
/// Each key lives in one DashMap shard, and `record_attempt` runs under that
/// shard's write lock through the entry API, so transitions for a key are linear.
/// Eviction walks shards one at a time and never holds the whole map.
#[derive(Debug, Default)]
pub struct AttemptStore {
    records: DashMap<ClientKey, AttemptRecord>,
}

impl AttemptStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn record_attempt(
        &self,
        key: &ClientKey,
        now: Instant,
        window: Duration,
        max_attempts: u32,
    ) -> AttemptOutcome {
        let fresh = AttemptRecord {
            count: 1,
            window_started_at: now,
        };

        let mut entry = match self.records.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                return AttemptOutcome::allow(1);
            }
            Entry::Occupied(occupied) => occupied,
        };
        let record = entry.get_mut();

        // callers read the clock before taking the lock, so `now` may trail the window start
        let elapsed = now.saturating_duration_since(record.window_started_at);

        // window expired? start over
        if elapsed > window {
            *record = fresh;
            return AttemptOutcome::allow(1);
        }

        if record.count >= max_attempts {
            return AttemptOutcome {
                allowed: false,
                count: record.count,
                retry_after: window.saturating_sub(elapsed),
            };
        }

        record.count += 1;
        AttemptOutcome::allow(record.count)
    }

    /// Drops records whose window ended more than one full window ago.
    /// Returns how many were removed.
    pub fn evict_expired(&self, now: Instant, window: Duration) -> usize {
        let horizon = window.saturating_mul(2);
        let before = self.records.len();
        self.records
            .retain(|_, record| now.saturating_duration_since(record.window_started_at) <= horizon);
        before.saturating_sub(self.records.len())
    }

    pub fn record(&self, key: &ClientKey) -> Option<AttemptRecord> {
        self.records.get(key).map(|r| *r)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
