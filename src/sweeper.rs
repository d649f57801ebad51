use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{MissedTickBehavior, interval};

use crate::metrics::{EVICTED, TRACKED_KEYS};
use crate::rate_limit::AttemptStore;

// One eviction pass, returns number of records dropped
pub fn sweep_once(store: &AttemptStore, window: Duration, now: Instant) -> usize {
    let removed = store.evict_expired(now, window);
    EVICTED.inc_by(removed as f64);
    TRACKED_KEYS.set(store.len() as f64);
    if removed > 0 {
        tracing::debug!(removed, remaining = store.len(), "evicted cold attempt records");
    }
    removed
}

// Eviction sweeper - runs on a fixed timer, off the request path
pub async fn eviction_sweeper(store: Arc<AttemptStore>, window: Duration, every: Duration) {
    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval = ?every, "eviction sweeper started");

    loop {
        interval.tick().await;
        sweep_once(&store, window, Instant::now());
    }
}
