use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, register_counter, register_gauge};


lazy_static! {
    pub static ref GUARD_ALLOWED: Counter =
        register_counter!("login_guard_allowed_total", "Login attempts let through").unwrap();
    pub static ref GUARD_DENIED: Counter =
        register_counter!("login_guard_denied_total", "Login attempts throttled").unwrap();
    pub static ref EVICTED: Counter =
        register_counter!("login_guard_evicted_total", "Attempt records evicted").unwrap();
    pub static ref TRACKED_KEYS: Gauge =
        register_gauge!("login_guard_tracked_keys", "Client keys currently tracked").unwrap();
}
