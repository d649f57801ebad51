//! Login brute-force protection: a concurrent, time-windowed attempt counter
//! keyed by client identity, and the guard that consults it before credentials
//! are verified.

pub mod client_key;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod sweeper;
pub mod upstream;

pub use client_key::{ClientKey, ProxyTrust};
pub use guard::{GuardDecision, LoginAttempt, LoginGuard};
pub use rate_limit::{AttemptOutcome, AttemptRecord, AttemptStore};
