//! Request-facing throttling policy for authentication endpoints.
//!
//! The guard limits *attempts*, not failures: every allowed request counts,
//! whether or not the credentials turn out to be valid.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::client_key::{ClientKey, derive_key};
use crate::config::GuardConfig;
use crate::metrics::{GUARD_ALLOWED, GUARD_DENIED};
use crate::rate_limit::AttemptStore;

/// What the guard needs to know about an inbound login request.
#[derive(Debug, Clone, Default)]
pub struct LoginAttempt {
    /// Raw `X-Forwarded-For` value, possibly a comma separated chain.
    pub forwarded_for: Option<String>,
    /// Address of the direct connection.
    pub peer: Option<IpAddr>,
    /// Account identifier from the body, as submitted.
    pub identifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny { retry_after_ms: u64 },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

#[derive(Debug, Clone)]
pub struct LoginGuard {
    store: Arc<AttemptStore>,
    config: Arc<GuardConfig>,
}

impl LoginGuard {
    pub fn new(store: Arc<AttemptStore>, config: GuardConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<AttemptStore> {
        &self.store
    }

    pub fn key_for(&self, attempt: &LoginAttempt) -> ClientKey {
        derive_key(
            attempt.forwarded_for.as_deref(),
            attempt.peer,
            &attempt.identifier,
            self.config.proxy_trust,
        )
    }

    pub fn check(&self, attempt: &LoginAttempt) -> GuardDecision {
        self.check_at(attempt, Instant::now())
    }

    pub fn check_at(&self, attempt: &LoginAttempt, now: Instant) -> GuardDecision {
        let key = self.key_for(attempt);
        let outcome = self
            .store
            .record_attempt(&key, now, self.config.window, self.config.max_attempts);

        if outcome.allowed {
            GUARD_ALLOWED.inc();
            tracing::debug!(
                address = key.address(),
                count = outcome.count,
                "login attempt allowed"
            );
            return GuardDecision::Allow;
        }

        GUARD_DENIED.inc();
        let retry_after_ms = duration_ms(outcome.retry_after);
        tracing::warn!(
            address = key.address(),
            count = outcome.count,
            retry_after_ms,
            "login attempt throttled"
        );
        GuardDecision::Deny { retry_after_ms }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
