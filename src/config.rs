use anyhow::{Result, ensure};
use clap::Parser;
use std::time::Duration;

use crate::client_key::ProxyTrust;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "login-guard")]
#[command(about = "Brute-force throttling gateway for login endpoints")]
pub struct Args {
    // Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Authentication backend that allowed attempts are forwarded to
    #[arg(short, long, env = "UPSTREAM_URL", default_value = "http://localhost:3000")]
    pub upstream_url: String,

    // Path of the guarded login route
    #[arg(long, env = "LOGIN_PATH", default_value = "/login")]
    pub login_path: String,

    // Body field holding the account identifier
    #[arg(long, env = "IDENTIFIER_FIELD", default_value = "email")]
    pub identifier_field: String,

    // Window length in milliseconds
    #[arg(long, env = "WINDOW_MS", default_value_t = 900_000)]
    pub window_ms: u64,

    // Attempts allowed per window
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = 8)]
    pub max_attempts: u32,

    // Number of trusted reverse proxies in front of us.
    // Unset trusts the left-most X-Forwarded-For entry.
    #[arg(long, env = "TRUSTED_PROXIES")]
    pub trusted_proxies: Option<usize>,

    // Eviction sweep period in milliseconds
    #[arg(long, env = "SWEEP_INTERVAL_MS", default_value_t = 60_000)]
    pub sweep_interval_ms: u64,
}

/// Validated limiter settings shared by the guard and the sweeper.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub window: Duration,
    pub max_attempts: u32,
    pub proxy_trust: ProxyTrust,
    pub identifier_field: String,
    pub sweep_interval: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(900_000),
            max_attempts: 8,
            proxy_trust: ProxyTrust::LeftMost,
            identifier_field: "email".to_string(),
            sweep_interval: Duration::from_millis(60_000),
        }
    }
}

impl GuardConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        ensure!(args.window_ms > 0, "WINDOW_MS must be greater than zero");
        ensure!(args.max_attempts >= 1, "MAX_ATTEMPTS must be at least 1");
        ensure!(
            args.sweep_interval_ms > 0,
            "SWEEP_INTERVAL_MS must be greater than zero"
        );
        ensure!(
            args.login_path.starts_with('/'),
            "LOGIN_PATH must start with '/'"
        );
        ensure!(
            !args.identifier_field.trim().is_empty(),
            "IDENTIFIER_FIELD must not be empty"
        );

        let proxy_trust = match args.trusted_proxies {
            Some(hops) => ProxyTrust::Hops(hops),
            None => ProxyTrust::LeftMost,
        };

        Ok(Self {
            window: Duration::from_millis(args.window_ms),
            max_attempts: args.max_attempts,
            proxy_trust,
            identifier_field: args.identifier_field.trim().to_string(),
            sweep_interval: Duration::from_millis(args.sweep_interval_ms),
        })
    }
}
