use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use login_guard::config::{Args, GuardConfig};
use login_guard::guard::LoginGuard;
use login_guard::rate_limit::AttemptStore;
use login_guard::router::build_router;
use login_guard::state::AppState;
use login_guard::sweeper::eviction_sweeper;
use login_guard::upstream::Upstream;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,login_guard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments / environment
    let args = Args::parse();
    let config = GuardConfig::from_args(&args).context("invalid limiter configuration")?;

    let store = Arc::new(AttemptStore::new());

    // spawn the eviction sweeper
    tokio::spawn(eviction_sweeper(
        Arc::clone(&store),
        config.window,
        config.sweep_interval,
    ));

    let client = Upstream::default_client().context("failed to build http client")?;
    let upstream = Upstream::new(client, &args.upstream_url, &args.login_path);

    tracing::info!(
        window_ms = args.window_ms,
        max_attempts = config.max_attempts,
        proxy_trust = ?config.proxy_trust,
        "login guard configured"
    );
    tracing::info!("Forwarding {} to {}", args.login_path, upstream.url());

    let state = Arc::new(AppState {
        guard: LoginGuard::new(store, config),
        upstream,
        login_path: args.login_path.clone(),
    });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}
