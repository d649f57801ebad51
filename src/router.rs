use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{health_handler, login_handler, login_throttle, metrics_handler};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let login = post(login_handler).route_layer(middleware::from_fn_with_state(
        state.clone(),
        login_throttle,
    ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(&state.login_path, login)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
