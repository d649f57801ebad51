use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::response::Response;
use std::sync::Arc;

use super::{MAX_LOGIN_BODY, peer_ip};
use crate::error::AppError;
use crate::state::AppState;

// Forward an allowed login attempt to the authentication backend
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Response, AppError> {
    let peer = peer_ip(&req);
    let (parts, body) = req.into_parts();
    let body = to_bytes(body, MAX_LOGIN_BODY)
        .await
        .map_err(|_| AppError::PayloadTooLarge)?;

    state
        .upstream
        .forward(parts.method, &parts.headers, peer, body)
        .await
}
