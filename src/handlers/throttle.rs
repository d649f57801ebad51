use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::{MAX_LOGIN_BODY, peer_ip};
use crate::client_key::forwarded_for;
use crate::error::AppError;
use crate::guard::{GuardDecision, LoginAttempt};
use crate::models::ThrottleResponse;
use crate::state::AppState;

// Runs the login guard before the request reaches credential verification.
// The body is buffered to read the identifier and handed on untouched.
pub async fn login_throttle(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = peer_ip(&req);
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_LOGIN_BODY).await.map_err(|e| {
        tracing::debug!(error = %e, "could not buffer login body");
        AppError::PayloadTooLarge
    })?;

    let attempt = LoginAttempt {
        forwarded_for: forwarded_for(&parts.headers),
        peer,
        identifier: extract_identifier(
            &parts.headers,
            &bytes,
            &state.guard.config().identifier_field,
        ),
    };

    match state.guard.check(&attempt) {
        GuardDecision::Allow => {
            let req = Request::from_parts(parts, Body::from(bytes));
            Ok(next.run(req).await)
        }
        GuardDecision::Deny { retry_after_ms } => Ok(throttled(retry_after_ms)),
    }
}

fn throttled(retry_after_ms: u64) -> Response {
    let retry_after_secs = retry_after_ms.div_ceil(1000).max(1);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after_secs.to_string())],
        Json(ThrottleResponse::new(retry_after_ms)),
    )
        .into_response()
}

/// Reads the account identifier from a JSON or urlencoded body.
/// Anything missing, non-string or unparseable yields an empty string.
pub fn extract_identifier(headers: &HeaderMap, body: &[u8], field: &str) -> String {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let value = if is_form {
        form_field(body, field)
    } else {
        json_field(body, field).or_else(|| form_field(body, field))
    };
    value.unwrap_or_default()
}

fn json_field(body: &[u8], field: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get(field)?.as_str().map(|s| s.to_string())
}

fn form_field(body: &[u8], field: &str) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
    pairs.into_iter().find(|(k, _)| k == field).map(|(_, v)| v)
}
