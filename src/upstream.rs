use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, Response, header};
use std::net::IpAddr;
use std::time::Duration;

use crate::client_key::forwarded_for;
use crate::error::AppError;

// Request headers passed through to the authentication backend
static FORWARDED_HEADERS: [header::HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::ACCEPT,
    header::AUTHORIZATION,
    header::COOKIE,
    header::USER_AGENT,
];

// Response headers relayed back to the client
static RELAYED_HEADERS: [header::HeaderName; 3] =
    [header::CONTENT_TYPE, header::SET_COOKIE, header::LOCATION];

// Authentication backend that allowed login attempts are forwarded to
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    url: String,
}

impl Upstream {
    // Accepts "localhost:3000" or a full url
    pub fn new(client: reqwest::Client, base: &str, login_path: &str) -> Self {
        let base = base.trim().trim_end_matches('/');
        let base = if base.starts_with("http") {
            base.to_string()
        } else {
            format!("http://{}", base)
        };
        Self {
            client,
            url: format!("{}{}", base, login_path),
        }
    }

    pub fn default_client() -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn forward(
        &self,
        method: Method,
        headers: &HeaderMap,
        peer: Option<IpAddr>,
        body: Bytes,
    ) -> Result<Response<Body>, AppError> {
        let mut outgoing = HeaderMap::new();
        for name in FORWARDED_HEADERS.iter() {
            for value in headers.get_all(name) {
                outgoing.append(name.clone(), value.clone());
            }
        }
        if let Some(chain) = forwarded_chain(headers, peer) {
            outgoing.insert("x-forwarded-for", chain);
        }

        let res = self
            .client
            .request(method, &self.url)
            .headers(outgoing)
            .body(body)
            .send()
            .await?;

        let status = res.status();
        let mut builder = Response::builder().status(status);
        for name in RELAYED_HEADERS.iter() {
            for value in res.headers().get_all(name) {
                builder = builder.header(name.clone(), value.clone());
            }
        }
        let bytes = res.bytes().await?;

        tracing::debug!(status = status.as_u16(), "upstream responded");
        Ok(builder.body(Body::from(bytes))?)
    }
}

// Existing X-Forwarded-For with the peer appended
fn forwarded_chain(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<HeaderValue> {
    let chain = match (forwarded_for(headers), peer) {
        (Some(xff), Some(ip)) => format!("{}, {}", xff, ip),
        (Some(xff), None) => xff,
        (None, Some(ip)) => ip.to_string(),
        (None, None) => return None,
    };
    HeaderValue::from_str(&chain).ok()
}
