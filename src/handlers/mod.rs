mod health;
mod login;
mod metrics;
mod throttle;

pub use health::health_handler;
pub use login::login_handler;
pub use metrics::metrics_handler;
pub use throttle::{extract_identifier, login_throttle};

use axum::extract::{ConnectInfo, Request};
use std::net::{IpAddr, SocketAddr};

// Login bodies are small forms, anything bigger is refused
pub const MAX_LOGIN_BODY: usize = 64 * 1024;

// Direct connection address, when the server was started with connect info
fn peer_ip(req: &Request) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
