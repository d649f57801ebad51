use axum::http::HeaderMap;
use std::fmt;
use std::net::IpAddr;

/// How much of the `X-Forwarded-For` chain is believed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyTrust {
    /// Take the left-most entry as the client, whoever wrote it.
    LeftMost,
    /// Only the right-most `n` hops were appended by our own proxies.
    /// The client is the `n`-th entry from the right; `0` ignores the header.
    Hops(usize),
}

/// Composite identity attempts are bucketed by: client address plus normalized account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    address: String,
    identifier: String,
}

impl ClientKey {
    pub fn new(address: &str, identifier: &str) -> Self {
        Self {
            address: address.to_string(),
            identifier: normalize_identifier(identifier),
        }
    }

    // Address part, used for logging without leaking the identifier
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.address, self.identifier)
    }
}

pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// All `X-Forwarded-For` lines joined into one chain, in arrival order.
/// Repeated header lines are one list, so a proxy adding its own line counts as a hop.
pub fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let lines: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(", "))
    }
}

// Resolve the client address from the forwarded chain and the peer address
pub fn client_address(
    forwarded_for: Option<&str>,
    peer: Option<IpAddr>,
    trust: ProxyTrust,
) -> String {
    let chain: Vec<&str> = forwarded_for
        .map(|xff| {
            xff.split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let from_chain = match trust {
        ProxyTrust::LeftMost => chain.first().copied(),
        ProxyTrust::Hops(0) => None,
        ProxyTrust::Hops(hops) => chain.len().checked_sub(hops).map(|idx| chain[idx]),
    };

    match (from_chain, peer) {
        (Some(addr), _) => addr.to_string(),
        (None, Some(ip)) => ip.to_string(),
        (None, None) => "unknown".to_string(),
    }
}

pub fn derive_key(
    forwarded_for: Option<&str>,
    peer: Option<IpAddr>,
    identifier: &str,
    trust: ProxyTrust,
) -> ClientKey {
    ClientKey::new(&client_address(forwarded_for, peer, trust), identifier)
}
