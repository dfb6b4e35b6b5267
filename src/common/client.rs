//! Caller metadata recorded on audit entries

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};

/// Client address and user agent of the current request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Forwarded address when a proxy header is present, else the peer
    pub ip_address: Option<String>,
    /// Socket peer address; never taken from request headers
    pub peer_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Rate limiting key
    ///
    /// Forwarded headers count only when `trust_proxy` is set; otherwise any
    /// client could pick its own bucket. Requests with no known address share
    /// one bucket.
    pub fn rate_limit_key(&self, trust_proxy: bool) -> &str {
        let address = if trust_proxy {
            self.ip_address.as_deref()
        } else {
            self.peer_address.as_deref()
        };
        address.unwrap_or("unknown")
    }

    fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let peer_address = peer.map(|addr| addr.ip().to_string());
        let ip_address = forwarded
            .or(real_ip)
            .map(String::from)
            .or_else(|| peer_address.clone());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| crate::common::truncate_str_safe(v, 512).to_string());

        Self {
            ip_address,
            peer_address,
            user_agent,
        }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, peer))
    }
}
