//! The request-time trust decision.
//!
//! One middleware, one question: does the peer address of this connection
//! belong to a trusted reverse-proxy network? Trusted requests get their
//! headers rewritten by the matching entry's actions and continue inward.
//! Everything else is answered with the rejection response and never
//! reaches a handler. A request whose peer address cannot be determined
//! is rejected too; an unknown caller is an untrusted caller.
//!
//! A v4-mapped IPv6 peer, the shape dual-stack listeners hand over for
//! IPv4 clients, is unmapped before the lookup and matches IPv4 subnets.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::schema::RejectionConfig;
use crate::error::ConfigError;
use crate::http::headers;
use crate::observability::metrics;
use crate::registry::entry::TrustRegistry;

/// Response sent to peers outside every trusted network.
#[derive(Debug, Clone)]
pub struct Rejection {
    status: StatusCode,
    body: String,
}

impl Rejection {
    /// Bare 403 with an empty body.
    pub fn default_403() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        }
    }

    /// Build from the optional configuration override.
    pub fn from_config(config: Option<&RejectionConfig>) -> Result<Self, ConfigError> {
        match config {
            None => Ok(Self::default_403()),
            Some(rejection) => {
                let status = StatusCode::from_u16(rejection.code).map_err(|_| {
                    ConfigError::InvalidRejectionStatus {
                        code: rejection.code,
                    }
                })?;
                Ok(Self {
                    status,
                    body: rejection.content.clone(),
                })
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    fn response(&self) -> Response {
        (self.status, self.body.clone()).into_response()
    }
}

/// Shared state for the gatekeeper middleware.
#[derive(Clone)]
pub struct GateState {
    pub registry: Arc<TrustRegistry>,
    pub rejection: Arc<Rejection>,
}

/// Admit or reject one request based on its peer address.
pub async fn gatekeeper(
    State(state): State<GateState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_canonical());

    let Some(ip) = peer else {
        tracing::debug!("request without a peer address rejected");
        metrics::record_decision("rejected", "none");
        return state.rejection.response();
    };

    match state.registry.lookup(ip) {
        Some(proxy) => {
            headers::apply_actions(proxy.actions(), req.headers_mut());
            metrics::record_decision("allowed", proxy.name());
            next.run(req).await
        }
        None => {
            tracing::debug!(peer = %ip, "peer outside every trusted network");
            metrics::record_decision("rejected", "none");
            state.rejection.response()
        }
    }
}

/// Extract the IP from a peer address string, either `host:port`,
/// `[v6]:port`, a bracketed bare address or a bare address. V4-mapped
/// IPv6 addresses are unmapped, like the middleware does for connect
/// info.
pub fn peer_ip(remote: &str) -> Option<IpAddr> {
    if let Ok(addr) = remote.parse::<SocketAddr>() {
        return Some(addr.ip().to_canonical());
    }
    let bare = remote
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(remote);
    bare.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}
