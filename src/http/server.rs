//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router: every path goes through the gatekeeper, then
//!   to a thin forwarder that hands admitted requests to the single
//!   configured upstream
//! - Wire up middleware (tracing, request timeout)
//! - Serve with peer addresses attached, so the gatekeeper can see who is
//!   connecting, and stop gracefully on the shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{middleware, Router};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::schema::GateConfig;
use crate::error::ConfigError;
use crate::http::gate::{gatekeeper, GateState, Rejection};
use crate::registry::entry::TrustRegistry;

/// State injected into the forwarding handler.
#[derive(Clone)]
struct ForwardState {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

/// The gate server: gatekeeper middleware in front of a single-upstream
/// forwarder.
pub struct GateServer {
    router: Router,
}

impl GateServer {
    /// Build the router from a compiled registry and the server settings.
    pub fn new(config: &GateConfig, registry: Arc<TrustRegistry>) -> Result<Self, ConfigError> {
        let rejection = Arc::new(Rejection::from_config(config.rejection.as_ref())?);
        let gate_state = GateState { registry, rejection };

        let authority = upstream_authority(&config.server.upstream)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let forward_state = ForwardState { client, authority };

        let router = Router::new()
            .route("/{*path}", any(forward))
            .route("/", any(forward))
            .with_state(forward_state)
            .layer(middleware::from_fn_with_state(gate_state, gatekeeper))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http());

        Ok(Self { router })
    }

    /// Accept connections until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "gate listening");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("gate stopped");
        Ok(())
    }
}

/// Validate the upstream URL and reduce it to the authority the forwarder
/// rewrites requests with. Only absolute http:// upstreams are accepted.
fn upstream_authority(upstream: &str) -> Result<Authority, ConfigError> {
    let invalid = || ConfigError::InvalidUpstream {
        url: upstream.to_string(),
    };

    let url = Url::parse(upstream).map_err(|_| invalid())?;
    if url.scheme() != "http" {
        return Err(invalid());
    }
    let host = url.host_str().ok_or_else(invalid)?;
    let port = url.port().unwrap_or(80);
    Authority::try_from(format!("{host}:{port}").as_str()).map_err(|_| invalid())
}

/// Hand an admitted request to the upstream, preserving method, path,
/// query, headers and body.
async fn forward(State(state): State<ForwardState>, req: Request<Body>) -> Response {
    let (mut parts, body) = req.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    match Uri::from_parts(uri_parts) {
        Ok(uri) => parts.uri = uri,
        Err(err) => {
            tracing::error!(error = %err, "failed to rewrite request uri");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    }

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(err) => {
            tracing::error!(error = %err, "upstream request failed");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
