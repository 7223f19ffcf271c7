//! Forwarding client.
//!
//! # Responsibilities
//! - Point the request at the resolved backend and rewritten path
//! - Send it once, bounded by the request deadline
//! - Relay status, headers and body without buffering
//!
//! The deadline covers the wait for response headers, then each gap
//! between body frames; a backend that stalls mid-body ends the stream
//! with an error.
//!
//! # Design Decisions
//! - No retries: POST/PUT/DELETE must reach the backend at most once
//! - Timeout errors are distinct from connection errors (504 vs 502)
//! - The backend future is owned by the handler; dropping the handler
//!   (client disconnect) drops the backend call with it

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header::HOST, request::Parts, Request, Response, Uri, Version},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower_http::timeout::TimeoutBody;

use crate::config::TimeoutConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::routing::ForwardInstruction;
use crate::upstream::resolver::BackendResolver;

/// Sends routed requests to backends.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    resolver: Arc<dyn BackendResolver>,
    request_timeout: Duration,
}

impl Forwarder {
    pub fn new(resolver: Arc<dyn BackendResolver>, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            resolver,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// Override the response deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Forward a routed request and return the backend's response untouched.
    pub async fn forward(
        &self,
        instruction: ForwardInstruction,
        mut parts: Parts,
        body: Body,
    ) -> GatewayResult<Response<Body>> {
        let target = self.resolver.resolve(&instruction.backend).ok_or_else(|| {
            GatewayError::UpstreamUnavailable(format!("backend `{}` is not resolvable", instruction.backend))
        })?;

        parts.uri = Uri::builder()
            .scheme(target.scheme.clone())
            .authority(target.authority.clone())
            .path_and_query(instruction.path_and_query.clone())
            .build()
            .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;

        // The backend connection is plain HTTP/1.1; Host follows the target.
        parts.version = Version::HTTP_11;
        parts.headers.remove(HOST);

        tracing::debug!(
            route = %instruction.route_id,
            backend = %target,
            uri = %parts.uri,
            "Forwarding request"
        );

        let request = Request::from_parts(parts, body);
        match tokio::time::timeout(self.request_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(relay(response, self.request_timeout)),
            Ok(Err(e)) => Err(GatewayError::UpstreamUnavailable(e.to_string())),
            Err(_) => Err(GatewayError::UpstreamTimeout(self.request_timeout)),
        }
    }
}

/// Hand the backend response to axum without buffering the body.
fn relay(response: Response<Incoming>, idle: Duration) -> Response<Body> {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(TimeoutBody::new(idle, body)))
}
