//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the route table, auth filter and forwarder from configuration
//! - Wire up middleware (request ID, tracing)
//! - Dispatch every path and method to the proxy handler
//! - Serve until the shutdown signal, then drain
//!
//! # Design Decisions
//! - One catch-all handler; the gateway's own route table decides
//! - Request bodies are streamed to the backend, never buffered
//! - Metrics are recorded once per request, at the end

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthFilter, BypassList, Secret};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::{request_id, UuidRequestId};
use crate::observability::metrics;
use crate::routing::{RouteTable, RouteTableError, Router as GatewayRouter};
use crate::upstream::{Forwarder, ResolveError, StaticResolver};

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Routes(#[from] RouteTableError),

    #[error(transparent)]
    Backends(#[from] ResolveError),
}

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub router: Arc<GatewayRouter>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Compile routes and backends. The secret is only borrowed to derive
    /// the verification key.
    pub fn new(config: &GatewayConfig, secret: &Secret) -> Result<Self, BuildError> {
        let auth = Arc::new(AuthFilter::new(
            secret,
            config.auth.leeway_secs,
            BypassList::new(config.auth.bypass_paths.clone()),
        ));
        let table = RouteTable::build(&config.routes, &auth)?;
        let resolver = Arc::new(StaticResolver::from_config(&config.backends)?);
        let forwarder = Forwarder::new(resolver, &config.timeouts);

        tracing::info!(
            routes = table.len(),
            backends = config.backends.len(),
            "Route table compiled"
        );

        let state = AppState {
            router: Arc::new(GatewayRouter::new(table)),
            forwarder: Arc::new(forwarder),
        };

        Ok(Self {
            router: Self::build_router(state),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request.headers()),
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// The fully layered router, for in-process use (tests, embedding).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

}

/// Route, filter, rewrite and forward a single request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (mut parts, body) = request.into_parts();

    let route = match state.router.select(&parts) {
        Ok(route) => route,
        Err(e) => {
            if let GatewayError::NoRouteMatch = e {
                tracing::warn!(method = %parts.method, path = %parts.uri.path(), "No route matched");
            }
            metrics::record_request(e.kind(), e.status().as_u16(), start);
            return e.into_response();
        }
    };

    let instruction = match state.router.prepare(route, &mut parts) {
        Ok(instruction) => instruction,
        Err(e) => {
            metrics::record_request(&route.id, e.status().as_u16(), start);
            return e.into_response();
        }
    };

    match state.forwarder.forward(instruction, parts, body).await {
        Ok(response) => {
            metrics::record_request(&route.id, response.status().as_u16(), start);
            response
        }
        Err(e) => {
            tracing::error!(route = %route.id, error = %e, "Upstream request failed");
            metrics::record_request(&route.id, e.status().as_u16(), start);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn server(toml: &str) -> Router {
        let config = GatewayConfig::from_toml_str(toml).unwrap();
        let secret = Secret::new(SECRET).unwrap();
        HttpServer::new(&config, &secret).unwrap().into_router()
    }

    const CONFIG: &str = r#"
[backends]
campaign-service = "http://127.0.0.1:9"

[[routes]]
id = "campaign-writes"
backend = "campaign-service"
filters = ["authenticate"]
predicate = { and = [ { path = "/campaigns/**" }, { method = ["POST", "PUT", "DELETE"] } ] }
"#;

    #[tokio::test]
    async fn test_unmatched_request_is_404_with_request_id() {
        let response = server(CONFIG)
            .oneshot(Request::get("/campaigns/1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_dot_segment_path_is_400() {
        let response = server(CONFIG)
            .oneshot(Request::post("/campaigns/../admin").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_client_request_id_is_kept() {
        let response = server(CONFIG)
            .oneshot(
                Request::get("/nowhere")
                    .header("x-request-id", "trace-me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "trace-me");
    }

    #[tokio::test]
    async fn test_protected_write_without_token_is_401() {
        let response = server(CONFIG)
            .oneshot(Request::post("/campaigns").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["www-authenticate"], "Bearer");
    }

    #[test]
    fn test_bad_backend_url_fails_build() {
        let mut config = GatewayConfig::from_toml_str(CONFIG).unwrap();
        config
            .backends
            .insert("campaign-service".into(), "::nonsense::".into());
        let secret = Secret::new(SECRET).unwrap();
        assert!(matches!(
            HttpServer::new(&config, &secret),
            Err(BuildError::Backends(_))
        ));
    }
}
