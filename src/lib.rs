//! Edge gateway library.
//!
//! A single HTTP entry point in front of several backend services. Each
//! request is matched against an ordered route table, optionally
//! authenticated with an HMAC-signed bearer token, has its path rewritten,
//! and is forwarded to the route's backend. The backend's response is
//! relayed unchanged.

// Core request path
pub mod auth;
pub mod error;
pub mod filter;
pub mod http;
pub mod routing;
pub mod upstream;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use error::{AuthRejection, GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
