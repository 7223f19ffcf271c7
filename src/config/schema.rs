//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for backend calls.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Token verification settings.
    pub auth: AuthConfig,

    /// Logical backend name → base URL (e.g. "http://user-service:5001").
    pub backends: BTreeMap<String, String>,

    /// Route definitions, in registration (precedence) order.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for backend calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for the backend to return response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding the HMAC signing key.
    pub secret_env: String,

    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_secs: u64,

    /// Paths (and their sub-paths) that never require a token.
    pub bypass_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: "JWT_SECRET".to_string(),
            leeway_secs: 0,
            bypass_paths: vec![
                "/api/users/auth/signup".to_string(),
                "/api/users/auth/login".to_string(),
                "/api/users/auth/refresh".to_string(),
            ],
        }
    }
}

/// Route configuration mapping requests to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Unique route identifier for logging/metrics.
    pub id: String,

    /// Condition over path and method.
    pub predicate: PredicateConfig,

    /// Logical backend name (key of `[backends]`).
    pub backend: String,

    /// Optional prefix rewrite applied before forwarding.
    #[serde(default)]
    pub rewrite: Option<RewriteConfig>,

    /// Filter steps, applied in order (e.g. `["authenticate"]`).
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Predicate tree as written in configuration.
///
/// ```toml
/// predicate = { and = [ { path = "/campaigns/**" }, { not = { path = "/campaigns/docs/**" } } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateConfig {
    Path(String),
    Method(Vec<String>),
    And(Vec<PredicateConfig>),
    Or(Vec<PredicateConfig>),
    Not(Box<PredicateConfig>),
}

/// Prefix rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RewriteConfig {
    pub prefix: String,
    pub replacement: String,
}
