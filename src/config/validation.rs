//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing backends)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Compile every route once so broken patterns fail at startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig};
use crate::routing::route::{compile_predicate, compile_rewrite, RouteTableError, AUTHENTICATE_FILTER};

/// Largest clock skew accepted for `exp` checks.
pub const MAX_LEEWAY_SECS: u64 = 300;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("backend `{name}`: `{url}` is not an http:// base URL")]
    InvalidBackendUrl { name: String, url: String },

    #[error("route `{route}` references unknown backend `{backend}`")]
    UnknownBackend { route: String, backend: String },

    #[error("auth.bypass_paths entry `{0}` must start with '/'")]
    InvalidBypassPath(String),

    #[error("auth.secret_env must not be empty")]
    EmptySecretEnv,

    #[error("auth.leeway_secs is {0}, at most {max} is allowed", max = MAX_LEEWAY_SECS)]
    LeewayTooLarge(u64),

    #[error(transparent)]
    Route(#[from] RouteTableError),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if config.auth.secret_env.trim().is_empty() {
        errors.push(ValidationError::EmptySecretEnv);
    }
    if config.auth.leeway_secs > MAX_LEEWAY_SECS {
        errors.push(ValidationError::LeewayTooLarge(config.auth.leeway_secs));
    }
    for path in &config.auth.bypass_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidBypassPath(path.clone()));
        }
    }

    for (name, url) in &config.backends {
        let ok = Url::parse(url)
            .map(|u| u.scheme() == "http" && u.host_str().is_some())
            .unwrap_or(false);
        if !ok {
            errors.push(ValidationError::InvalidBackendUrl {
                name: name.clone(),
                url: url.clone(),
            });
        }
    }

    let mut ids = HashSet::new();
    for route in &config.routes {
        if !ids.insert(route.id.as_str()) {
            errors.push(RouteTableError::DuplicateId(route.id.clone()).into());
        }
        if !config.backends.contains_key(&route.backend) {
            errors.push(ValidationError::UnknownBackend {
                route: route.id.clone(),
                backend: route.backend.clone(),
            });
        }
        if let Err(e) = check_route(route) {
            errors.push(e.into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_route(route: &RouteConfig) -> Result<(), RouteTableError> {
    compile_predicate(&route.id, &route.predicate)?;
    if let Some(rw) = &route.rewrite {
        compile_rewrite(&route.id, &rw.prefix, &rw.replacement)?;
    }
    if let Some(unknown) = route.filters.iter().find(|f| f.as_str() != AUTHENTICATE_FILTER) {
        return Err(RouteTableError::UnknownFilter {
            route: route.id.clone(),
            filter: unknown.clone(),
        });
    }
    Ok(())
}
