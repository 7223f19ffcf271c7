//! Route definitions and their compilation from configuration.
//!
//! # Responsibilities
//! - Pair a predicate with a backend, optional rewrite and filter chain
//! - Compile `RouteConfig` into an immutable `Route`
//!
//! # Design Decisions
//! - Filter names are resolved explicitly against the filters built at startup
//! - All config mistakes surface here as `RouteTableError`, never at request time

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::{uri::PathAndQuery, Method};
use thiserror::Error;

use crate::auth::AuthFilter;
use crate::config::schema::{PredicateConfig, RouteConfig};
use crate::filter::{Filter, FilterChain};
use crate::routing::predicate::{PatternError, Predicate};
use crate::routing::rewrite::PathRewrite;

/// Name of the authentication filter in configuration.
pub const AUTHENTICATE_FILTER: &str = "authenticate";

/// Errors raised while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("duplicate route id `{0}`")]
    DuplicateId(String),

    #[error("route `{route}`: {source}")]
    InvalidPattern {
        route: String,
        #[source]
        source: PatternError,
    },

    #[error("route `{route}`: `{op}` needs at least one operand")]
    EmptyComposite { route: String, op: &'static str },

    #[error("route `{route}`: method list is empty")]
    EmptyMethods { route: String },

    #[error("route `{route}`: invalid method `{method}`")]
    InvalidMethod { route: String, method: String },

    #[error("route `{route}`: unknown filter `{filter}`")]
    UnknownFilter { route: String, filter: String },

    #[error("route `{route}`: rewrite `{prefix}` -> `{replacement}` must use absolute paths without a query")]
    InvalidRewrite {
        route: String,
        prefix: String,
        replacement: String,
    },

    #[error("route `{route}`: rewrite replacement reintroduces prefix `{prefix}`")]
    ReentrantRewrite { route: String, prefix: String },
}

/// Logical backend name, resolved to an address outside the routing core.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendRef(String);

impl BackendRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A compiled route entry.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub predicate: Predicate,
    pub rewrite: Option<PathRewrite>,
    pub backend: BackendRef,
    pub filters: FilterChain,
}

impl Route {
    pub fn new(id: impl Into<String>, predicate: Predicate, backend: BackendRef) -> Self {
        Self {
            id: id.into(),
            predicate,
            rewrite: None,
            backend,
            filters: FilterChain::default(),
        }
    }

    pub fn with_rewrite(mut self, rewrite: PathRewrite) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    /// True if the chain contains the authentication filter.
    pub fn requires_auth(&self) -> bool {
        self.filters.names().any(|n| n == AUTHENTICATE_FILTER)
    }

    /// Compile a configured route, resolving filter names against `auth`.
    pub fn from_config(config: &RouteConfig, auth: &Arc<AuthFilter>) -> Result<Self, RouteTableError> {
        let predicate = compile_predicate(&config.id, &config.predicate)?;

        let mut route = Route::new(config.id.clone(), predicate, BackendRef::new(config.backend.clone()));

        if let Some(rw) = &config.rewrite {
            route = route.with_rewrite(compile_rewrite(&config.id, &rw.prefix, &rw.replacement)?);
        }

        let mut steps: Vec<Arc<dyn Filter>> = Vec::with_capacity(config.filters.len());
        for name in &config.filters {
            match name.as_str() {
                AUTHENTICATE_FILTER => steps.push(auth.clone()),
                other => {
                    return Err(RouteTableError::UnknownFilter {
                        route: config.id.clone(),
                        filter: other.to_string(),
                    })
                }
            }
        }

        Ok(route.with_filters(FilterChain::new(steps)))
    }
}

/// Fold a configured predicate tree into a `Predicate`.
/// N-ary `and` / `or` lists fold left into binary nodes.
pub fn compile_predicate(route: &str, config: &PredicateConfig) -> Result<Predicate, RouteTableError> {
    match config {
        PredicateConfig::Path(pattern) => {
            Predicate::path(pattern).map_err(|source| RouteTableError::InvalidPattern {
                route: route.to_string(),
                source,
            })
        }
        PredicateConfig::Method(names) => {
            if names.is_empty() {
                return Err(RouteTableError::EmptyMethods { route: route.to_string() });
            }
            let methods = names
                .iter()
                .map(|name| {
                    Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(|_| {
                        RouteTableError::InvalidMethod {
                            route: route.to_string(),
                            method: name.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Predicate::Method(methods))
        }
        PredicateConfig::And(items) => fold(route, "and", items, Predicate::and),
        PredicateConfig::Or(items) => fold(route, "or", items, Predicate::or),
        PredicateConfig::Not(inner) => Ok(compile_predicate(route, inner)?.negate()),
    }
}

fn fold(
    route: &str,
    op: &'static str,
    items: &[PredicateConfig],
    combine: fn(Predicate, Predicate) -> Predicate,
) -> Result<Predicate, RouteTableError> {
    let mut iter = items.iter();
    let first = iter.next().ok_or_else(|| RouteTableError::EmptyComposite {
        route: route.to_string(),
        op,
    })?;

    let mut acc = compile_predicate(route, first)?;
    for item in iter {
        acc = combine(acc, compile_predicate(route, item)?);
    }
    Ok(acc)
}

/// Validate and build a rewrite rule.
pub fn compile_rewrite(route: &str, prefix: &str, replacement: &str) -> Result<PathRewrite, RouteTableError> {
    let valid = |s: &str| s.is_empty() || (s.starts_with('/') && PathAndQuery::from_str(s).is_ok() && !s.contains('?'));
    if !valid(prefix) || !valid(replacement) {
        return Err(RouteTableError::InvalidRewrite {
            route: route.to_string(),
            prefix: prefix.to_string(),
            replacement: replacement.to_string(),
        });
    }

    let rewrite = PathRewrite::new(prefix, replacement);
    if rewrite.is_reentrant() {
        return Err(RouteTableError::ReentrantRewrite {
            route: route.to_string(),
            prefix: prefix.to_string(),
        });
    }
    Ok(rewrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BypassList, Secret};
    use crate::config::schema::RewriteConfig;

    fn auth() -> Arc<AuthFilter> {
        let secret = Secret::new("an-hmac-secret-that-is-long-enough-0123").unwrap();
        Arc::new(AuthFilter::new(&secret, 0, BypassList::default()))
    }

    fn config(predicate: PredicateConfig) -> RouteConfig {
        RouteConfig {
            id: "r1".into(),
            predicate,
            backend: "svc".into(),
            rewrite: None,
            filters: vec![],
        }
    }

    #[test]
    fn test_compile_nested_predicate() {
        let predicate = PredicateConfig::And(vec![
            PredicateConfig::Path("/campaigns/**".into()),
            PredicateConfig::Method(vec!["post".into(), "PUT".into()]),
            PredicateConfig::Not(Box::new(PredicateConfig::Path("/campaigns/docs/**".into()))),
        ]);
        let compiled = compile_predicate("r1", &predicate).unwrap();

        assert!(compiled.evaluate("/campaigns/1", &Method::POST));
        assert!(compiled.evaluate("/campaigns/1", &Method::PUT));
        assert!(!compiled.evaluate("/campaigns/1", &Method::GET));
        assert!(!compiled.evaluate("/campaigns/docs/x", &Method::POST));
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            compile_predicate("r1", &PredicateConfig::Or(vec![])),
            Err(RouteTableError::EmptyComposite { route: "r1".into(), op: "or" })
        );
        assert!(matches!(
            compile_predicate("r1", &PredicateConfig::Method(vec!["GE T".into()])),
            Err(RouteTableError::InvalidMethod { .. })
        ));
        assert!(matches!(
            compile_predicate("r1", &PredicateConfig::Path("/a/**/b".into())),
            Err(RouteTableError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_filters_resolved_by_name() {
        let mut cfg = config(PredicateConfig::Path("/api/**".into()));
        cfg.filters = vec!["authenticate".into()];
        let route = Route::from_config(&cfg, &auth()).unwrap();
        assert!(route.requires_auth());

        cfg.filters = vec!["rate-limit".into()];
        assert_eq!(
            Route::from_config(&cfg, &auth()).unwrap_err(),
            RouteTableError::UnknownFilter { route: "r1".into(), filter: "rate-limit".into() }
        );
    }

    #[test]
    fn test_rewrite_compiled_from_config() {
        let mut cfg = config(PredicateConfig::Path("/campaigns/docs/**".into()));
        cfg.rewrite = Some(RewriteConfig {
            prefix: "/campaigns/docs".into(),
            replacement: "/docs".into(),
        });
        let route = Route::from_config(&cfg, &auth()).unwrap();
        let rewrite = route.rewrite.unwrap();

        assert_eq!(rewrite.prefix(), "/campaigns/docs");
        assert_eq!(rewrite.replacement(), "/docs");
    }

    #[test]
    fn test_reentrant_rewrite_refused() {
        let mut cfg = config(PredicateConfig::Path("/a/**".into()));
        cfg.rewrite = Some(RewriteConfig {
            prefix: "/a".into(),
            replacement: "/a/v2".into(),
        });
        assert!(matches!(
            Route::from_config(&cfg, &auth()),
            Err(RouteTableError::ReentrantRewrite { .. })
        ));
    }
}
