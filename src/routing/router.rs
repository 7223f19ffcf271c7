//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first matching route for a request
//! - Run the matched route's filter chain and rewrite
//! - Produce a forwarding instruction or an explicit error
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in registration order; first match wins
//! - Exclusions need BOTH ordering and negation: a narrow public route is
//!   registered before the broad protected one, and the broad route's
//!   predicate embeds `Not(Path(narrow))`. Negation on the narrow route alone
//!   cannot stop a broad route registered ahead of it from matching.
//! - Caller-supplied identity headers are stripped before any filter runs

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::{request::Parts, uri::PathAndQuery, Method};

use crate::auth::filter::strip_identity;
use crate::auth::AuthFilter;
use crate::config::schema::RouteConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::routing::predicate::has_dot_segment;
use crate::routing::rewrite::RewriteOutcome;
use crate::routing::route::{BackendRef, Route, RouteTableError};

/// Ordered, immutable list of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build from routes in registration order. Ids must be unique.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteTableError> {
        let mut seen = HashSet::with_capacity(routes.len());
        for route in &routes {
            if !seen.insert(route.id.as_str()) {
                return Err(RouteTableError::DuplicateId(route.id.clone()));
            }
        }
        Ok(Self { routes })
    }

    /// Compile configured routes, keeping file order as registration order.
    pub fn build(configs: &[RouteConfig], auth: &Arc<AuthFilter>) -> Result<Self, RouteTableError> {
        let routes = configs
            .iter()
            .map(|c| Route::from_config(c, auth))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(routes)
    }

    /// First route whose predicate matches, in registration order.
    pub fn match_route(&self, path: &str, method: &Method) -> Option<&Route> {
        self.routes.iter().find(|r| r.predicate.evaluate(path, method))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Where and how to forward a request that passed routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardInstruction {
    pub route_id: String,
    pub backend: BackendRef,
    /// Path (possibly rewritten) and original query string.
    pub path_and_query: PathAndQuery,
}

/// Matches requests, runs filters and applies rewrites.
#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
}

impl Router {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    /// Route a request head. Filters may mutate `parts` (identity headers).
    pub fn route(&self, parts: &mut Parts) -> GatewayResult<ForwardInstruction> {
        let route = self.select(parts)?;
        self.prepare(route, parts)
    }

    /// Pick the first matching route. Paths with dot segments are refused
    /// before any predicate runs.
    pub fn select(&self, parts: &Parts) -> GatewayResult<&Route> {
        if has_dot_segment(parts.uri.path()) {
            tracing::warn!(path = %parts.uri.path(), "Dot segments in path, request refused");
            return Err(GatewayError::InvalidPath);
        }

        self.table
            .match_route(parts.uri.path(), &parts.method)
            .ok_or(GatewayError::NoRouteMatch)
    }

    /// Strip identity headers, run the route's filters and apply its rewrite.
    pub fn prepare(&self, route: &Route, parts: &mut Parts) -> GatewayResult<ForwardInstruction> {
        tracing::debug!(
            route = %route.id,
            method = %parts.method,
            path = %parts.uri.path(),
            "Route matched"
        );

        strip_identity(parts);
        route.filters.run(parts)?;

        let original = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        let path_and_query = match &route.rewrite {
            Some(rewrite) => match rewrite.apply_to_path_and_query(original.as_str()) {
                RewriteOutcome::Rewritten(rewritten) => match rewritten.parse::<PathAndQuery>() {
                    Ok(pq) => pq,
                    Err(e) => {
                        tracing::warn!(route = %route.id, error = %e, "Rewritten path is invalid, forwarding original");
                        original
                    }
                },
                RewriteOutcome::Unchanged => {
                    tracing::debug!(
                        route = %route.id,
                        prefix = rewrite.prefix(),
                        path = original.path(),
                        "Rewrite prefix absent, path left unchanged"
                    );
                    original
                }
            },
            None => original,
        };

        Ok(ForwardInstruction {
            route_id: route.id.clone(),
            backend: route.backend.clone(),
            path_and_query,
        })
    }
}
