//! Per-route filter chain.
//!
//! A route carries an ordered list of filter steps. The router runs them in
//! order against the request head; the first rejection ends the request and
//! nothing is forwarded.

use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;

use crate::error::GatewayError;

/// Outcome of a single filter step.
#[derive(Debug)]
pub enum FilterOutcome {
    Continue,
    Reject(GatewayError),
}

/// A step in a route's filter chain.
///
/// Filters may mutate the request head (e.g. inject headers) but never
/// the body, and never perform I/O.
pub trait Filter: Send + Sync + fmt::Debug {
    /// Name used in configuration and logs.
    fn name(&self) -> &'static str;

    fn apply(&self, parts: &mut Parts) -> FilterOutcome;
}

/// Ordered filter steps of a route.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    steps: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new(steps: Vec<Arc<dyn Filter>>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|f| f.name())
    }

    /// Run every step in order, stopping at the first rejection.
    pub fn run(&self, parts: &mut Parts) -> Result<(), GatewayError> {
        for step in &self.steps {
            if let FilterOutcome::Reject(err) = step.apply(parts) {
                tracing::debug!(filter = step.name(), error = %err, "Filter rejected request");
                return Err(err);
            }
        }
        Ok(())
    }
}
