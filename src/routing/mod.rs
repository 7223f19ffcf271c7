//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, method, headers)
//!     → router.rs (route lookup in registration order)
//!     → predicate.rs (evaluate path / method conditions)
//!     → filter chain of the matched route (authentication)
//!     → rewrite.rs (prefix substitution)
//!     → Return: ForwardInstruction or GatewayError
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → route.rs (parse patterns, fold predicates, resolve filters)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod predicate;
pub mod rewrite;
pub mod route;
pub mod router;

pub use predicate::{has_dot_segment, PathPattern, Predicate};
pub use rewrite::{PathRewrite, RewriteOutcome};
pub use route::{BackendRef, Route, RouteTableError};
pub use router::{ForwardInstruction, RouteTable, Router};
