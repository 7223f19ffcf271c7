//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request head (path, Authorization header)
//!     → filter.rs (bypass list, header + scheme checks)
//!     → token.rs (HMAC signature, expiry, claims)
//!     → AuthContext injected as X-User-Id / X-User-Name
//! ```
//!
//! # Design Decisions
//! - Signing key loaded once at startup, shared read-only
//! - Every failure is a typed `AuthRejection`, collapsed to 401 at the edge
//! - Identity headers are always overwritten, never trusted from callers

pub mod filter;
pub mod token;

pub use filter::{AuthFilter, AuthOutcome, BypassList, X_USER_ID, X_USER_NAME};
pub use token::{Claims, Secret, SecretError, TokenVerifier};

/// Identity derived from a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub user_name: String,
}
