//! Bearer-token authentication filter.
//!
//! # Responsibilities
//! - Skip authentication for bypass paths (exact sub-path match)
//! - Require `Authorization: Bearer <token>`
//! - Verify the token and inject identity headers
//!
//! # Design Decisions
//! - Bypass entries match the path itself or paths below it, never substrings,
//!   so `/api/users/profile/login-history` is not mistaken for a login route
//! - The scheme check is case-sensitive with a single space, as issued by the
//!   user service

use axum::http::{header::AUTHORIZATION, request::Parts, HeaderName, HeaderValue};

use crate::auth::token::{Secret, TokenVerifier};
use crate::auth::AuthContext;
use crate::error::{AuthRejection, GatewayError};
use crate::filter::{Filter, FilterOutcome};
use crate::observability::metrics;
use crate::routing::predicate::has_dot_segment;

/// Header carrying the authenticated user id to backends.
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Header carrying the authenticated user name to backends.
pub const X_USER_NAME: HeaderName = HeaderName::from_static("x-user-name");

const BEARER_PREFIX: &str = "Bearer ";

/// Paths that never require a token.
#[derive(Debug, Clone, Default)]
pub struct BypassList {
    entries: Vec<String>,
}

impl BypassList {
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| {
                    let e: String = e.into();
                    e.trim_end_matches('/').to_string()
                })
                .collect(),
        }
    }

    /// True if `path` is an entry or lies below one. Paths with dot
    /// segments never match, since `entry/../..` climbs out of the entry.
    pub fn contains(&self, path: &str) -> bool {
        if has_dot_segment(path) {
            return false;
        }
        self.entries.iter().any(|entry| {
            path.strip_prefix(entry.as_str())
                .map(|rest| rest.is_empty() || rest.starts_with('/'))
                .unwrap_or(false)
        })
    }
}

/// Terminal state of the authentication state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// `None` when the path was on the bypass list.
    Authenticated(Option<AuthContext>),
    Rejected(AuthRejection),
}

/// Authentication step for protected routes.
#[derive(Debug)]
pub struct AuthFilter {
    verifier: TokenVerifier,
    bypass: BypassList,
}

impl AuthFilter {
    pub fn new(secret: &Secret, leeway_secs: u64, bypass: BypassList) -> Self {
        Self {
            verifier: TokenVerifier::new(secret, leeway_secs),
            bypass,
        }
    }

    /// Decide the outcome for a request head without modifying it.
    pub fn authenticate(&self, parts: &Parts) -> AuthOutcome {
        if self.bypass.contains(parts.uri.path()) {
            return AuthOutcome::Authenticated(None);
        }

        let header = match parts.headers.get(AUTHORIZATION) {
            Some(h) => h,
            None => return AuthOutcome::Rejected(AuthRejection::MissingHeader),
        };

        let token = match header.to_str().ok().and_then(|v| v.strip_prefix(BEARER_PREFIX)) {
            Some(t) => t,
            None => return AuthOutcome::Rejected(AuthRejection::MalformedScheme),
        };

        match self.verifier.verify(token) {
            Ok(ctx) => AuthOutcome::Authenticated(Some(ctx)),
            Err(reason) => AuthOutcome::Rejected(reason),
        }
    }
}

/// Overwrite identity headers with the verified context.
pub fn inject_identity(parts: &mut Parts, ctx: &AuthContext) -> Result<(), AuthRejection> {
    let user_id =
        HeaderValue::from_bytes(ctx.user_id.as_bytes()).map_err(|_| AuthRejection::MissingClaim)?;
    let user_name = HeaderValue::from_bytes(ctx.user_name.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static(crate::auth::token::UNKNOWN_USER_NAME));

    parts.headers.insert(X_USER_ID, user_id);
    parts.headers.insert(X_USER_NAME, user_name);
    Ok(())
}

/// Remove caller-supplied identity headers.
pub fn strip_identity(parts: &mut Parts) {
    parts.headers.remove(X_USER_ID);
    parts.headers.remove(X_USER_NAME);
}

impl Filter for AuthFilter {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn apply(&self, parts: &mut Parts) -> FilterOutcome {
        let path = parts.uri.path().to_string();

        let result = match self.authenticate(parts) {
            AuthOutcome::Authenticated(None) => {
                tracing::debug!(path = %path, "Bypass path, skipping authentication");
                Ok(())
            }
            AuthOutcome::Authenticated(Some(ctx)) => inject_identity(parts, &ctx).map(|()| {
                tracing::debug!(path = %path, user_id = %ctx.user_id, "Token verified, identity headers added");
            }),
            AuthOutcome::Rejected(reason) => Err(reason),
        };

        match result {
            Ok(()) => FilterOutcome::Continue,
            Err(reason) => {
                tracing::warn!(path = %path, reason = reason.as_str(), "Authentication rejected");
                metrics::record_auth_rejection(reason);
                FilterOutcome::Reject(GatewayError::Unauthorized(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{issue_token, now_secs, Claims};
    use axum::http::Request;

    const SECRET: &str = "an-hmac-secret-that-is-long-enough-0123";

    fn filter() -> AuthFilter {
        AuthFilter::new(
            &Secret::new(SECRET).unwrap(),
            0,
            BypassList::new([
                "/api/users/auth/signup",
                "/api/users/auth/login",
                "/api/users/auth/refresh",
            ]),
        )
    }

    fn token(id: Option<&str>, name: Option<&str>) -> String {
        let claims = Claims {
            id: id.map(String::from),
            name: name.map(String::from),
            exp: Some(now_secs() + 900),
        };
        issue_token(&Secret::new(SECRET).unwrap(), &claims).unwrap()
    }

    fn parts(path: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bypass_list_matches_sub_paths_only() {
        let bypass = BypassList::new(["/api/users/auth/login/"]);

        assert!(bypass.contains("/api/users/auth/login"));
        assert!(bypass.contains("/api/users/auth/login/otp"));
        assert!(!bypass.contains("/api/users/auth/login-history"));
        assert!(!bypass.contains("/api/users/profile/login-history"));
        assert!(!bypass.contains("/x/api/users/auth/login"));
    }

    #[test]
    fn test_dot_segments_do_not_escape_bypass() {
        let f = filter();
        for path in [
            "/api/users/auth/login/../../profile",
            "/api/users/auth/login/%2e%2e/%2e%2e/profile",
            "/api/users/auth/login/./x",
        ] {
            assert_eq!(
                f.authenticate(&parts(path, None)),
                AuthOutcome::Rejected(AuthRejection::MissingHeader),
                "path: {}",
                path
            );
        }
    }

    #[test]
    fn test_bypass_skips_token() {
        assert_eq!(
            filter().authenticate(&parts("/api/users/auth/login", None)),
            AuthOutcome::Authenticated(None)
        );
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            filter().authenticate(&parts("/api/users/me", None)),
            AuthOutcome::Rejected(AuthRejection::MissingHeader)
        );
    }

    #[test]
    fn test_malformed_scheme() {
        let t = token(Some("42"), None);
        for value in [t.clone(), format!("bearer {}", t), format!("Basic {}", t)] {
            assert_eq!(
                filter().authenticate(&parts("/api/users/me", Some(&value))),
                AuthOutcome::Rejected(AuthRejection::MalformedScheme)
            );
        }
    }

    #[test]
    fn test_extra_space_leaves_unverifiable_token() {
        let value = format!("Bearer  {}", token(Some("42"), None));
        assert_eq!(
            filter().authenticate(&parts("/api/users/me", Some(&value))),
            AuthOutcome::Rejected(AuthRejection::InvalidSignature)
        );
    }

    #[test]
    fn test_valid_token_injects_headers() {
        let auth = format!("Bearer {}", token(Some("42"), Some("Ada")));
        let mut parts = parts("/api/users/me", Some(&auth));
        parts.headers.insert(X_USER_ID, HeaderValue::from_static("1"));

        assert!(matches!(filter().apply(&mut parts), FilterOutcome::Continue));
        assert_eq!(parts.headers.get(X_USER_ID).unwrap(), "42");
        assert_eq!(parts.headers.get(X_USER_NAME).unwrap(), "Ada");
        assert_eq!(parts.headers.get_all(X_USER_ID).iter().count(), 1);
    }

    #[test]
    fn test_missing_name_injects_unknown() {
        let auth = format!("Bearer {}", token(Some("42"), None));
        let mut parts = parts("/api/users/me", Some(&auth));

        assert!(matches!(filter().apply(&mut parts), FilterOutcome::Continue));
        assert_eq!(parts.headers.get(X_USER_NAME).unwrap(), "Unknown");
    }

    #[test]
    fn test_non_ascii_name_is_forwarded() {
        let auth = format!("Bearer {}", token(Some("42"), Some("José")));
        let mut parts = parts("/api/users/me", Some(&auth));

        assert!(matches!(filter().apply(&mut parts), FilterOutcome::Continue));
        assert_eq!(parts.headers.get(X_USER_NAME).unwrap().as_bytes(), "José".as_bytes());
    }

    #[test]
    fn test_rejection_maps_to_unauthorized() {
        let auth = format!("Bearer {}", token(None, Some("Ada")));
        let mut parts = parts("/api/users/me", Some(&auth));

        match filter().apply(&mut parts) {
            FilterOutcome::Reject(GatewayError::Unauthorized(reason)) => {
                assert_eq!(reason, AuthRejection::MissingClaim)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(parts.headers.get(X_USER_ID).is_none());
    }
}
