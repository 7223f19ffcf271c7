//! Request-level error taxonomy.
//!
//! # Responsibilities
//! - Enumerate every way a proxied request can fail
//! - Map each failure to the status code surfaced to the caller
//!
//! # Design Decisions
//! - All authentication rejections share one external response
//! - No route is an expected outcome, reported as 404 and never as 401
//! - Upstream failures are reported once, never retried

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why the authentication filter refused a request.
///
/// Only ever logged. Callers see a single "unauthorized" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not a Bearer credential")]
    MalformedScheme,

    #[error("token signature or structure is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token is missing the required id claim")]
    MissingClaim,
}

impl AuthRejection {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthRejection::MissingHeader => "missing_header",
            AuthRejection::MalformedScheme => "malformed_scheme",
            AuthRejection::InvalidSignature => "invalid_signature",
            AuthRejection::ExpiredToken => "expired_token",
            AuthRejection::MissingClaim => "missing_claim",
        }
    }
}

/// Errors that end a request inside the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The path contains `.` or `..` segments and is refused before routing.
    #[error("request path contains dot segments")]
    InvalidPath,

    /// No route predicate matched the request.
    #[error("no route matched the request")]
    NoRouteMatch,

    /// The route's authentication filter rejected the request.
    #[error("unauthorized: {0}")]
    Unauthorized(AuthRejection),

    /// The backend could not be reached or the exchange failed mid-flight.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The backend did not answer within the configured deadline.
    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),
}

impl GatewayError {
    /// Status code surfaced to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidPath => StatusCode::BAD_REQUEST,
            GatewayError::NoRouteMatch => StatusCode::NOT_FOUND,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short public label. Never carries rejection detail.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidPath => "invalid_path",
            GatewayError::NoRouteMatch => "no_route",
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::UpstreamUnavailable(_) => "upstream_unavailable",
            GatewayError::UpstreamTimeout(_) => "upstream_timeout",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(json!({ "error": self.kind() }))).into_response();
        if let GatewayError::Unauthorized(_) = self {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type for request handling.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::InvalidPath.status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::NoRouteMatch.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::Unauthorized(AuthRejection::ExpiredToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::UpstreamUnavailable("refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::UpstreamTimeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[tokio::test]
    async fn test_unauthorized_body_hides_reason() {
        let reasons = [
            AuthRejection::MissingHeader,
            AuthRejection::MalformedScheme,
            AuthRejection::InvalidSignature,
            AuthRejection::ExpiredToken,
            AuthRejection::MissingClaim,
        ];

        for reason in reasons {
            let response = GatewayError::Unauthorized(reason).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
                "Bearer"
            );
            let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
            assert_eq!(&body[..], br#"{"error":"unauthorized"}"#);
        }
    }
}
