//! Bearer token signing key and verification.
//!
//! Tokens are HMAC-signed JWTs (HS256/HS384/HS512) carrying an `id` claim,
//! an optional `name` claim and an optional `exp` claim.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::auth::AuthContext;
use crate::error::AuthRejection;

/// Minimum HMAC key length in bytes (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// Fallback user name when the token carries none.
pub const UNKNOWN_USER_NAME: &str = "Unknown";

/// Errors raised while loading the signing key.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("environment variable {0} is not set")]
    Missing(String),

    #[error("signing key is {actual} bytes, at least {min} are required")]
    TooShort { actual: usize, min: usize },
}

/// Process-wide HMAC signing key. Never printed.
#[derive(Clone)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort {
                actual: bytes.len(),
                min: MIN_SECRET_LEN,
            });
        }
        Ok(Self(bytes))
    }

    /// Load the key from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self, SecretError> {
        let value = std::env::var(var).map_err(|_| SecretError::Missing(var.to_string()))?;
        Self::new(value.into_bytes())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Token payload as seen by the gateway.
///
/// Non-string `id` / `name` values are treated as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, deserialize_with = "string_claim", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "string_claim", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

fn string_claim<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

impl Claims {
    /// Derive the identity forwarded to backends.
    pub fn into_context(self) -> Result<AuthContext, AuthRejection> {
        let user_id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(AuthRejection::MissingClaim),
        };
        let user_name = self
            .name
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string());

        Ok(AuthContext { user_id, user_name })
    }
}

/// Verifies bearer tokens against the process-wide secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// `leeway_secs` is the clock skew tolerated when checking `exp`.
    pub fn new(secret: &Secret, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // `exp` is checked when present but not required.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = leeway_secs;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and expiry, then extract the identity claims.
    pub fn verify(&self, token: &str) -> Result<AuthContext, AuthRejection> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthRejection::ExpiredToken,
                _ => AuthRejection::InvalidSignature,
            }
        })?;

        data.claims.into_context()
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Sign an HS256 token. Used by tooling and tests.
pub fn issue_token(secret: &Secret, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
