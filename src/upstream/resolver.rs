//! Backend name resolution.
//!
//! The routing core only knows logical backend names. A resolver turns a
//! name into a scheme and authority. Discovery and load balancing live
//! outside the gateway; the static resolver is fed from `[backends]`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use axum::http::uri::{Authority, Scheme};
use thiserror::Error;
use url::Url;

use crate::routing::BackendRef;

/// Errors raised while building a resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("backend `{name}`: invalid URL `{url}`: {reason}")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },
}

/// A resolved connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackend {
    pub scheme: Scheme,
    pub authority: Authority,
}

impl fmt::Display for ResolvedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// Maps logical backend names to connection targets.
pub trait BackendResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, backend: &BackendRef) -> Option<ResolvedBackend>;
}

/// Fixed name → address table built at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    targets: HashMap<String, ResolvedBackend>,
}

impl StaticResolver {
    pub fn from_config(backends: &BTreeMap<String, String>) -> Result<Self, ResolveError> {
        let mut targets = HashMap::with_capacity(backends.len());

        for (name, raw) in backends {
            let invalid = |reason: String| ResolveError::InvalidUrl {
                name: name.clone(),
                url: raw.clone(),
                reason,
            };

            let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
            let host = url.host_str().ok_or_else(|| invalid("missing host".into()))?;
            let authority = match url.port_or_known_default() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };

            let target = ResolvedBackend {
                scheme: Scheme::from_str(url.scheme()).map_err(|e| invalid(e.to_string()))?,
                authority: Authority::from_str(&authority).map_err(|e| invalid(e.to_string()))?,
            };
            targets.insert(name.clone(), target);
        }

        Ok(Self { targets })
    }
}

impl BackendResolver for StaticResolver {
    fn resolve(&self, backend: &BackendRef) -> Option<ResolvedBackend> {
        self.targets.get(backend.as_str()).cloned()
    }
}
