//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route compilation dry-run)
//!     → GatewayConfig (validated, immutable)
//!     → consumed once at startup to build the route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; route changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The signing key never lives in the file, only the name of its env var

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, PredicateConfig,
    RewriteConfig, RouteConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
