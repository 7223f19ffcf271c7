//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http/server.rs, auth/filter.rs produce:
//!     → logging.rs (structured log events, request-id spans)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request
//! - Metrics are recorded even when the exporter is off (no-op recorder)

pub mod logging;
pub mod metrics;

pub use self::logging::{init_logging, LoggingError};
pub use self::metrics::{init_metrics, record_auth_rejection, record_request};
