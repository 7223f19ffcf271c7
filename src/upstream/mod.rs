//! Upstream (backend) subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardInstruction (backend name, path+query)
//!     → resolver.rs (name → scheme + authority)
//!     → client.rs (send once, deadline, relay response)
//! ```

pub mod client;
pub mod resolver;

pub use client::Forwarder;
pub use resolver::{BackendResolver, ResolveError, ResolvedBackend, StaticResolver};
