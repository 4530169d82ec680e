//! Shared plumbing for the mavcam crates.

pub mod tracing;

pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
