//! traQ Core - configuration, error handling, and logging for the traQ bot client.
//!
//! This crate provides the foundation used by `traq-ws`:
//! - Client configuration and access-token resolution
//! - The error taxonomy shared by setup and runtime paths
//! - Optional subscriber setup for the `tracing` output
//! - Common constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Re-export commonly used items at the crate root
pub use config::{ClientConfig, ResolvedConfig};
pub use error::{DecodeError, TraqError, TraqResult};
pub use logging::{init_logging, LogGuard};
