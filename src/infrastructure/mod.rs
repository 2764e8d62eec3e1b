//! Infrastructure layer module
//!
//! Cross-cutting concerns the binary wires together:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
