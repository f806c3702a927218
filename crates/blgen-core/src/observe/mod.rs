//! # Observability
//!
//! Structured logging for blgen via `tracing`. Every driver step logs one
//! event with its parameters; device write chunks log at trace level.

mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
