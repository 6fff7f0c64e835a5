//! # Observability Infrastructure
//!
//! Structured logging for the MCP server via the tracing ecosystem.

pub mod logging;

pub use logging::init_logging;
