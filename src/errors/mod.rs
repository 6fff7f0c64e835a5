//! # Error Handling
//!
//! Crate-level error types for startup and transport failures. Protocol-level
//! failures use [`crate::mcp::error::McpError`] instead, which maps onto
//! JSON-RPC error codes.

mod types;

pub use types::{Error, Result};
