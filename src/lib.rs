//! # instantly-mcp
//!
//! MCP (Model Context Protocol) server exposing the Instantly email-campaign
//! API as callable tools over a dual-protocol HTTP transport.
//!
//! ## Architecture
//!
//! The system follows a layered architecture:
//!
//! ```text
//! HTTP Router (dual-mode) → Session Registry → Protocol Handlers → Tool Invoker
//!        ↓                        ↓                    ↓               ↓
//! Credential Extraction    Activity Sweep      Cursor Pagination   Upstream Client
//! ```
//!
//! ## Core Components
//!
//! - **Dual-mode request router**: one `/mcp` endpoint multiplexing stateful
//!   sessions and stateless one-shot exchanges, with graceful degradation
//!   when a presented session id is unknown
//! - **Session registry**: in-memory map of live sessions with last-activity
//!   bookkeeping and periodic expiry
//! - **Legacy channels**: `/sse` event streams plus the `/messages` relay
//!   endpoint for older streaming clients
//! - **Tool invoker**: credential resolution, rate limiting, and dispatch
//!   into the Instantly API client

pub mod config;
pub mod errors;
pub mod mcp;
pub mod observability;
pub mod tools;
pub mod upstream;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
