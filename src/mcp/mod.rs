//! MCP Transport and Session Layer
//!
//! Dual-protocol HTTP server for the Model Context Protocol: the modern
//! streamed-response endpoint with session management, plus the legacy
//! SSE/relay channel pair, multiplexed over one router.

pub mod auth;
pub mod cursor;
pub mod error;
pub mod handler;
pub mod http;
pub mod protocol;
pub mod rate_limit;
pub mod relay;
pub mod session;
pub mod sse;

pub use error::McpError;
pub use handler::{McpHandler, RequestMeta};
pub use http::{build_router, AppState};
pub use protocol::*;
pub use rate_limit::RateLimiter;
pub use session::{generate_session_id, McpSession, SessionRegistry, SESSION_ID_HEADER};
pub use sse::SseRegistry;
