//! MCP Error Types
//!
//! Protocol-level error taxonomy. Every variant maps to a stable JSON-RPC
//! error code; messages are written to be shown to end users by MCP clients,
//! so rejection messages carry actionable hints rather than bare codes.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::mcp::protocol::{error_codes, JsonRpcError};

/// Guidance appended to authentication failures. Lists every accepted
/// credential-delivery form, since clients display this text directly.
pub const CREDENTIAL_GUIDANCE: &str = "Provide an Instantly API key via one of: \
     URL path (/mcp/{api_key}), 'Authorization: Bearer {key}' header, \
     'x-instantly-api-key' header, 'x-api-key' header, or the INSTANTLY_API_KEY \
     environment variable on the server.";

#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("No API key found for this request. {CREDENTIAL_GUIDANCE}")]
    MissingCredential,

    #[error("Session teardown requires the mcp-session-id header")]
    TeardownMissingHeader,

    #[error("Session not found: {0}")]
    TeardownUnknownSession(String),

    #[error("Rate limit exceeded; retry after {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Instantly API request failed: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::ParseError(_) => error_codes::PARSE_ERROR,
            McpError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => {
                error_codes::METHOD_NOT_FOUND
            }
            McpError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            McpError::TeardownMissingHeader | McpError::TeardownUnknownSession(_) => {
                error_codes::INVALID_REQUEST
            }
            McpError::MissingCredential => error_codes::AUTHENTICATION_REQUIRED,
            McpError::RateLimited { .. } => error_codes::RATE_LIMITED,
            McpError::InternalError(_)
            | McpError::Upstream { .. }
            | McpError::SerializationError(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Convert to JsonRpcError, attaching structured data where the error
    /// carries machine-usable detail (reset times, upstream status)
    pub fn to_json_rpc_error(&self) -> JsonRpcError {
        let data = match self {
            McpError::RateLimited { reset_at } => {
                Some(serde_json::json!({ "resetTime": reset_at.to_rfc3339() }))
            }
            McpError::Upstream { status: Some(status), .. } => {
                Some(serde_json::json!({ "upstreamStatus": status }))
            }
            _ => None,
        };

        JsonRpcError { code: self.error_code(), message: self.to_string(), data }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(error: McpError) -> Self {
        error.to_json_rpc_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(McpError::ParseError("x".into()).error_code(), error_codes::PARSE_ERROR);
        assert_eq!(McpError::InvalidRequest("x".into()).error_code(), error_codes::INVALID_REQUEST);
        assert_eq!(
            McpError::MethodNotFound("x".into()).error_code(),
            error_codes::METHOD_NOT_FOUND
        );
        assert_eq!(McpError::ToolNotFound("x".into()).error_code(), error_codes::METHOD_NOT_FOUND);
        assert_eq!(McpError::InvalidParams("x".into()).error_code(), error_codes::INVALID_PARAMS);
        assert_eq!(
            McpError::MissingCredential.error_code(),
            error_codes::AUTHENTICATION_REQUIRED
        );
        assert_eq!(McpError::TeardownMissingHeader.error_code(), error_codes::INVALID_REQUEST);
        assert_eq!(
            McpError::TeardownUnknownSession("mcp-x".into()).error_code(),
            error_codes::INVALID_REQUEST
        );
        assert_eq!(
            McpError::Upstream { status: Some(500), message: "boom".into() }.error_code(),
            error_codes::INTERNAL_ERROR
        );
    }

    #[test]
    fn test_missing_credential_lists_delivery_forms() {
        let message = McpError::MissingCredential.to_string();
        assert!(message.contains("/mcp/{api_key}"));
        assert!(message.contains("Authorization: Bearer"));
        assert!(message.contains("x-instantly-api-key"));
        assert!(message.contains("x-api-key"));
        assert!(message.contains("INSTANTLY_API_KEY"));
    }

    #[test]
    fn test_rate_limited_carries_reset_time() {
        let reset_at = Utc::now();
        let error = McpError::RateLimited { reset_at }.to_json_rpc_error();

        assert_eq!(error.code, error_codes::RATE_LIMITED);
        let data = error.data.expect("rate limit error should carry data");
        assert_eq!(data["resetTime"], reset_at.to_rfc3339());
    }

    #[test]
    fn test_upstream_error_preserves_message() {
        let error = McpError::Upstream { status: Some(422), message: "invalid campaign".into() };
        let rpc: JsonRpcError = error.into();

        assert!(rpc.message.contains("invalid campaign"));
        assert_eq!(rpc.data.unwrap()["upstreamStatus"], 422);
    }
}
