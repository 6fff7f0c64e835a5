//! Credential Extraction
//!
//! Pure functions mapping a request's path segment and headers to a single
//! effective API key. Precedence (highest first): URL path segment, bearer
//! `Authorization` header, `x-instantly-api-key`, then the legacy `x-api-key`
//! header. Query-parameter delivery is honored only on the legacy relay
//! channel and handled there.

use axum::http::HeaderMap;

use crate::mcp::error::McpError;

/// Primary custom header carrying the API key
pub const API_KEY_HEADER: &str = "x-instantly-api-key";

/// Secondary header honored for backward compatibility only
pub const LEGACY_API_KEY_HEADER: &str = "x-api-key";

/// Minimum plausible length for a path-delivered key. Shorter segments are
/// rejected before any session logic runs, so typos in the URL never open a
/// session bound to a garbage credential.
pub const MIN_API_KEY_LEN: usize = 10;

/// Validate a key delivered as a URL path segment
pub fn validate_path_key(key: &str) -> Result<(), McpError> {
    if key.len() < MIN_API_KEY_LEN {
        return Err(McpError::InvalidRequest(format!(
            "API key in URL path is too short ({} characters, minimum {})",
            key.len(),
            MIN_API_KEY_LEN
        )));
    }
    Ok(())
}

/// Resolve the effective credential for a request.
///
/// `path_key` must already have passed [`validate_path_key`]. Returns `None`
/// when no delivery form is present; whether that is fatal depends on the
/// method (initialize is credential-agnostic).
pub fn extract_credential(path_key: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(key) = path_key {
        return Some(key.to_string());
    }

    if let Some(token) = bearer_token(headers) {
        return Some(token);
    }

    for header in [API_KEY_HEADER, LEGACY_API_KEY_HEADER] {
        if let Some(value) = header_value(headers, header) {
            return Some(value);
        }
    }

    None
}

/// Extract the `Authorization` header value, stripping an optional
/// `Bearer ` prefix
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_value(headers, "authorization")?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(&raw).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
