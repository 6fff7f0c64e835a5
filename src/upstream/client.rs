//! Instantly API Client
//!
//! Thin reqwest-based client for the Instantly v2 API. Authentication is per
//! request (bearer token from the caller's resolved credential), never cached
//! on the client. Failures are wrapped into `McpError::Upstream` with the
//! original message preserved; this layer does not retry.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::errors::{Error, Result};
use crate::mcp::error::McpError;

/// Seam between the tool invoker and the wrapped API
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Execute one API call and return its decoded JSON body.
    ///
    /// `path` is relative to the configured base URL. An empty response body
    /// (e.g. 204 from a delete) decodes to an empty object.
    async fn request(
        &self,
        method: Method,
        path: &str,
        api_key: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> std::result::Result<Value, McpError>;
}

/// Production client against the Instantly v2 API
pub struct InstantlyClient {
    http: reqwest::Client,
    base_url: String,
}

impl InstantlyClient {
    /// Build a client from upstream configuration
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl Upstream for InstantlyClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        api_key: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> std::result::Result<Value, McpError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, path = %path, "Calling Instantly API");

        let mut request = self.http.request(method, &url).bearer_auth(api_key);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| McpError::Upstream {
            status: None,
            message: format!("request to {} failed: {}", path, e),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| McpError::Upstream {
            status: Some(status.as_u16()),
            message: format!("failed to read response from {}: {}", path, e),
        })?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                path = %path,
                "Instantly API returned an error"
            );
            // Upstream error bodies are JSON with a message field; fall back
            // to the raw body so the original failure text always survives.
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(|m| m.to_string())
                })
                .unwrap_or_else(|| text.clone());
            return Err(McpError::Upstream { status: Some(status.as_u16()), message });
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        serde_json::from_str(&text).map_err(|e| McpError::Upstream {
            status: Some(status.as_u16()),
            message: format!("invalid JSON from {}: {}", path, e),
        })
    }
}
