//! MCP Request Handler
//!
//! The protocol handler set: `initialize`, `tools/list` and `tools/call`
//! bound to one conceptual server instance. Handlers are stateless with
//! respect to transport; the only parameterization is an optional fallback
//! credential, so the same handler serves session-bound and one-shot
//! exchanges alike.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::mcp::cursor;
use crate::mcp::error::McpError;
use crate::mcp::protocol::*;
use crate::mcp::rate_limit::RateLimiter;
use crate::tools;
use crate::upstream::Upstream;
use crate::{APP_NAME, VERSION};

/// Request-scoped metadata attached by the transport
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Credential extracted from the transport (headers, path, or the
    /// session's cached key)
    pub api_key: Option<String>,
    /// Client network identifier used for rate limiting
    pub client_id: Option<String>,
}

/// Protocol handler set bound to shared collaborators
pub struct McpHandler {
    config: Arc<AppConfig>,
    upstream: Arc<dyn Upstream>,
    rate_limiter: Arc<RateLimiter>,
}

impl McpHandler {
    /// Create a handler over the injected collaborators
    pub fn new(
        config: Arc<AppConfig>,
        upstream: Arc<dyn Upstream>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self { config, upstream, rate_limiter }
    }

    /// Handle an incoming JSON-RPC request
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        meta: &RequestMeta,
    ) -> JsonRpcResponse {
        let method = request.method.clone();
        let id = request.id.clone();

        debug!(method = %method, id = ?id, "Handling MCP request");

        let response = match McpMethod::parse(&request.method) {
            Some(McpMethod::Initialize) => self.handle_initialize(request.id, request.params),
            Some(McpMethod::Initialized) => {
                JsonRpcResponse::success(request.id, serde_json::json!({}))
            }
            Some(McpMethod::Ping) => JsonRpcResponse::success(request.id, serde_json::json!({})),
            Some(McpMethod::ToolsList) => self.handle_tools_list(request.id, request.params),
            Some(McpMethod::ToolsCall) => {
                self.handle_tools_call(request.id, request.params, meta).await
            }
            None => self.error_response(request.id, McpError::MethodNotFound(request.method)),
        };

        debug!(
            method = %method,
            has_error = response.error.is_some(),
            "Completed MCP request"
        );

        response
    }

    /// Handle `initialize`.
    ///
    /// Deterministic and side-effect free: fixed protocol version, tools-only
    /// capabilities, static identity. Session bookkeeping happens in the
    /// transport layer, which owns the registry.
    fn handle_initialize(&self, id: Option<JsonRpcId>, params: Value) -> JsonRpcResponse {
        let params: InitializeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse initialize params: {}", e)),
                );
            }
        };

        debug!(
            client_name = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = %params.protocol_version,
            "Received initialize request"
        );

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: Some(true) }),
            },
            server_info: ServerInfo { name: APP_NAME.to_string(), version: VERSION.to_string() },
            instructions: Some(
                "Tools wrap the Instantly email-campaign API. Every tool call needs an \
                 Instantly API key, delivered via the URL path, an Authorization bearer \
                 header, or the x-instantly-api-key header."
                    .to_string(),
            ),
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    /// Handle `tools/list` with cursor pagination.
    ///
    /// A missing, malformed or out-of-range cursor restarts from the top of
    /// the catalog; chaining returned cursors visits every entry exactly once.
    fn handle_tools_list(&self, id: Option<JsonRpcId>, params: Value) -> JsonRpcResponse {
        let params: ToolsListParams = serde_json::from_value(params).unwrap_or_default();

        let catalog = tools::catalog();
        let pagination = &self.config.pagination;

        let (page, next_cursor) = if !pagination.enabled || pagination.page_size >= catalog.len() {
            (catalog.to_vec(), None)
        } else {
            let start = params
                .cursor
                .as_deref()
                .and_then(cursor::decode)
                .unwrap_or(0)
                .min(catalog.len().saturating_sub(1));
            let end = (start + pagination.page_size).min(catalog.len());

            let next = if end < catalog.len() { Some(cursor::encode(end)) } else { None };
            (catalog[start..end].to_vec(), next)
        };

        debug!(
            total = catalog.len(),
            page_len = page.len(),
            has_cursor = next_cursor.is_some(),
            "Listed tools"
        );

        let result = ToolsListResult { tools: page, next_cursor };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    /// Handle `tools/call`: resolve the credential, consult the rate
    /// limiter, then dispatch into the tool catalog.
    async fn handle_tools_call(
        &self,
        id: Option<JsonRpcId>,
        params: Value,
        meta: &RequestMeta,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse tool call params: {}", e)),
                );
            }
        };

        let mut args = params.arguments.unwrap_or_else(|| serde_json::json!({}));

        let api_key = match self.resolve_credential(&mut args, meta) {
            Ok(key) => key,
            Err(e) => return self.error_response(id, e),
        };

        // Budget check precedes any upstream call.
        if self.config.production {
            let client = meta.client_id.as_deref().unwrap_or("unknown");
            if let Err(e) = self.rate_limiter.check(client).await {
                return self.error_response(id, e);
            }
        }

        debug!(tool_name = %params.name, "Executing tool call");

        match tools::execute(&params.name, args, &api_key, self.upstream.as_ref()).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => self.error_response(id, McpError::SerializationError(e)),
            },
            Err(e) => {
                warn!(tool_name = %params.name, error = %e, "Tool call failed");
                self.error_response(id, e)
            }
        }
    }

    /// Resolve the effective credential for a tool call.
    ///
    /// Order: a key embedded in the arguments record (compatibility shim,
    /// removed from the record so it never leaks downstream), then the
    /// transport-attached key, then the process-wide fallback.
    fn resolve_credential(
        &self,
        args: &mut Value,
        meta: &RequestMeta,
    ) -> Result<String, McpError> {
        let embedded = args.as_object_mut().and_then(|map| {
            let key = map
                .get("api_key")
                .or_else(|| map.get("apiKey"))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string());
            map.remove("api_key");
            map.remove("apiKey");
            key
        });

        embedded
            .or_else(|| meta.api_key.clone())
            .or_else(|| self.config.upstream.fallback_api_key.clone())
            .ok_or(McpError::MissingCredential)
    }

    /// Convert an MCP error into a JSON-RPC error response
    fn error_response(&self, id: Option<JsonRpcId>, error: McpError) -> JsonRpcResponse {
        JsonRpcResponse::error(id, error.to_json_rpc_error())
    }
}
