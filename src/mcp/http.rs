//! MCP HTTP Transport
//!
//! The dual-mode request router. One `/mcp` endpoint serves both stateful
//! sessions and stateless one-shot exchanges; per inbound request the router
//! decides, in order:
//!
//! 1. **Session-resume** - a known `mcp-session-id` header reuses the live
//!    registry entry and refreshes its activity clock.
//! 2. **Session-miss** - an unknown id degrades to a fresh stateless
//!    exchange. Client-side session ids outlive server restarts, so a miss
//!    is a reconnect, never an error.
//! 3. **Session-less** - no id means a stateless exchange.
//! 4. **Initialize carve-out** - `initialize` passes without a credential
//!    because credential and session are negotiated together; its response
//!    may carry a newly minted session id.
//!
//! Credential extraction runs independently of session state, with the
//! precedence defined in [`crate::mcp::auth`].
//!
//! Registry mutations happen in the synchronous sections of request
//! handling, never across an await. There is no per-session mutex:
//! overlapping concurrent calls on the same session id are a caller
//! responsibility, which MCP clients already satisfy by awaiting each
//! response before issuing the next.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::mcp::auth;
use crate::mcp::error::{McpError, CREDENTIAL_GUIDANCE};
use crate::mcp::handler::{McpHandler, RequestMeta};
use crate::mcp::protocol::{
    InitializeParams, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
};
use crate::mcp::rate_limit::RateLimiter;
use crate::mcp::relay;
use crate::mcp::session::{generate_session_id, McpSession, SessionRegistry, SESSION_ID_HEADER};
use crate::mcp::sse::{self, SseRegistry};
use crate::tools;
use crate::upstream::Upstream;
use crate::{APP_NAME, VERSION};

/// Header echoing the negotiated protocol version on every response
const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Shared application state.
///
/// All registries are owned here and injected into one router instance, so
/// routers built in different tests never cross-contaminate.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionRegistry>,
    pub sse_sessions: Arc<SseRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub upstream: Arc<dyn Upstream>,
    pub started_at: Instant,
}

impl AppState {
    /// Build application state from configuration and an upstream client
    pub fn new(config: AppConfig, upstream: Arc<dyn Upstream>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window(),
            config.production,
        ));
        let sessions = Arc::new(SessionRegistry::new(config.session.timeout()));

        Self {
            config: Arc::new(config),
            sessions,
            sse_sessions: Arc::new(SseRegistry::new()),
            rate_limiter,
            upstream,
            started_at: Instant::now(),
        }
    }

    /// Create a protocol handler bound to this state's collaborators
    pub fn handler(&self) -> McpHandler {
        McpHandler::new(self.config.clone(), self.upstream.clone(), self.rate_limiter.clone())
    }
}

/// Build the HTTP router over injected state
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/ping", get(ping_handler))
        .route(
            "/mcp",
            get(discovery_handler).post(mcp_post_handler).delete(mcp_delete_handler),
        )
        .route(
            "/mcp/{api_key}",
            get(discovery_with_key_handler).post(mcp_post_with_key_handler),
        )
        .route("/messages", post(relay::messages_handler))
        .route("/sse", get(sse::sse_handler))
        .route("/sse/{api_key}", get(sse::sse_handler_with_key))
        .route(
            "/.well-known/oauth-authorization-server",
            get(oauth_unsupported_handler).post(oauth_unsupported_handler),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(oauth_unsupported_handler).post(oauth_unsupported_handler),
        )
        .route(
            "/.well-known/oauth-authorization-server/{api_key}",
            get(oauth_ready_handler).post(oauth_ready_handler),
        )
        .route(
            "/.well-known/oauth-protected-resource/{api_key}",
            get(oauth_ready_handler).post(oauth_ready_handler),
        )
        .route("/register", post(register_unsupported_handler))
        .route("/authorize", get(authorize_handler))
        .layer(middleware::from_fn_with_state(state.clone(), common_headers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fixed headers on every response: protocol version, cache disabling and
/// the keep-alive directive tuned past the slowest upstream operation
async fn common_headers(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(PROTOCOL_VERSION_HEADER),
        HeaderValue::from_static(PROTOCOL_VERSION),
    );
    headers.insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("timeout={}", state.config.server.keep_alive_secs))
    {
        headers.insert(HeaderName::from_static("keep-alive"), value);
    }

    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any).expose_headers([
        HeaderName::from_static(SESSION_ID_HEADER),
        HeaderName::from_static(PROTOCOL_VERSION_HEADER),
    ]);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> =
            origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}

/// POST /mcp - header-authenticated entry point
async fn mcp_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    serve_mcp(state, headers, None, body).await
}

/// POST /mcp/{api_key} - path-authenticated entry point
async fn mcp_post_with_key_handler(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // The path segment is rejected before any session logic runs.
    if let Err(e) = auth::validate_path_key(&api_key) {
        return error_response(StatusCode::BAD_REQUEST, None, e);
    }
    serve_mcp(state, headers, Some(api_key), body).await
}

/// The dual-mode state machine shared by both authenticated entry points
async fn serve_mcp(
    state: AppState,
    headers: HeaderMap,
    path_key: Option<String>,
    body: Bytes,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                None,
                McpError::ParseError(e.to_string()),
            );
        }
    };

    let request_id = request.id.clone();
    let is_initialize = request.method == "initialize";
    let transport_key = auth::extract_credential(path_key.as_deref(), &headers);
    let client_id = client_identifier(&headers);

    // Session state, derived in order: resume, miss (degrade), none.
    let presented_session =
        headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok()).map(|s| s.to_string());
    let resumed = presented_session
        .as_deref()
        .and_then(|sid| state.sessions.resume(sid).map(|session| (sid.to_string(), session)));

    if let Some(sid) = presented_session.as_deref() {
        match &resumed {
            Some(_) => debug!(session_id = %sid, method = %request.method, "Resumed session"),
            None => warn!(
                session_id = %sid,
                method = %request.method,
                "Unknown session id presented; degrading to stateless exchange"
            ),
        }
    }

    let effective_key =
        transport_key.clone().or_else(|| resumed.as_ref().and_then(|(_, s)| s.api_key.clone()));

    // Initialize is credential-agnostic; everything else needs a resolvable
    // key from some delivery form before any tool can run.
    if !is_initialize
        && effective_key.is_none()
        && state.config.upstream.fallback_api_key.is_none()
        && !has_embedded_key(&request)
    {
        return error_response(StatusCode::UNAUTHORIZED, request_id, McpError::MissingCredential);
    }

    let init_params = if is_initialize {
        serde_json::from_value::<InitializeParams>(request.params.clone()).ok()
    } else {
        None
    };

    let meta = RequestMeta { api_key: effective_key, client_id };
    let response = state.handler().handle_request(request, &meta).await;

    // Session bookkeeping: echo a resumed id, or mint one when a stateless
    // initialize elected to run statefully.
    let mut bound_session = resumed.as_ref().map(|(sid, _)| sid.clone());
    if is_initialize && response.error.is_none() {
        let protocol_version = response
            .result
            .as_ref()
            .and_then(|r| r.get("protocolVersion"))
            .and_then(|v| v.as_str())
            .unwrap_or(PROTOCOL_VERSION)
            .to_string();

        let sid = match &bound_session {
            Some(sid) => sid.clone(),
            None => {
                let sid = generate_session_id();
                state.sessions.insert(sid.clone(), McpSession::new(transport_key.clone()));
                bound_session = Some(sid.clone());
                sid
            }
        };

        if let Some(params) = &init_params {
            state.sessions.mark_initialized(
                &sid,
                protocol_version,
                params.client_info.clone(),
                transport_key.clone(),
            );
            info!(
                session_id = %sid,
                client = %params.client_info.name,
                "Session initialized"
            );
        }
    }

    let mut http_response = Json(response).into_response();
    if let Some(sid) = bound_session {
        if let Ok(value) = HeaderValue::from_str(&sid) {
            http_response.headers_mut().insert(HeaderName::from_static(SESSION_ID_HEADER), value);
        }
    }
    http_response
}

/// DELETE /mcp - explicit session teardown.
///
/// 400 without the session header, 404 for an unknown id (safe under double
/// teardown), 204 with an empty body on success.
async fn mcp_delete_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = match headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(id) => id.to_string(),
        None => {
            return error_response(StatusCode::BAD_REQUEST, None, McpError::TeardownMissingHeader);
        }
    };

    if state.sessions.remove(&session_id) {
        info!(session_id = %session_id, "Session terminated by client");
        StatusCode::NO_CONTENT.into_response()
    } else {
        debug!(session_id = %session_id, "Teardown for unknown session");
        error_response(StatusCode::NOT_FOUND, None, McpError::TeardownUnknownSession(session_id))
    }
}

/// GET /mcp and /mcp/{api_key} - synchronous discovery.
///
/// Always returns immediately with server identity and tool count; never
/// blocks on session setup.
async fn discovery_handler(State(state): State<AppState>) -> Response {
    discovery_payload(&state, false)
}

async fn discovery_with_key_handler(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
) -> Response {
    discovery_payload(&state, auth::validate_path_key(&api_key).is_ok())
}

fn discovery_payload(state: &AppState, authenticated: bool) -> Response {
    Json(json!({
        "name": APP_NAME,
        "version": VERSION,
        "description": "MCP server for the Instantly email-campaign API",
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": true } },
        "toolCount": tools::catalog().len(),
        "transports": ["streamable-http", "sse"],
        "endpoints": {
            "mcp": "/mcp",
            "mcpWithKey": "/mcp/{api_key}",
            "sse": "/sse",
            "messages": "/messages"
        },
        "authenticated": authenticated,
        "paginationEnabled": state.config.pagination.enabled,
        "ready": true
    }))
    .into_response()
}

/// GET /health - liveness plus registry counts
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": VERSION,
        "activeSessions": state.sessions.total_sessions(),
        "sseSessions": state.sse_sessions.total_sessions(),
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /info - static capability and endpoint advertisement
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": APP_NAME,
        "version": VERSION,
        "protocolVersion": PROTOCOL_VERSION,
        "toolCount": tools::catalog().len(),
        "capabilities": { "tools": { "listChanged": true } },
        "authentication": {
            "methods": [
                "url-path (/mcp/{api_key})",
                "authorization-bearer",
                "x-instantly-api-key",
                "x-api-key (legacy)"
            ],
            "oauth": false
        },
        "endpoints": {
            "mcp": "/mcp",
            "mcpWithKey": "/mcp/{api_key}",
            "sse": "/sse",
            "sseWithKey": "/sse/{api_key}",
            "messages": "/messages",
            "health": "/health",
            "ping": "/ping"
        },
        "pagination": {
            "enabled": state.config.pagination.enabled,
            "pageSize": state.config.pagination.page_size
        },
        "production": state.config.production,
    }))
}

/// GET /ping - trivial liveness probe
async fn ping_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": chrono::Utc::now().to_rfc3339() }))
}

/// OAuth discovery refusal: steers clients toward API-key delivery instead
/// of an OAuth flow this server does not implement
async fn oauth_unsupported_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "oauth_not_supported",
            "message": format!("This server does not implement OAuth. {}", CREDENTIAL_GUIDANCE),
        })),
    )
        .into_response()
}

/// Path-parameterized well-known variant: a key already embedded in the
/// path means no further auth negotiation is needed
async fn oauth_ready_handler(Path(api_key): Path<String>) -> Response {
    Json(json!({
        "ready": true,
        "authenticated": auth::validate_path_key(&api_key).is_ok(),
        "message": "API key is embedded in the endpoint path; no OAuth flow is required.",
    }))
    .into_response()
}

/// POST /register - dynamic client registration is not offered
async fn register_unsupported_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "registration_not_supported",
            "message": format!("OAuth client registration is not supported. {}", CREDENTIAL_GUIDANCE),
        })),
    )
        .into_response()
}

/// GET /authorize - MCP-flavored discovery payload, not an OAuth redirect
async fn authorize_handler() -> Json<serde_json::Value> {
    Json(json!({
        "mcpServer": true,
        "authorizationRequired": "api-key",
        "message": format!("No interactive authorization flow exists. {}", CREDENTIAL_GUIDANCE),
        "endpoints": { "mcp": "/mcp", "mcpWithKey": "/mcp/{api_key}" },
    }))
}

/// Wrap an MCP error into an HTTP response with a JSON-RPC envelope
pub(crate) fn error_response(
    status: StatusCode,
    id: Option<crate::mcp::protocol::JsonRpcId>,
    error: McpError,
) -> Response {
    (status, Json(JsonRpcResponse::error(id, error.to_json_rpc_error()))).into_response()
}

/// Client network identifier for rate limiting: first forwarded address,
/// else the direct peer's advertised address header
pub(crate) fn client_identifier(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    headers.get("x-real-ip").and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string())
}

/// Check for the transitional argument-embedded credential so the router's
/// auth gate does not reject a call the invoker could still resolve
fn has_embedded_key(request: &JsonRpcRequest) -> bool {
    request
        .params
        .get("arguments")
        .map(|args| {
            ["api_key", "apiKey"]
                .iter()
                .any(|k| args.get(k).and_then(|v| v.as_str()).is_some_and(|s| !s.is_empty()))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_identifier_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5, 10.0.0.1"));
        assert_eq!(client_identifier(&headers).as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn test_client_identifier_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_identifier(&headers).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_client_identifier_absent() {
        assert_eq!(client_identifier(&HeaderMap::new()), None);
    }

    #[test]
    fn test_has_embedded_key() {
        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "list_campaigns", "arguments": {"api_key": "k123"}}
        }))
        .unwrap();
        assert!(has_embedded_key(&request));

        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "list_campaigns", "arguments": {}}
        }))
        .unwrap();
        assert!(!has_embedded_key(&request));
    }
}
