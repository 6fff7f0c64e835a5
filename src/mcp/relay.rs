//! Legacy Message-Relay Channel
//!
//! `POST /messages` is the write half of the legacy SSE transport: older
//! streaming clients deliver JSON-RPC messages here, keyed by the session id
//! learned from their event stream's `endpoint` event.
//!
//! The channel has a reduced state machine of its own:
//! - a known streaming session delegates the request to it - the response
//!   travels over the event stream and the POST returns 202;
//! - an unknown or absent session falls back to executing directly against
//!   the tool invoker without a transport, covering exactly `tools/list` and
//!   `tools/call`, so the relay stays usable even when the out-of-band
//!   handshake never completed.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::mcp::auth::{self, MIN_API_KEY_LEN};
use crate::mcp::error::McpError;
use crate::mcp::handler::RequestMeta;
use crate::mcp::http::{client_identifier, error_response, AppState};
use crate::mcp::protocol::{JsonRpcRequest, McpMethod};

/// Query parameters for the relay endpoint
#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    /// Streaming-channel session id from the `endpoint` event
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    /// Credential delivery form accepted only on this legacy channel
    pub api_key: Option<String>,
}

/// POST /messages
pub async fn messages_handler(
    State(state): State<AppState>,
    Query(query): Query<RelayQuery>,
    headers: HeaderMap,
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

    let client_id = client_identifier(&headers);
    let streaming_session =
        query.session_id.as_deref().and_then(|id| state.sse_sessions.lookup(id));

    // Credential precedence on this channel: the streaming session's cached
    // key, the query parameter, headers, then (gated) the session-id-shaped
    // value itself.
    let api_key = streaming_session
        .as_ref()
        .and_then(|s| s.api_key.clone())
        .or_else(|| query.api_key.clone())
        .or_else(|| auth::extract_credential(None, &headers))
        .or_else(|| relay_credential(&state, query.session_id.as_deref()));

    let meta = RequestMeta { api_key, client_id };

    match (&streaming_session, query.session_id.as_deref()) {
        (Some(_), Some(session_id)) => {
            // Delegate: the response travels over the event stream.
            debug!(session_id = %session_id, method = %request.method, "Relaying via SSE session");
            let response = state.handler().handle_request(request, &meta).await;

            match state.sse_sessions.send(session_id, response).await {
                Ok(()) => (StatusCode::ACCEPTED, Json(serde_json::json!({ "accepted": true })))
                    .into_response(),
                Err(()) => error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    McpError::InternalError(
                        "Streaming session disconnected before the response was delivered"
                            .to_string(),
                    ),
                ),
            }
        }
        _ => {
            if let Some(session_id) = query.session_id.as_deref() {
                warn!(
                    session_id = %session_id,
                    "Relay session not found; executing request directly"
                );
            }

            // Direct-execution fallback: only the two listed method shapes.
            match McpMethod::parse(&request.method) {
                Some(McpMethod::ToolsList) | Some(McpMethod::ToolsCall) => {
                    let response = state.handler().handle_request(request, &meta).await;
                    Json(response).into_response()
                }
                _ => {
                    let method = request.method.clone();
                    error_response(
                        StatusCode::OK,
                        request.id,
                        McpError::MethodNotFound(format!(
                            "{} (only tools/list and tools/call are available without a \
                             streaming session)",
                            method
                        )),
                    )
                }
            }
        }
    }
}

/// Heuristic credential of last resort: an opaque session-id-shaped query
/// value doubles as the API key when nothing better resolves. Kept for
/// compatibility with clients that put their key in the sessionId slot;
/// disabled via configuration.
fn relay_credential(state: &AppState, session_id: Option<&str>) -> Option<String> {
    if !state.config.relay_key_fallback {
        return None;
    }
    session_id.filter(|id| id.len() >= MIN_API_KEY_LEN).map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::upstream::Upstream;
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct NullUpstream;

    #[async_trait]
    impl Upstream for NullUpstream {
        async fn request(
            &self,
            _method: Method,
            _path: &str,
            _api_key: &str,
            _query: &[(String, String)],
            _body: Option<Value>,
        ) -> Result<Value, McpError> {
            Ok(json!({}))
        }
    }

    fn state_with(config: AppConfig) -> AppState {
        AppState::new(config, Arc::new(NullUpstream))
    }

    #[test]
    fn test_relay_credential_requires_plausible_length() {
        let state = state_with(AppConfig::default());
        assert_eq!(relay_credential(&state, Some("short")), None);
        assert_eq!(
            relay_credential(&state, Some("long-enough-to-be-a-key")).as_deref(),
            Some("long-enough-to-be-a-key")
        );
        assert_eq!(relay_credential(&state, None), None);
    }

    #[test]
    fn test_relay_credential_gated_by_config() {
        let mut config = AppConfig::default();
        config.relay_key_fallback = false;
        let state = state_with(config);
        assert_eq!(relay_credential(&state, Some("long-enough-to-be-a-key")), None);
    }
}
