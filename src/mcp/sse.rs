//! MCP SSE Transport
//!
//! Long-lived read-only event-stream channels for legacy streaming clients.
//! A connection immediately receives an `endpoint` event naming the relay
//! URL (including its session id), then periodic heartbeat comments that
//! defeat intermediary buffering and idle-timeout disconnects. Responses to
//! relay messages are delivered as `message` events.
//!
//! Cleanup is guaranteed by a Drop guard on the stream: client disconnects
//! and socket errors both drop the response body, which unregisters the
//! session and tears down the heartbeat with it.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::mcp::auth;
use crate::mcp::http::{error_response, AppState};
use crate::mcp::protocol::JsonRpcResponse;
use crate::mcp::session::SESSION_ID_HEADER;

/// Heartbeat comment interval. Short enough to hold idle connections open
/// through typical proxy timeouts.
const HEARTBEAT_INTERVAL_SECS: u64 = 15;

/// Queue depth per SSE connection before relay sends are rejected
const CHANNEL_CAPACITY: usize = 32;

/// Metadata for one live SSE channel
#[derive(Debug, Clone)]
pub struct SseSessionInfo {
    /// Credential the channel was opened with, if any
    pub api_key: Option<String>,
    /// When the channel was opened
    pub created_at: Instant,
}

struct SseSession {
    info: SseSessionInfo,
    sender: mpsc::Sender<JsonRpcResponse>,
}

/// Registry of live SSE channels, keyed by their session ids.
///
/// The relay endpoint looks sessions up here to delegate responses back
/// over the stream.
#[derive(Default)]
pub struct SseRegistry {
    sessions: DashMap<String, SseSession>,
}

impl SseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new channel. Returns its session id and the receiving end
    /// of its message queue.
    pub fn register(&self, api_key: Option<String>) -> (String, mpsc::Receiver<JsonRpcResponse>) {
        let id = Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.sessions.insert(
            id.clone(),
            SseSession { info: SseSessionInfo { api_key, created_at: Instant::now() }, sender },
        );
        (id, receiver)
    }

    /// Look up a channel's metadata
    pub fn lookup(&self, id: &str) -> Option<SseSessionInfo> {
        self.sessions.get(id).map(|s| s.info.clone())
    }

    /// Deliver a response over a channel's stream.
    ///
    /// Fails when the id is unknown or the client already disconnected; the
    /// relay endpoint treats both as "no live channel".
    pub async fn send(&self, id: &str, response: JsonRpcResponse) -> Result<(), ()> {
        let sender = match self.sessions.get(id) {
            Some(session) => session.sender.clone(),
            None => return Err(()),
        };
        sender.send(response).await.map_err(|_| ())
    }

    /// Remove a channel.
    ///
    /// Returns true if it was present.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Unregistered SSE session");
        }
        removed
    }

    /// Drop entries whose receiving stream is already gone. The Drop guard
    /// normally handles this; the sweep covers abnormal teardown.
    pub fn cleanup_closed(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.sender.is_closed());
        before - self.sessions.len()
    }

    /// Number of live channels
    pub fn total_sessions(&self) -> usize {
        self.sessions.len()
    }
}

/// Stream wrapper that unregisters the SSE session when dropped.
///
/// Dropping happens on client disconnect and on socket error alike, so the
/// registry entry and the keep-alive timer can never outlive the stream.
struct CleanupStream<S> {
    inner: S,
    registry: std::sync::Arc<SseRegistry>,
    session_id: String,
}

impl<S: Stream + Unpin> Stream for CleanupStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for CleanupStream<S> {
    fn drop(&mut self) {
        info!(session_id = %self.session_id, "SSE connection closed, cleaning up");
        self.registry.unregister(&self.session_id);
    }
}

/// GET /sse - header-authenticated event stream
pub async fn sse_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    open_stream(state, headers, None)
}

/// GET /sse/{api_key} - path-authenticated event stream
pub async fn sse_handler_with_key(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = auth::validate_path_key(&api_key) {
        return error_response(StatusCode::BAD_REQUEST, None, e);
    }
    open_stream(state, headers, Some(api_key))
}

fn open_stream(state: AppState, headers: HeaderMap, path_key: Option<String>) -> Response {
    let api_key = auth::extract_credential(path_key.as_deref(), &headers);
    let (session_id, receiver) = state.sse_sessions.register(api_key);

    info!(session_id = %session_id, "SSE connection established");

    // Immediate connection-established event carrying the relay endpoint.
    let endpoint_event = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", session_id));

    let message_stream = ReceiverStream::new(receiver).map(|response| {
        let data = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
        Ok::<Event, Infallible>(Event::default().event("message").data(data))
    });

    let stream = tokio_stream::once(Ok::<Event, Infallible>(endpoint_event)).chain(message_stream);
    let stream = CleanupStream {
        inner: stream,
        registry: state.sse_sessions.clone(),
        session_id: session_id.clone(),
    };

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new().interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS)).text("heartbeat"),
    );

    let mut response = sse.into_response();
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(HeaderName::from_static(SESSION_ID_HEADER), value);
    }
    response
}
