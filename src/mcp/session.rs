//! MCP Session State Management
//!
//! Tracks per-session state across HTTP requests: the cached effective
//! credential, client identity from the initialize handshake, and activity
//! timestamps for expiry. Sessions live only for the process lifetime; a
//! periodic sweep reclaims entries idle past the configured timeout.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::mcp::protocol::ClientInfo;

/// Header carrying the session identifier on requests and responses
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Generate an unguessable session identifier.
///
/// UUID v4 provides 122 bits of randomness from the system RNG.
pub fn generate_session_id() -> String {
    format!("mcp-{}", Uuid::new_v4())
}

/// Per-session state
#[derive(Debug, Clone)]
pub struct McpSession {
    /// Effective credential cached from the request that created the session
    pub api_key: Option<String>,
    /// Client information from the initialize handshake
    pub client_info: Option<ClientInfo>,
    /// Negotiated protocol version
    pub protocol_version: Option<String>,
    /// Whether the initialize exchange completed
    pub initialized: bool,
    /// When the session was created
    pub created_at: Instant,
    /// When the session last served a request
    pub last_activity: Instant,
}

impl McpSession {
    /// Create a fresh session carrying the credential it was opened with
    pub fn new(api_key: Option<String>) -> Self {
        let now = Instant::now();
        Self {
            api_key,
            client_info: None,
            protocol_version: None,
            initialized: false,
            created_at: now,
            last_activity: now,
        }
    }

    /// Update the last activity timestamp
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Check if the session has been idle beyond the timeout
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Session registry with timeout-based expiry.
///
/// Owned by one router instance and injected through application state, so
/// routers built in different tests never share entries.
pub struct SessionRegistry {
    sessions: DashMap<String, McpSession>,
    timeout: Duration,
}

impl SessionRegistry {
    /// Create a registry with the given inactivity timeout
    pub fn new(timeout: Duration) -> Self {
        Self { sessions: DashMap::new(), timeout }
    }

    /// Insert a session under the given id
    pub fn insert(&self, id: String, session: McpSession) {
        debug!(session_id = %id, "Registered MCP session");
        self.sessions.insert(id, session);
    }

    /// Look up a live session, refreshing its activity timestamp.
    ///
    /// Returns a snapshot of the entry; `None` means the id is unknown or
    /// already swept, which callers treat as a degrade-to-stateless signal
    /// rather than an error.
    pub fn resume(&self, id: &str) -> Option<McpSession> {
        let mut entry = self.sessions.get_mut(id)?;
        entry.touch();
        Some(entry.clone())
    }

    /// Record a completed initialize handshake on a session
    pub fn mark_initialized(
        &self,
        id: &str,
        protocol_version: String,
        client_info: ClientInfo,
        api_key: Option<String>,
    ) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.initialized = true;
            session.protocol_version = Some(protocol_version.clone());
            session.client_info = Some(client_info.clone());
            if session.api_key.is_none() {
                session.api_key = api_key;
            }
            session.touch();

            debug!(
                session_id = %id,
                protocol_version = %protocol_version,
                client_name = %client_info.name,
                "Marked session as initialized"
            );
        }
    }

    /// Check if a session exists
    pub fn exists(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Remove a session.
    ///
    /// Returns true if the session was present.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Removed session");
        }
        removed
    }

    /// Remove sessions idle beyond the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.sessions.len();

        self.sessions.retain(|id, session| {
            let keep = !session.is_expired(self.timeout);
            if !keep {
                debug!(session_id = %id, "Removed expired session");
            }
            keep
        });

        let removed = before - self.sessions.len();
        if removed > 0 {
            debug!(removed, remaining = self.sessions.len(), "Cleaned up expired sessions");
        }
        removed
    }

    /// Get the total number of active sessions
    pub fn total_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Get the inactivity timeout for this registry
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> SessionRegistry {
        SessionRegistry::new(Duration::from_secs(60))
    }

    #[test]
    fn test_generate_session_id_format() {
        let id = generate_session_id();
        assert!(id.starts_with("mcp-"));
        assert_eq!(id.len(), "mcp-".len() + 36);
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn test_session_new_carries_key() {
        let session = McpSession::new(Some("key-123".to_string()));
        assert_eq!(session.api_key.as_deref(), Some("key-123"));
        assert!(!session.initialized);
        assert!(session.client_info.is_none());
    }

    #[test]
    fn test_session_touch() {
        let mut session = McpSession::new(None);
        let initial = session.last_activity;

        std::thread::sleep(Duration::from_millis(10));
        session.touch();

        assert!(session.last_activity > initial);
    }

    #[test]
    fn test_session_is_expired() {
        let session = McpSession::new(None);
        assert!(!session.is_expired(Duration::from_secs(3600)));
        assert!(session.is_expired(Duration::from_secs(0)));
    }

    #[test]
    fn test_resume_unknown_session() {
        let registry = test_registry();
        assert!(registry.resume("mcp-does-not-exist").is_none());
    }

    #[test]
    fn test_insert_and_resume() {
        let registry = test_registry();
        let id = generate_session_id();
        registry.insert(id.clone(), McpSession::new(Some("key".to_string())));

        let session = registry.resume(&id).expect("session should resolve");
        assert_eq!(session.api_key.as_deref(), Some("key"));
        assert_eq!(registry.total_sessions(), 1);
    }

    #[test]
    fn test_mark_initialized() {
        let registry = test_registry();
        let id = generate_session_id();
        registry.insert(id.clone(), McpSession::new(None));

        let client_info = ClientInfo { name: "client".to_string(), version: "1.0.0".to_string() };
        registry.mark_initialized(
            &id,
            "2024-11-05".to_string(),
            client_info,
            Some("late-key".to_string()),
        );

        let session = registry.resume(&id).unwrap();
        assert!(session.initialized);
        assert_eq!(session.protocol_version.as_deref(), Some("2024-11-05"));
        assert_eq!(session.client_info.map(|c| c.name), Some("client".to_string()));
        assert_eq!(session.api_key.as_deref(), Some("late-key"));
    }

    #[test]
    fn test_mark_initialized_keeps_existing_key() {
        let registry = test_registry();
        let id = generate_session_id();
        registry.insert(id.clone(), McpSession::new(Some("original".to_string())));

        let client_info = ClientInfo { name: "client".to_string(), version: "1.0.0".to_string() };
        registry.mark_initialized(&id, "2024-11-05".to_string(), client_info, Some("other".into()));

        assert_eq!(registry.resume(&id).unwrap().api_key.as_deref(), Some("original"));
    }

    #[test]
    fn test_remove_idempotent() {
        let registry = test_registry();
        let id = generate_session_id();
        registry.insert(id.clone(), McpSession::new(None));

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(!registry.exists(&id));
    }

    #[test]
    fn test_cleanup_expired() {
        let registry = SessionRegistry::new(Duration::from_millis(10));
        registry.insert("a".to_string(), McpSession::new(None));
        registry.insert("b".to_string(), McpSession::new(None));
        assert_eq!(registry.total_sessions(), 2);

        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(registry.cleanup_expired(), 2);
        assert_eq!(registry.total_sessions(), 0);
    }

    #[test]
    fn test_cleanup_partial() {
        let registry = SessionRegistry::new(Duration::from_millis(50));
        registry.insert("old".to_string(), McpSession::new(None));

        std::thread::sleep(Duration::from_millis(30));
        registry.insert("new".to_string(), McpSession::new(None));
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(registry.cleanup_expired(), 1);
        assert!(!registry.exists("old"));
        assert!(registry.exists("new"));
    }

    #[test]
    fn test_resume_refreshes_activity() {
        let registry = SessionRegistry::new(Duration::from_millis(60));
        registry.insert("s".to_string(), McpSession::new(None));

        // Keep touching the session past its original expiry horizon
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(30));
            assert!(registry.resume("s").is_some());
        }

        assert_eq!(registry.cleanup_expired(), 0);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(test_registry());
        registry.insert("shared".to_string(), McpSession::new(None));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = registry.resume("shared");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(registry.total_sessions(), 1);
    }
}
