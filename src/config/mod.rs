//! # Configuration Management
//!
//! Environment-driven configuration for the MCP server. Every option has a
//! default suitable for local development; production deployments override
//! via environment variables (a `.env` file is honored at startup).

use std::time::Duration;

use crate::errors::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Tool-listing pagination configuration
    pub pagination: PaginationConfig,
    /// Rolling-window rate limiting (active only in production mode)
    pub rate_limit: RateLimitConfig,
    /// Session registry timeouts
    pub session: SessionConfig,
    /// Upstream Instantly API client configuration
    pub upstream: UpstreamConfig,
    /// Whether the server runs in production mode (gates rate limiting)
    pub production: bool,
    /// Whether the legacy relay channel may treat a session-id-shaped query
    /// value as the API key when no better source resolves
    pub relay_key_fallback: bool,
    /// Log output format ("text" or "json")
    pub log_format: LogFormat,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS allowed origins; `*` allows any origin
    pub cors_origins: Vec<String>,
    /// Keep-alive timeout advertised to clients, tuned to exceed the slowest
    /// expected upstream operation (email verification polling, bulk moves)
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            keep_alive_secs: 125,
        }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Tool-listing pagination configuration
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Whether `tools/list` responses are paginated at all
    pub enabled: bool,
    /// Page size when pagination is enabled
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { enabled: false, page_size: 10 }
    }
}

/// Fixed-window rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per client within one window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 100, window_secs: 900 }
    }
}

impl RateLimitConfig {
    /// Get the window length as a Duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Session registry configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity timeout after which a session is reclaimed
    pub timeout_secs: u64,
    /// Sweep interval; kept short relative to the timeout to bound
    /// worst-case memory growth from abandoned sessions
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { timeout_secs: 1800, sweep_interval_secs: 60 }
    }
}

impl SessionConfig {
    /// Get the session timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the sweep interval as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Upstream Instantly API configuration
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the wrapped API
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Process-wide fallback credential for single-tenant / non-HTTP use
    pub fallback_api_key: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.instantly.ai/api/v2".to_string(),
            timeout_secs: 90,
            fallback_api_key: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pagination: PaginationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            session: SessionConfig::default(),
            upstream: UpstreamConfig::default(),
            production: false,
            relay_key_fallback: true,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = env_string("INSTANTLY_MCP_HOST", &defaults.server.host);
        let port = env_parse("INSTANTLY_MCP_PORT", defaults.server.port)?;
        let cors_origins = std::env::var("INSTANTLY_MCP_CORS_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
            })
            .unwrap_or(defaults.server.cors_origins);

        let pagination = PaginationConfig {
            enabled: env_bool("INSTANTLY_MCP_PAGINATION", defaults.pagination.enabled),
            page_size: env_parse("INSTANTLY_MCP_PAGE_SIZE", defaults.pagination.page_size)?,
        };
        if pagination.enabled && pagination.page_size == 0 {
            return Err(Error::config("INSTANTLY_MCP_PAGE_SIZE must be at least 1"));
        }

        let rate_limit = RateLimitConfig {
            max_requests: env_parse(
                "INSTANTLY_MCP_RATE_LIMIT_MAX",
                defaults.rate_limit.max_requests,
            )?,
            window_secs: env_parse(
                "INSTANTLY_MCP_RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit.window_secs,
            )?,
        };

        let session = SessionConfig {
            timeout_secs: env_parse("INSTANTLY_MCP_SESSION_TIMEOUT_SECS", defaults.session.timeout_secs)?,
            sweep_interval_secs: env_parse(
                "INSTANTLY_MCP_SWEEP_INTERVAL_SECS",
                defaults.session.sweep_interval_secs,
            )?,
        };

        let upstream = UpstreamConfig {
            base_url: env_string("INSTANTLY_API_URL", &defaults.upstream.base_url),
            timeout_secs: env_parse("INSTANTLY_API_TIMEOUT_SECS", defaults.upstream.timeout_secs)?,
            fallback_api_key: std::env::var("INSTANTLY_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        };

        let production = std::env::var("INSTANTLY_MCP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let log_format = match std::env::var("INSTANTLY_MCP_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                cors_origins,
                keep_alive_secs: defaults.server.keep_alive_secs,
            },
            pagination,
            rate_limit,
            session,
            upstream,
            production,
            relay_key_fallback: env_bool("INSTANTLY_MCP_RELAY_KEY_FALLBACK", true),
            log_format,
        })
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes tests that mutate process environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind_address(), "0.0.0.0:3000");
        assert!(!config.pagination.enabled);
        assert_eq!(config.session.timeout_secs, 1800);
        assert!(config.session.sweep_interval_secs < config.session.timeout_secs);
        assert!(!config.production);
        assert!(config.relay_key_fallback);
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("INSTANTLY_MCP_PORT", "8080");
        std::env::set_var("INSTANTLY_MCP_PAGINATION", "true");
        std::env::set_var("INSTANTLY_MCP_PAGE_SIZE", "5");
        std::env::set_var("INSTANTLY_MCP_ENV", "production");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.pagination.enabled);
        assert_eq!(config.pagination.page_size, 5);
        assert!(config.production);

        std::env::remove_var("INSTANTLY_MCP_PORT");
        std::env::remove_var("INSTANTLY_MCP_PAGINATION");
        std::env::remove_var("INSTANTLY_MCP_PAGE_SIZE");
        std::env::remove_var("INSTANTLY_MCP_ENV");
    }

    #[test]
    fn test_config_rejects_bad_numeric() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("INSTANTLY_MCP_RATE_LIMIT_MAX", "not-a-number");
        let result = AppConfig::from_env();
        std::env::remove_var("INSTANTLY_MCP_RATE_LIMIT_MAX");
        assert!(result.is_err());
    }

    #[test]
    fn test_cors_origins_parsing() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("INSTANTLY_MCP_CORS_ORIGINS", "https://a.example, https://b.example");
        let config = AppConfig::from_env().unwrap();
        std::env::remove_var("INSTANTLY_MCP_CORS_ORIGINS");
        assert_eq!(config.server.cors_origins, vec!["https://a.example", "https://b.example"]);
    }
}
