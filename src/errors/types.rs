//! # Error Types
//!
//! Error types for process startup and the HTTP transport, using `thiserror`.

/// Custom result type for server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the server process
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors (bad environment values, invalid bind address)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport errors (bind failures, serve loop termination)
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport { message: message.into() }
    }
}
