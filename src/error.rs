// file: src/error.rs
// version: 1.0.0
// guid: 3c1f6a52-9e0d-4b7a-a2f4-7d18e5c40b91

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, MultirouterError>;

/// Error types for multirouter
#[derive(Error, Debug)]
pub enum MultirouterError {
    #[error("Unknown host: {0}")]
    UnknownHost(String),

    #[error("Context error: {0}")]
    Context(String),

    #[error("Selection error: {0}")]
    Selection(String),

    #[error("Host {host} unreachable: {reason}")]
    UnreachableHost { host: String, reason: String },

    #[error("Destructive action aborted: confirmation not given")]
    DestructiveActionAborted,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MultirouterError {
    /// Create a new unknown host error
    pub fn unknown_host(host: impl Into<String>) -> Self {
        Self::UnknownHost(host.into())
    }

    /// Create a new context error
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Create a new selection error
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }

    /// Create a new unreachable host error
    pub fn unreachable(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnreachableHost {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error is a rejected user selection that leaves state unchanged
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownHost(_) | Self::Context(_) | Self::Selection(_) | Self::Validation(_)
        )
    }
}
