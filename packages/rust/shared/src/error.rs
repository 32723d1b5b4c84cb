//! Error types for Pressmark.
//!
//! Library crates use [`PressError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Pressmark operations.
#[derive(Debug, thiserror::Error)]
pub enum PressError {
    /// Missing or invalid configuration (e.g. an empty API key).
    #[error("config error: {message}")]
    Config { message: String },

    /// The chat-completion backend answered with a non-success status or a
    /// body that could not be parsed.
    #[error("upstream error{}: {message}", status_suffix(.status))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Transport-level failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The image resolver could not host a referenced image.
    #[error("image resolution failed for {url}: {message}")]
    Resolution { url: String, message: String },

    /// A value could not be parsed (dates, JSON documents).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Enrichment step failed as a whole.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// The serializer rejected the normalized document.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PressError>;

impl PressError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an upstream error with an optional HTTP status.
    pub fn upstream(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }

    /// Create a resolution error for the given image URL.
    pub fn resolution(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Resolution {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status carried by an upstream error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}
