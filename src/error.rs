//! Error types for cacheprog
//!
//! All modules use `CacheProgResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cacheprog operations
pub type CacheProgResult<T> = Result<T, CacheProgError>;

/// All errors that can occur in cacheprog
#[derive(Error, Debug)]
pub enum CacheProgError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Cannot determine cache directory: no home directory and no --cache-dir given")]
    NoCacheDir,

    #[error("Failed to create cache directory {path}: {source}")]
    CacheDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Framing errors (recoverable, reported against a request ID)
    #[error("malformed body format")]
    MalformedBody,

    #[error("failed to read body: {0}")]
    BodyRead(String),

    #[error("body size mismatch: declared {declared}, decoded {actual}")]
    BodySizeMismatch { declared: i64, actual: usize },

    #[error("failed to decode body: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Protocol errors that end the request loop
    #[error("Protocol error: {0}")]
    Protocol(String),

    // Storage errors
    #[error("Corrupt metadata file {path}: {reason}")]
    CorruptMetadata { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheProgError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fatal protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether this error must stop the request loop instead of being
    /// answered with a per-request error response
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::NoCacheDir | Self::CacheDirCreate { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoCacheDir => Some("Set GOCACHEPROG_DIR or pass --cache-dir"),
            Self::CacheDirCreate { .. } => {
                Some("Check that the cache directory is writable, or point GOCACHEPROG_DIR elsewhere")
            }
            Self::ConfigInvalid { .. } => Some("Fix or remove the config file, see --config"),
            _ => None,
        }
    }
}
