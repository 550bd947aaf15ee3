use std::time::Duration;

/// Message carried by [`CacheError::RecordFlushed`].
pub const ERROR_CACHE_RECORD_FLUSHED: &str = "CACHE_RECORD_FLUSHED";

/// Error returned by a subscriber callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of a subscriber callback.
pub type CallbackResult = Result<(), CallbackError>;

/// Error type for cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The key was flushed while the read was waiting on a refresh.
    #[error("CACHE_RECORD_FLUSHED")]
    RecordFlushed,
    /// A bounded read gave up before the refresh resolved.
    #[error("timed out after {timeout:?} waiting for key '{key}'")]
    Timeout { key: String, timeout: Duration },
    /// The pending read was released without being notified.
    #[error("pending read for key '{key}' was abandoned")]
    Abandoned { key: String },
}

impl CacheError {
    /// Create a new timeout error.
    pub fn timeout(key: impl Into<String>, timeout: Duration) -> Self {
        CacheError::Timeout {
            key: key.into(),
            timeout,
        }
    }

    /// Create a new abandoned error.
    pub fn abandoned(key: impl Into<String>) -> Self {
        CacheError::Abandoned { key: key.into() }
    }

    /// Whether this error is the flush rejection.
    pub fn is_flushed(&self) -> bool {
        matches!(self, CacheError::RecordFlushed)
    }
}
