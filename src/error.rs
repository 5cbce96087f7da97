//! Millcache error types

/// Errors raised by the cache itself.
///
/// Failures of a wrapped read operation are deliberately absent: they are
/// returned to the caller unchanged in the operation's own error type.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    // Startup errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Administrative errors
    /// `invalidate` was called with neither a tier nor a key pattern.
    #[error("invalid invalidation request: a tier or a key pattern is required")]
    InvalidInvalidationRequest,

    #[error("unknown cache tier: {0}")]
    UnknownTier(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    /// Whether this error must stop the cache from being constructed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CacheError::Configuration(_))
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
