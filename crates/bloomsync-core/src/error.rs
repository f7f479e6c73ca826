//! Error types for bloomsync core.

use thiserror::Error;

/// Errors raised by filter construction, reconciliation and payload decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad filter construction arguments.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A peer filter whose byte length is inconsistent with what we expect.
    #[error("filter payload of {got} bytes does not match expected {expected} bytes")]
    DeserializationMismatch { expected: usize, got: usize },

    /// A peer filter payload that cannot describe any filter at all.
    #[error("empty filter payload")]
    EmptyFilter,

    /// Content that is not UTF-8 text.
    #[error("content is not UTF-8 text: {0}")]
    NotText(#[from] std::str::Utf8Error),

    /// Malformed missing-content payload.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Payload exceeds a configured limit.
    #[error("{what} exceeds limit: {size} > {max}")]
    LimitExceeded {
        what: &'static str,
        size: usize,
        max: usize,
    },
}

impl CoreError {
    /// Whether this error came from an untrusted peer payload.
    ///
    /// Payload errors are recovered by a full-file transfer rather than
    /// aborting the round.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            CoreError::DeserializationMismatch { .. }
                | CoreError::EmptyFilter
                | CoreError::Decoding(_)
                | CoreError::LimitExceeded { .. }
                | CoreError::NotText(_)
        )
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
