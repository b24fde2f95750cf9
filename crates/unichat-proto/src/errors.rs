//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not valid JSON or does not match the payload schema
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Frame object has no string `type` field
    #[error("frame has no `type` field")]
    MissingType,

    /// Frame text exceeds [`crate::MAX_FRAME_SIZE`]
    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge {
        /// Actual size in bytes
        size: usize,
        /// Maximum accepted size
        max: usize,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
