//! Chat command errors.

use thiserror::Error;
use unichat_proto::MessageId;

/// Invalid chat commands.
///
/// These reject a UI command before any state changes. They never arise
/// from connection trouble: sends while offline are queued, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Message content was empty or only whitespace
    #[error("message is empty")]
    EmptyMessage,

    /// Message content does not fit in a frame
    #[error("message is {len} bytes, limit is {max}")]
    ContentTooLong {
        /// Content length in bytes
        len: usize,
        /// Largest accepted length
        max: usize,
    },

    /// Command needs an open conversation and none is open
    #[error("no conversation is open")]
    NoActiveConversation,

    /// Message is not in the open conversation
    #[error("message {0} is not in the open conversation")]
    NotActive(MessageId),

    /// No such message
    #[error("unknown message {0}")]
    UnknownMessage(MessageId),

    /// Only the author may delete a message for everyone
    #[error("message {0} belongs to another user")]
    NotOwner(MessageId),
}
