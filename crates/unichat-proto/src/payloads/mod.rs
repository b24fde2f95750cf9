//! Kind-specific frame bodies.
//!
//! [`Payload`] is internally tagged by the wire `type` field, so the variant
//! name and the kind are the same thing: `Payload::MessageDelivered` is
//! serialized as `"type": "message-delivered"`.
//!
//! # Invariants
//!
//! Each variant maps to exactly one [`EventKind`] (enforced by match
//! exhaustiveness in [`Payload::kind`]).

pub mod chat;
pub mod presence;

use serde::{Deserialize, Serialize};

pub use self::{
    chat::{ChatMessage, DeleteNotice, DeleteScope, DeliveryReceipt, MarkSeen, SeenReceipt},
    presence::{PresenceUpdate, TypingNotice},
};
use crate::EventKind;

/// All frame bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Payload {
    /// Chat message
    Message(ChatMessage),
    /// Delivery acknowledgment
    MessageDelivered(DeliveryReceipt),
    /// Seen acknowledgment
    MessageSeen(SeenReceipt),
    /// Seen receipt issued by the local user
    MarkSeen(MarkSeen),
    /// Typing start/refresh
    Typing(TypingNotice),
    /// Typing stop
    StopTyping(TypingNotice),
    /// Presence change
    UserStatus(PresenceUpdate),
    /// Message deletion
    DeleteMessage(DeleteNotice),
}

impl Payload {
    /// Event kind of this payload.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::MessageDelivered(_) => EventKind::MessageDelivered,
            Self::MessageSeen(_) => EventKind::MessageSeen,
            Self::MarkSeen(_) => EventKind::MarkSeen,
            Self::Typing(_) => EventKind::Typing,
            Self::StopTyping(_) => EventKind::StopTyping,
            Self::UserStatus(_) => EventKind::UserStatus,
            Self::DeleteMessage(_) => EventKind::DeleteMessage,
        }
    }
}
