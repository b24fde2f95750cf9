//! Event kinds.

use std::fmt;

/// Recognized event kinds, keyed by their wire `type` tag.
///
/// # Invariants
///
/// - `EventKind::from_wire(kind.as_str()) == Some(kind)` for every kind.
/// - Every kind is inbound, outbound, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Chat message (both directions)
    Message,
    /// Server acknowledged delivery of a message (inbound only)
    MessageDelivered,
    /// Recipient has seen a message (inbound only)
    MessageSeen,
    /// Local user has seen a peer's message (outbound only)
    MarkSeen,
    /// Typing indicator start/refresh
    Typing,
    /// Typing indicator stop
    StopTyping,
    /// Presence broadcast
    UserStatus,
    /// Message deletion
    DeleteMessage,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Message,
        Self::MessageDelivered,
        Self::MessageSeen,
        Self::MarkSeen,
        Self::Typing,
        Self::StopTyping,
        Self::UserStatus,
        Self::DeleteMessage,
    ];

    /// Wire `type` tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::MessageDelivered => "message-delivered",
            Self::MessageSeen => "message-seen",
            Self::MarkSeen => "mark-seen",
            Self::Typing => "typing",
            Self::StopTyping => "stop-typing",
            Self::UserStatus => "user-status",
            Self::DeleteMessage => "delete-message",
        }
    }

    /// Parse a wire `type` tag. `None` for unrecognized kinds.
    #[must_use]
    pub fn from_wire(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Kind may arrive from the server.
    #[must_use]
    pub fn is_inbound(self) -> bool {
        !matches!(self, Self::MarkSeen)
    }

    /// Kind may be sent by the client.
    #[must_use]
    pub fn is_outbound(self) -> bool {
        !matches!(self, Self::MessageDelivered | Self::MessageSeen)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
