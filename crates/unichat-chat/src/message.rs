//! Messages and their delivery status.

use std::fmt;

use unichat_proto::{
    ConversationId, MessageId, UserId,
    payloads::{ChatMessage, DeleteScope},
};

/// Delivery status of a message as seen by this client.
///
/// Ordered `Sent = SendFailed < Delivered < Seen`. The deleted statuses are
/// terminal: once reached, nothing changes the status again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    /// Created locally and handed to the transport
    Sent,
    /// Reconnection gave up before the server acknowledged it
    SendFailed,
    /// Server acknowledged delivery
    Delivered,
    /// Recipient has seen it
    Seen,
    /// Deleted for this user only
    DeletedSelf,
    /// Deleted for every participant
    DeletedEveryone,
}

impl MessageStatus {
    /// Position in the delivery order; `None` for deleted statuses.
    #[must_use]
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::Sent | Self::SendFailed => Some(0),
            Self::Delivered => Some(1),
            Self::Seen => Some(2),
            Self::DeletedSelf | Self::DeletedEveryone => None,
        }
    }

    /// Whether this is a deleted status.
    #[must_use]
    pub fn is_deleted(self) -> bool {
        self.rank().is_none()
    }

    /// Status after observing `next`, or `None` if nothing changes.
    ///
    /// Never regresses. A deletion wins over any live status; a deleted
    /// status accepts nothing. `SendFailed` replaces `Sent` at equal rank.
    #[must_use]
    pub fn advance(self, next: Self) -> Option<Self> {
        let current = self.rank()?;
        let Some(incoming) = next.rank() else {
            return Some(next);
        };

        if incoming > current || (self == Self::Sent && next == Self::SendFailed) {
            Some(next)
        } else {
            None
        }
    }

    /// Deleted status for a delete scope.
    #[must_use]
    pub fn deleted(scope: DeleteScope) -> Self {
        match scope {
            DeleteScope::ForMe => Self::DeletedSelf,
            DeleteScope::ForEveryone => Self::DeletedEveryone,
        }
    }

    /// Kebab-case status name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::SendFailed => "send-failed",
            Self::Delivered => "delivered",
            Self::Seen => "seen",
            Self::DeletedSelf => "deleted-self",
            Self::DeletedEveryone => "deleted-everyone",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content type of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Plain text
    Text,
    /// Deleted; content has been redacted
    Deleted,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Canonical id once the server assigned one, the client id before
    pub id: MessageId,
    /// Id generated locally at send time, kept after re-keying
    pub client_id: Option<MessageId>,
    /// Conversation the message belongs to
    pub conversation_id: ConversationId,
    /// Author
    pub sender_id: UserId,
    /// Text, empty once deleted
    pub content: String,
    /// Content type
    pub kind: MessageType,
    /// Delivery status
    pub status: MessageStatus,
    /// Unix milliseconds
    pub timestamp: u64,
}

impl Message {
    /// Optimistic local message in `Sent` status.
    #[must_use]
    pub fn local(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        timestamp: u64,
    ) -> Self {
        Self {
            client_id: Some(id.clone()),
            id,
            conversation_id,
            sender_id,
            content,
            kind: MessageType::Text,
            status: MessageStatus::Sent,
            timestamp,
        }
    }

    /// Message received from the server. Arrival means it was delivered.
    #[must_use]
    pub fn received(message: ChatMessage, timestamp: u64) -> Self {
        Self {
            id: message.id,
            client_id: None,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            kind: MessageType::Text,
            status: MessageStatus::Delivered,
            timestamp,
        }
    }

    /// Apply a status, returning whether it changed.
    ///
    /// Moving to a deleted status also redacts the content.
    pub fn set_status(&mut self, next: MessageStatus) -> bool {
        let Some(status) = self.status.advance(next) else {
            return false;
        };

        self.status = status;
        if status.is_deleted() {
            self.content.clear();
            self.kind = MessageType::Deleted;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{
        MessageStatus::{Delivered, DeletedEveryone, DeletedSelf, Seen, SendFailed, Sent},
        *,
    };

    #[test]
    fn statuses_only_move_forward() {
        assert_eq!(Sent.advance(Delivered), Some(Delivered));
        assert_eq!(Sent.advance(Seen), Some(Seen));
        assert_eq!(Seen.advance(Delivered), None);
        assert_eq!(Delivered.advance(Delivered), None);
        assert_eq!(Delivered.advance(Sent), None);
    }

    #[test]
    fn send_failed_replaces_sent_only() {
        assert_eq!(Sent.advance(SendFailed), Some(SendFailed));
        assert_eq!(Delivered.advance(SendFailed), None);
        assert_eq!(SendFailed.advance(Sent), None);
        assert_eq!(SendFailed.advance(Delivered), Some(Delivered));
    }

    #[test]
    fn deletion_is_terminal() {
        assert_eq!(Seen.advance(DeletedSelf), Some(DeletedSelf));
        assert_eq!(SendFailed.advance(DeletedEveryone), Some(DeletedEveryone));
        assert_eq!(DeletedSelf.advance(Seen), None);
        assert_eq!(DeletedSelf.advance(DeletedEveryone), None);
        assert_eq!(DeletedEveryone.advance(DeletedEveryone), None);
    }

    #[test]
    fn deleting_redacts_content() {
        let mut message =
            Message::local("m1".into(), "c1".into(), "alice".into(), "secret".into(), 1);

        assert!(message.set_status(DeletedEveryone));
        assert_eq!(message.content, "");
        assert_eq!(message.kind, MessageType::Deleted);
        assert!(!message.set_status(Seen));
    }

    #[test]
    fn received_messages_are_delivered() {
        let message = Message::received(
            ChatMessage {
                id: "m9".into(),
                conversation_id: "c1".into(),
                sender_id: "bob".into(),
                content: "hi".into(),
            },
            42,
        );
        assert_eq!(message.status, Delivered);
        assert_eq!(message.client_id, None);
    }
}
