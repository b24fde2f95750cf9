//! Ephemeral activity payloads: typing indicators and presence.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, UserId};

/// Typing indicator, used by both `typing` and `stop-typing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    /// Conversation being typed in
    pub conversation_id: ConversationId,
    /// User who is typing
    pub user_id: UserId,
}

/// Online/offline broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    /// User whose presence changed
    pub user_id: UserId,
    /// Whether the user is online
    pub online: bool,
}
