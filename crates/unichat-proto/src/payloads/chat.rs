//! Message and receipt payloads.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, MessageId, UserId};

/// Chat message.
///
/// Outbound, `id` is the client-minted provisional id. Inbound, it is the
/// server's canonical id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id
    pub id: MessageId,
    /// Target conversation
    pub conversation_id: ConversationId,
    /// Author
    pub sender_id: UserId,
    /// Text body
    pub content: String,
}

/// Server acknowledgment that a message reached its recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    /// Canonical message id
    pub message_id: MessageId,
    /// Conversation of the message
    pub conversation_id: ConversationId,
    /// Provisional id the client used when sending, if the server re-keyed
    /// the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<MessageId>,
}

/// Recipient has seen a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    /// Message that was seen
    pub message_id: MessageId,
    /// Conversation of the message
    pub conversation_id: ConversationId,
    /// User who saw it
    pub seen_by: UserId,
}

/// Local user reports seeing a peer's message.
///
/// The server relays this to `sender_id` as a [`SeenReceipt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeen {
    /// Message that was seen
    pub message_id: MessageId,
    /// Conversation of the message
    pub conversation_id: ConversationId,
    /// Original author, who receives the receipt
    pub sender_id: UserId,
    /// Local user
    pub seen_by: UserId,
}

/// Who a deletion applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeleteScope {
    /// Hidden only for the deleting user
    #[serde(rename = "self")]
    ForMe,
    /// Retracted for every participant
    #[serde(rename = "everyone")]
    ForEveryone,
}

/// Message deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNotice {
    /// Deleted message
    pub message_id: MessageId,
    /// Conversation of the message
    pub conversation_id: ConversationId,
    /// Deletion scope
    pub scope: DeleteScope,
}
