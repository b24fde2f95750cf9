//! Conversation state reducer.
//!
//! [`ConversationState`] holds every conversation's messages, remote typing
//! indicators, and presence. Inbound frames are folded in by
//! [`ConversationState::apply_inbound`], which reports each change as a
//! [`ChatEvent`].
//!
//! # Invariants
//!
//! - Applying the same frame twice changes nothing the second time and
//!   reports no events
//! - A message's status never regresses (see [`MessageStatus::advance`])
//! - Deletion redacts messages in place; the only removal is a server echo
//!   of a local message, which is merged into the local copy
//! - A receipt for an id not known yet is held and applied once a message
//!   takes that id, so receipt order does not matter

use std::{collections::HashMap, time::Duration};

use unichat_core::{ConnectionState, MonotonicInstant};
use unichat_proto::{
    ConversationId, Frame, MessageId, Payload, UserId,
    payloads::{DeleteScope, DeliveryReceipt},
};

use crate::{
    message::{Message, MessageStatus},
    presence::{Presence, PresenceBook},
    typing::PeerTyping,
};

/// Change notification for UI consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message was added to a conversation
    MessageAdded {
        /// Conversation
        conversation_id: ConversationId,
        /// New message
        message_id: MessageId,
    },

    /// A local message received its canonical id
    MessageRekeyed {
        /// Conversation
        conversation_id: ConversationId,
        /// Client id the message had
        from: MessageId,
        /// Canonical id it has now
        to: MessageId,
    },

    /// A message's status changed
    StatusChanged {
        /// Conversation
        conversation_id: ConversationId,
        /// Message
        message_id: MessageId,
        /// New status
        status: MessageStatus,
    },

    /// A peer started or stopped typing
    PeerTyping {
        /// Conversation
        conversation_id: ConversationId,
        /// Peer
        user_id: UserId,
        /// Whether the peer is typing now
        typing: bool,
    },

    /// A user's online flag changed
    PresenceChanged {
        /// User
        user_id: UserId,
        /// Whether the user is online now
        online: bool,
    },

    /// History was seeded into a conversation
    Seeded {
        /// Conversation
        conversation_id: ConversationId,
        /// Messages added
        added: usize,
    },

    /// The open conversation changed
    ActiveConversation(Option<ConversationId>),

    /// Transport connection state changed
    Connection(ConnectionState),

    /// Transport scheduled a reconnect attempt
    Reconnecting {
        /// 1-based attempt number
        attempt: u32,
        /// Delay before the attempt
        delay: Duration,
    },

    /// Transport gave up reconnecting
    ConnectionFailed {
        /// Reconnect attempts made
        attempts: u32,
    },
}

/// Receipts held per conversation for ids no message has yet.
const MAX_PENDING_RECEIPTS: usize = 256;

/// Messages of one conversation, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    index: HashMap<MessageId, usize>,
    pending: HashMap<MessageId, MessageStatus>,
}

impl Conversation {
    /// Messages in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Message by id.
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.index.get(id).map(|&i| &self.messages[i])
    }

    fn get_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.index.get(id).map(|&i| &mut self.messages[i])
    }

    /// Insert unless a message with the same id exists. A receipt held for
    /// the id is applied first.
    fn insert(&mut self, mut message: Message) -> bool {
        if self.index.contains_key(&message.id) {
            return false;
        }
        if let Some(status) = self.pending.remove(&message.id) {
            message.set_status(status);
        }
        self.index.insert(message.id.clone(), self.messages.len());
        self.messages.push(message);
        true
    }

    /// Advance message `id` to `status`, returning the new status if it
    /// changed. For an unknown id the status is held until a message takes
    /// that id.
    fn apply(&mut self, id: &MessageId, status: MessageStatus) -> Option<MessageStatus> {
        if let Some(message) = self.get_mut(id) {
            return message.set_status(status).then_some(message.status);
        }

        if let Some(held) = self.pending.get_mut(id) {
            if let Some(next) = held.advance(status) {
                *held = next;
            }
        } else if self.pending.len() < MAX_PENDING_RECEIPTS {
            tracing::debug!(message = %id, %status, "holding status for unknown message");
            self.pending.insert(id.clone(), status);
        } else {
            tracing::debug!(message = %id, %status, "dropping status for unknown message");
        }
        None
    }

    /// Give message `from` the id `to`, returning its status before the
    /// move.
    ///
    /// If a received message already has `to` (the server echoed our message
    /// before acknowledging it), the two are merged: the local copy keeps its
    /// place and takes the higher status, and the echo is removed. Refused
    /// when `to` belongs to another sender or to another local message.
    fn rekey(&mut self, from: &MessageId, to: &MessageId) -> Option<MessageStatus> {
        if from == to {
            return None;
        }
        let mut position = *self.index.get(from)?;
        let prior = self.messages[position].status;

        if let Some(&echo) = self.index.get(to) {
            let existing = &self.messages[echo];
            if existing.client_id.is_some()
                || existing.sender_id != self.messages[position].sender_id
            {
                tracing::debug!(from = %from, to = %to, "refusing rekey onto another message");
                return None;
            }

            let echoed = self.messages.remove(echo);
            if echo < position {
                position -= 1;
            }
            let message = &mut self.messages[position];
            message.id = to.clone();
            message.set_status(echoed.status);
            self.reindex();
        } else {
            self.index.remove(from);
            self.index.insert(to.clone(), position);
            self.messages[position].id = to.clone();
        }

        if let Some(status) = self.pending.remove(to) {
            self.messages[position].set_status(status);
        }
        Some(prior)
    }

    fn reindex(&mut self) {
        self.index = self.messages.iter().enumerate().map(|(i, m)| (m.id.clone(), i)).collect();
    }
}

/// Conversation state for one signed-in user.
#[derive(Debug, Clone)]
pub struct ConversationState<I> {
    user: UserId,
    conversations: HashMap<ConversationId, Conversation>,
    typing: PeerTyping<I>,
    presence: PresenceBook,
}

impl<I: MonotonicInstant> ConversationState<I> {
    /// Empty state for `user`; peer typing expires after
    /// `peer_typing_timeout`.
    #[must_use]
    pub fn new(user: UserId, peer_typing_timeout: Duration) -> Self {
        Self {
            user,
            conversations: HashMap::new(),
            typing: PeerTyping::new(peer_typing_timeout),
            presence: PresenceBook::new(),
        }
    }

    /// Signed-in user.
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Conversation by id.
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    /// Every conversation.
    pub fn conversations(&self) -> impl Iterator<Item = (&ConversationId, &Conversation)> {
        self.conversations.iter()
    }

    /// Messages of a conversation, empty if unknown.
    #[must_use]
    pub fn messages(&self, id: &ConversationId) -> &[Message] {
        self.conversations.get(id).map(Conversation::messages).unwrap_or_default()
    }

    /// Find a message in any conversation.
    #[must_use]
    pub fn find(&self, id: &MessageId) -> Option<&Message> {
        self.conversations.values().find_map(|conversation| conversation.get(id))
    }

    /// Whether `peer` is typing in `conversation`.
    #[must_use]
    pub fn is_typing(&self, conversation: &ConversationId, peer: &UserId) -> bool {
        self.typing.is_typing(conversation, peer)
    }

    /// Presence of `user`.
    #[must_use]
    pub fn presence(&self, user: &UserId) -> Option<Presence> {
        self.presence.get(user)
    }

    /// Earliest peer-typing expiry.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.typing.next_deadline()
    }

    /// Make sure `id` exists, so it can be opened before any message.
    pub fn ensure(&mut self, id: &ConversationId) {
        self.conversations.entry(id.clone()).or_default();
    }

    /// Add an optimistic local message.
    pub fn insert_local(&mut self, message: Message) -> Vec<ChatEvent> {
        let conversation_id = message.conversation_id.clone();
        let message_id = message.id.clone();

        if self.conversations.entry(conversation_id.clone()).or_default().insert(message) {
            vec![ChatEvent::MessageAdded { conversation_id, message_id }]
        } else {
            Vec::new()
        }
    }

    /// Add externally fetched history. Already known ids are skipped.
    pub fn seed(
        &mut self,
        conversation_id: &ConversationId,
        history: Vec<Message>,
    ) -> Vec<ChatEvent> {
        let conversation = self.conversations.entry(conversation_id.clone()).or_default();

        let mut added = 0;
        for mut message in history {
            message.conversation_id = conversation_id.clone();
            if conversation.insert(message) {
                added += 1;
            }
        }

        if added == 0 {
            return Vec::new();
        }
        tracing::debug!(conversation = %conversation_id, added, "seeded history");
        vec![ChatEvent::Seeded { conversation_id: conversation_id.clone(), added }]
    }

    /// Fold in an inbound frame.
    pub fn apply_inbound(&mut self, frame: &Frame, now: I) -> Vec<ChatEvent> {
        match &frame.payload {
            Payload::Message(message) => {
                let mut events = self.clear_typing(&message.conversation_id, &message.sender_id);
                let received = Message::received(message.clone(), frame.timestamp);
                events.extend(self.insert_local(received));
                events
            },
            Payload::MessageDelivered(receipt) => self.apply_delivery(receipt),
            Payload::MessageSeen(receipt) => self.set_status(
                &receipt.conversation_id,
                &receipt.message_id,
                MessageStatus::Seen,
            ),
            Payload::Typing(notice) => {
                if notice.user_id == self.user {
                    return Vec::new();
                }
                if self.typing.refresh(notice.conversation_id.clone(), notice.user_id.clone(), now)
                {
                    vec![ChatEvent::PeerTyping {
                        conversation_id: notice.conversation_id.clone(),
                        user_id: notice.user_id.clone(),
                        typing: true,
                    }]
                } else {
                    Vec::new()
                }
            },
            Payload::StopTyping(notice) => {
                self.clear_typing(&notice.conversation_id, &notice.user_id)
            },
            Payload::UserStatus(update) => {
                if self.presence.apply(&update.user_id, update.online, frame.timestamp) {
                    vec![ChatEvent::PresenceChanged {
                        user_id: update.user_id.clone(),
                        online: update.online,
                    }]
                } else {
                    Vec::new()
                }
            },
            Payload::DeleteMessage(notice) => self.delete(
                &notice.conversation_id,
                &notice.message_id,
                notice.scope,
            ),
            Payload::MarkSeen(_) => Vec::new(),
        }
    }

    /// Apply a deletion.
    pub fn delete(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        scope: DeleteScope,
    ) -> Vec<ChatEvent> {
        self.set_status(conversation_id, message_id, MessageStatus::deleted(scope))
    }

    /// Apply our own presence optimistically.
    pub fn set_own_presence(&mut self, online: bool, updated_at: u64) -> Vec<ChatEvent> {
        let user = self.user.clone();
        if self.presence.apply(&user, online, updated_at) {
            vec![ChatEvent::PresenceChanged { user_id: user, online }]
        } else {
            Vec::new()
        }
    }

    /// Mark every own message still at `Sent` as `SendFailed`.
    pub fn fail_pending(&mut self) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        for (conversation_id, conversation) in &mut self.conversations {
            for message in &mut conversation.messages {
                if message.sender_id == self.user && message.set_status(MessageStatus::SendFailed) {
                    events.push(ChatEvent::StatusChanged {
                        conversation_id: conversation_id.clone(),
                        message_id: message.id.clone(),
                        status: message.status,
                    });
                }
            }
        }
        events
    }

    /// Expire peer typing indicators due by `now`.
    pub fn expire_typing(&mut self, now: I) -> Vec<ChatEvent> {
        self.typing
            .expire(now)
            .into_iter()
            .map(|(conversation_id, user_id)| ChatEvent::PeerTyping {
                conversation_id,
                user_id,
                typing: false,
            })
            .collect()
    }

    /// Drop every peer typing indicator.
    pub fn clear_all_typing(&mut self) -> Vec<ChatEvent> {
        self.typing
            .clear_all()
            .into_iter()
            .map(|(conversation_id, user_id)| ChatEvent::PeerTyping {
                conversation_id,
                user_id,
                typing: false,
            })
            .collect()
    }

    fn apply_delivery(&mut self, receipt: &DeliveryReceipt) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        let Some(conversation) = self.conversations.get_mut(&receipt.conversation_id) else {
            tracing::debug!(message = %receipt.message_id, "delivery for unknown conversation");
            return events;
        };
        let id = &receipt.message_id;

        let mut before = None;
        if let Some(client_id) = &receipt.client_message_id {
            if let Some(prior) = conversation.rekey(client_id, id) {
                events.push(ChatEvent::MessageRekeyed {
                    conversation_id: receipt.conversation_id.clone(),
                    from: client_id.clone(),
                    to: id.clone(),
                });
                before = Some(prior);
            }
        }
        let before = before.or_else(|| conversation.get(id).map(|m| m.status));

        conversation.apply(id, MessageStatus::Delivered);
        // One report covering the rekey, any held receipt and this one
        let after = conversation.get(id).map(|m| m.status);
        if let Some(status) = after.filter(|s| Some(*s) != before) {
            events.push(ChatEvent::StatusChanged {
                conversation_id: receipt.conversation_id.clone(),
                message_id: id.clone(),
                status,
            });
        }
        events
    }

    fn set_status(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        status: MessageStatus,
    ) -> Vec<ChatEvent> {
        let Some(conversation) = self.conversations.get_mut(conversation_id) else {
            tracing::debug!(message = %message_id, %status, "status for unknown conversation");
            return Vec::new();
        };

        match conversation.apply(message_id, status) {
            Some(status) => vec![ChatEvent::StatusChanged {
                conversation_id: conversation_id.clone(),
                message_id: message_id.clone(),
                status,
            }],
            None => Vec::new(),
        }
    }

    fn clear_typing(
        &mut self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Vec<ChatEvent> {
        if self.typing.clear(conversation_id, user_id) {
            vec![ChatEvent::PeerTyping {
                conversation_id: conversation_id.clone(),
                user_id: user_id.clone(),
                typing: false,
            }]
        } else {
            Vec::new()
        }
    }
}
