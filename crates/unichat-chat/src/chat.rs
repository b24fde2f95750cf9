//! Chat orchestrator.
//!
//! [`Chat`] validates UI commands, applies their optimistic effects to the
//! [`ConversationState`], and returns [`ChatAction`]s: payloads for the
//! transport and events for the UI. Like the connection state machine it
//! performs no I/O; time is passed in and timers are exposed through
//! [`Chat::next_deadline`].

use std::time::Duration;

use unichat_core::{ConnectionState, Environment, TransportEvent};
use unichat_proto::{
    ConversationId, MessageId, Payload, UserId,
    payloads::{ChatMessage, DeleteNotice, DeleteScope, MarkSeen, PresenceUpdate, TypingNotice},
};
use uuid::Builder;

use crate::{
    ChatError,
    conversation::{ChatEvent, ConversationState},
    message::{Message, MessageStatus},
    typing::{TypingDebouncer, TypingSignal},
};

/// Quiet period after the last keystroke before `stop-typing` is sent.
pub const DEFAULT_TYPING_WINDOW: Duration = Duration::from_millis(1000);

/// How long a peer's typing indicator lasts without a refresh.
pub const DEFAULT_PEER_TYPING_TIMEOUT: Duration = Duration::from_millis(1000);

/// Largest message content accepted, in bytes.
///
/// Leaves room for ids and field names within the 64 KiB frame limit.
pub const MAX_CONTENT_LEN: usize = 32 * 1024;

/// Chat configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    /// Debounce window for the local typing indicator
    pub typing_window: Duration,
    /// Expiry of remote typing indicators
    pub peer_typing_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_window: DEFAULT_TYPING_WINDOW,
            peer_typing_timeout: DEFAULT_PEER_TYPING_TIMEOUT,
        }
    }
}

/// Actions returned by [`Chat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    /// Hand this payload to the transport
    Send(Payload),
    /// Tell the UI
    Notify(ChatEvent),
}

/// Conversation state machine for one signed-in user.
///
/// # Invariants
///
/// - A sent message is in local state before `send_message` returns
/// - Typing commands only ever concern the open conversation
/// - Status changes come only from server events, except `SendFailed`
///   after the transport gives up and local deletions
pub struct Chat<E: Environment> {
    env: E,
    state: ConversationState<E::Instant>,
    typing: TypingDebouncer<E::Instant>,
    active: Option<ConversationId>,
    exhausted: bool,
}

impl<E: Environment> Chat<E> {
    /// Create a chat for `user`.
    pub fn new(env: E, user: UserId, config: ChatConfig) -> Self {
        Self {
            env,
            state: ConversationState::new(user, config.peer_typing_timeout),
            typing: TypingDebouncer::new(config.typing_window),
            active: None,
            exhausted: false,
        }
    }

    /// Signed-in user.
    #[must_use]
    pub fn user(&self) -> &UserId {
        self.state.user()
    }

    /// Conversation state.
    #[must_use]
    pub fn state(&self) -> &ConversationState<E::Instant> {
        &self.state
    }

    /// Messages of a conversation.
    #[must_use]
    pub fn messages(&self, conversation_id: &ConversationId) -> &[Message] {
        self.state.messages(conversation_id)
    }

    /// Open conversation.
    #[must_use]
    pub fn active(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    /// Whether the local typing indicator is on.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.typing.conversation().is_some()
    }

    /// Earliest timer: typing debounce or a peer indicator expiry.
    #[must_use]
    pub fn next_deadline(&self) -> Option<E::Instant> {
        match (self.typing.deadline(), self.state.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Send `content` to `conversation_id`.
    ///
    /// The message exists locally with `Sent` status when this returns,
    /// whatever the connection state. Sending ends the typing burst in that
    /// conversation. While reconnection has given up the message starts as
    /// `SendFailed`; it is still queued and advances if acknowledged later.
    ///
    /// # Errors
    ///
    /// - `ChatError::EmptyMessage` if `content` is blank
    /// - `ChatError::ContentTooLong` if `content` exceeds [`MAX_CONTENT_LEN`]
    pub fn send_message(
        &mut self,
        conversation_id: &ConversationId,
        content: impl Into<String>,
    ) -> Result<(MessageId, Vec<ChatAction>), ChatError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if content.len() > MAX_CONTENT_LEN {
            return Err(ChatError::ContentTooLong { len: content.len(), max: MAX_CONTENT_LEN });
        }

        let mut actions = Vec::new();
        if self.typing.conversation() == Some(conversation_id) {
            actions.extend(self.typing.stop().map(|signal| self.typing_action(signal)));
        }

        let id = self.new_message_id();
        let mut message = Message::local(
            id.clone(),
            conversation_id.clone(),
            self.user().clone(),
            content.clone(),
            self.env.wall_clock_millis(),
        );
        if self.exhausted {
            message.set_status(MessageStatus::SendFailed);
        }
        tracing::debug!(message = %id, conversation = %conversation_id, "sending message");

        actions.extend(self.state.insert_local(message).into_iter().map(ChatAction::Notify));
        actions.push(ChatAction::Send(Payload::Message(ChatMessage {
            id: id.clone(),
            conversation_id: conversation_id.clone(),
            sender_id: self.user().clone(),
            content,
        })));

        Ok((id, actions))
    }

    /// Tell `peer` that their message was seen.
    ///
    /// Only the peer's copy changes, once the server relays the receipt; the
    /// local message is left alone.
    ///
    /// # Errors
    ///
    /// - `ChatError::UnknownMessage` if no conversation has the message
    /// - `ChatError::NotActive` if the message is not in the open
    ///   conversation
    pub fn mark_seen(
        &self,
        message_id: &MessageId,
        peer: &UserId,
    ) -> Result<Vec<ChatAction>, ChatError> {
        let Some(message) = self.state.find(message_id) else {
            return Err(ChatError::UnknownMessage(message_id.clone()));
        };
        if self.active.as_ref() != Some(&message.conversation_id) {
            return Err(ChatError::NotActive(message_id.clone()));
        }

        Ok(vec![ChatAction::Send(Payload::MarkSeen(MarkSeen {
            message_id: message_id.clone(),
            conversation_id: message.conversation_id.clone(),
            sender_id: peer.clone(),
            seen_by: self.user().clone(),
        }))])
    }

    /// Local typing activity in the open conversation.
    ///
    /// `true` starts or extends the burst; at most one `typing` command is
    /// sent per burst. `false` ends it immediately.
    ///
    /// # Errors
    ///
    /// - `ChatError::NoActiveConversation` for `true` with no open
    ///   conversation
    pub fn set_typing(
        &mut self,
        is_typing: bool,
        now: E::Instant,
    ) -> Result<Vec<ChatAction>, ChatError> {
        if !is_typing {
            let stop = self.typing.stop().map(|signal| self.typing_action(signal));
            return Ok(stop.into_iter().collect());
        }

        let Some(conversation) = self.active.clone() else {
            return Err(ChatError::NoActiveConversation);
        };
        let signals = self.typing.keystroke(&conversation, now);
        Ok(signals.into_iter().map(|signal| self.typing_action(signal)).collect())
    }

    /// Make `conversation_id` the open conversation.
    ///
    /// Typing in the previously open conversation stops.
    pub fn open_conversation(&mut self, conversation_id: &ConversationId) -> Vec<ChatAction> {
        if self.active.as_ref() == Some(conversation_id) {
            return Vec::new();
        }

        let mut actions: Vec<_> =
            self.typing.stop().map(|signal| self.typing_action(signal)).into_iter().collect();
        self.state.ensure(conversation_id);
        self.active = Some(conversation_id.clone());
        actions.push(ChatAction::Notify(ChatEvent::ActiveConversation(self.active.clone())));
        actions
    }

    /// Close the open conversation, stopping any typing in it.
    pub fn close_conversation(&mut self) -> Vec<ChatAction> {
        if self.active.is_none() {
            return Vec::new();
        }

        let mut actions: Vec<_> =
            self.typing.stop().map(|signal| self.typing_action(signal)).into_iter().collect();
        self.active = None;
        actions.push(ChatAction::Notify(ChatEvent::ActiveConversation(None)));
        actions
    }

    /// Delete a message locally and tell the server.
    ///
    /// Deleting an already deleted message does nothing.
    ///
    /// # Errors
    ///
    /// - `ChatError::UnknownMessage` if no conversation has the message
    /// - `ChatError::NotOwner` for `ForEveryone` on someone else's message
    pub fn delete_message(
        &mut self,
        message_id: &MessageId,
        scope: DeleteScope,
    ) -> Result<Vec<ChatAction>, ChatError> {
        let Some(message) = self.state.find(message_id) else {
            return Err(ChatError::UnknownMessage(message_id.clone()));
        };
        if scope == DeleteScope::ForEveryone && message.sender_id != *self.user() {
            return Err(ChatError::NotOwner(message_id.clone()));
        }
        if message.status.is_deleted() {
            return Ok(Vec::new());
        }

        let conversation_id = message.conversation_id.clone();
        let mut actions: Vec<_> = self
            .state
            .delete(&conversation_id, message_id, scope)
            .into_iter()
            .map(ChatAction::Notify)
            .collect();
        actions.push(ChatAction::Send(Payload::DeleteMessage(DeleteNotice {
            message_id: message_id.clone(),
            conversation_id,
            scope,
        })));
        Ok(actions)
    }

    /// Announce our own presence, applying it locally first.
    pub fn set_presence(&mut self, online: bool) -> Vec<ChatAction> {
        let mut actions: Vec<_> = self
            .state
            .set_own_presence(online, self.env.wall_clock_millis())
            .into_iter()
            .map(ChatAction::Notify)
            .collect();
        actions.push(ChatAction::Send(Payload::UserStatus(PresenceUpdate {
            user_id: self.user().clone(),
            online,
        })));
        actions
    }

    /// Add externally fetched history to a conversation.
    pub fn seed(
        &mut self,
        conversation_id: &ConversationId,
        history: Vec<Message>,
    ) -> Vec<ChatAction> {
        self.state.seed(conversation_id, history).into_iter().map(ChatAction::Notify).collect()
    }

    /// Fold in a transport event.
    pub fn handle_transport_event(
        &mut self,
        event: &TransportEvent,
        now: E::Instant,
    ) -> Vec<ChatAction> {
        let events = match event {
            TransportEvent::Frame(frame) => self.state.apply_inbound(frame, now),
            TransportEvent::StateChanged(state) => {
                if *state == ConnectionState::Open {
                    self.exhausted = false;
                }
                vec![ChatEvent::Connection(*state)]
            },
            TransportEvent::ReconnectScheduled { attempt, delay } => {
                vec![ChatEvent::Reconnecting { attempt: *attempt, delay: *delay }]
            },
            TransportEvent::ConnectionFailed { attempts } => {
                self.exhausted = true;
                let mut events = self.state.fail_pending();
                tracing::warn!(failed = events.len(), "marking unacknowledged messages failed");
                events.push(ChatEvent::ConnectionFailed { attempts: *attempts });
                events
            },
        };
        events.into_iter().map(ChatAction::Notify).collect()
    }

    /// Fire due timers.
    pub fn tick(&mut self, now: E::Instant) -> Vec<ChatAction> {
        let mut actions: Vec<_> =
            self.typing.tick(now).map(|signal| self.typing_action(signal)).into_iter().collect();
        actions.extend(self.state.expire_typing(now).into_iter().map(ChatAction::Notify));
        actions
    }

    /// Drop every timer without sending anything.
    ///
    /// Used when the transport is torn down; peer indicators are cleared
    /// and reported as stopped.
    pub fn cancel_timers(&mut self) -> Vec<ChatAction> {
        self.typing.cancel();
        self.state.clear_all_typing().into_iter().map(ChatAction::Notify).collect()
    }

    fn typing_action(&self, signal: TypingSignal) -> ChatAction {
        let notice =
            |conversation_id| TypingNotice { conversation_id, user_id: self.user().clone() };
        match signal {
            TypingSignal::Start(conversation_id) => {
                ChatAction::Send(Payload::Typing(notice(conversation_id)))
            },
            TypingSignal::Stop(conversation_id) => {
                ChatAction::Send(Payload::StopTyping(notice(conversation_id)))
            },
        }
    }

    fn new_message_id(&self) -> MessageId {
        let bytes = self.env.random_u128().to_be_bytes();
        MessageId::new(Builder::from_random_bytes(bytes).into_uuid().to_string())
    }
}
