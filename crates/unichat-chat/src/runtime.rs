//! Chat runtime.
//!
//! [`Runtime`] wires a [`Chat`] to a [`Transport`]: chat commands become
//! transport sends, transport events are folded into conversation state, and
//! chat timers share the transport's event loop through its deadline.

use std::{collections::VecDeque, future::Future, pin::pin};

use unichat_client::{Connected, Link, Polled, Transport};
use unichat_core::{ConnectionError, Environment, TransportConfig, TransportEvent};
use unichat_proto::{ConversationId, MessageId, UserId, payloads::DeleteScope};

use crate::{
    Chat, ChatError,
    chat::{ChatAction, ChatConfig},
    conversation::ChatEvent,
    message::Message,
};

/// Outcome of [`Runtime::poll_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// A conversation change
    Chat(ChatEvent),
    /// The caller's future completed
    External(T),
}

/// Chat session over a live transport.
pub struct Runtime<L, E>
where
    L: Link,
    E: Environment,
{
    transport: Transport<L, E>,
    chat: Chat<E>,
    events: VecDeque<ChatEvent>,
}

impl<L, E> Runtime<L, E>
where
    L: Link,
    E: Environment,
{
    /// Create a disconnected session for `user`.
    pub fn new(
        link: L,
        env: E,
        user: impl Into<UserId>,
        transport: TransportConfig,
        chat: ChatConfig,
    ) -> Self {
        Self {
            chat: Chat::new(env.clone(), user.into(), chat),
            transport: Transport::new(link, env, transport),
            events: VecDeque::new(),
        }
    }

    /// Chat state.
    #[must_use]
    pub fn chat(&self) -> &Chat<E> {
        &self.chat
    }

    /// Transport.
    #[must_use]
    pub fn transport(&self) -> &Transport<L, E> {
        &self.transport
    }

    /// Transport, for registering listeners.
    pub fn transport_mut(&mut self) -> &mut Transport<L, E> {
        &mut self.transport
    }

    /// Connect as the chat user.
    ///
    /// # Errors
    ///
    /// See [`Transport::connect`].
    pub async fn connect(&mut self) -> Result<Connected, ConnectionError> {
        let user = self.chat.user().clone();
        self.transport.connect(user).await
    }

    /// Reconnect with the same identity.
    ///
    /// # Errors
    ///
    /// See [`Transport::reconnect`].
    pub async fn reconnect(&mut self) -> Result<Connected, ConnectionError> {
        self.transport.reconnect().await
    }

    /// Disconnect and drop chat timers.
    pub async fn disconnect(&mut self) {
        self.transport.disconnect().await;
        let actions = self.chat.cancel_timers();
        self.run(actions).await;
    }

    /// See [`Chat::send_message`].
    ///
    /// # Errors
    ///
    /// See [`Chat::send_message`].
    pub async fn send_message(
        &mut self,
        conversation_id: &ConversationId,
        content: impl Into<String>,
    ) -> Result<MessageId, ChatError> {
        let (id, actions) = self.chat.send_message(conversation_id, content)?;
        self.run(actions).await;
        Ok(id)
    }

    /// See [`Chat::mark_seen`].
    ///
    /// # Errors
    ///
    /// See [`Chat::mark_seen`].
    pub async fn mark_seen(
        &mut self,
        message_id: &MessageId,
        peer: &UserId,
    ) -> Result<(), ChatError> {
        let actions = self.chat.mark_seen(message_id, peer)?;
        self.run(actions).await;
        Ok(())
    }

    /// See [`Chat::set_typing`].
    ///
    /// # Errors
    ///
    /// See [`Chat::set_typing`].
    pub async fn set_typing(&mut self, is_typing: bool) -> Result<(), ChatError> {
        let now = self.transport.env().now();
        let actions = self.chat.set_typing(is_typing, now)?;
        self.run(actions).await;
        Ok(())
    }

    /// See [`Chat::open_conversation`].
    pub async fn open_conversation(&mut self, conversation_id: &ConversationId) {
        let actions = self.chat.open_conversation(conversation_id);
        self.run(actions).await;
    }

    /// See [`Chat::close_conversation`].
    pub async fn close_conversation(&mut self) {
        let actions = self.chat.close_conversation();
        self.run(actions).await;
    }

    /// See [`Chat::delete_message`].
    ///
    /// # Errors
    ///
    /// See [`Chat::delete_message`].
    pub async fn delete_message(
        &mut self,
        message_id: &MessageId,
        scope: DeleteScope,
    ) -> Result<(), ChatError> {
        let actions = self.chat.delete_message(message_id, scope)?;
        self.run(actions).await;
        Ok(())
    }

    /// See [`Chat::set_presence`].
    pub async fn set_presence(&mut self, online: bool) {
        let actions = self.chat.set_presence(online);
        self.run(actions).await;
    }

    /// See [`Chat::seed`].
    pub async fn seed(&mut self, conversation_id: &ConversationId, history: Vec<Message>) {
        let actions = self.chat.seed(conversation_id, history);
        self.run(actions).await;
    }

    /// Drive the session until a chat event is ready or `external`
    /// completes.
    ///
    /// `external` must be cancel-safe; it is polled alongside the link and
    /// timers and dropped if a chat event wins.
    pub async fn poll_with<F: Future>(&mut self, external: F) -> Step<F::Output> {
        let mut external = pin!(external);
        loop {
            if let Some(event) = self.events.pop_front() {
                return Step::Chat(event);
            }

            let wake_at = self.chat.next_deadline();
            match self.transport.poll_with(wake_at, external.as_mut()).await {
                Polled::Event(event) => self.absorb(&event).await,
                Polled::WakeUp => self.wake().await,
                Polled::External(output) => return Step::External(output),
                Polled::Idle => {},
            }
        }
    }

    /// Next chat event, or `None` once the session can produce no more.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }

            let wake_at = self.chat.next_deadline();
            match self.transport.poll_until(wake_at).await {
                Polled::Event(event) => self.absorb(&event).await,
                Polled::WakeUp => self.wake().await,
                Polled::Idle => return None,
                Polled::External(never) => match never {},
            }
        }
    }

    async fn absorb(&mut self, event: &TransportEvent) {
        let now = self.transport.env().now();
        let actions = self.chat.handle_transport_event(event, now);
        self.run(actions).await;
    }

    async fn wake(&mut self) {
        let now = self.transport.env().now();
        let actions = self.chat.tick(now);
        self.run(actions).await;
    }

    async fn run(&mut self, actions: Vec<ChatAction>) {
        for action in actions {
            match action {
                ChatAction::Send(payload) => self.transport.send(payload).await,
                ChatAction::Notify(event) => self.events.push_back(event),
            }
        }
    }
}
