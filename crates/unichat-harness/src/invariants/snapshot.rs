//! Observable session state.

use std::collections::BTreeMap;

use unichat_chat::{MessageStatus, Runtime};
use unichat_client::{Link, Transport};
use unichat_core::{ConnectionState, Environment};
use unichat_proto::{MessageId, Payload};

use crate::SimPeer;

/// Point-in-time view of a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Transport connection state
    pub connection: ConnectionState,
    /// Frames waiting in the outbound queue
    pub queued: usize,
    /// Whether the simulated link is up
    pub link_open: bool,
    /// Message ids in the order they were sent by the application
    pub issued: Vec<MessageId>,
    /// Message ids in the order they reached the wire
    pub transmitted: Vec<MessageId>,
    /// Every status each message has had, keyed by client id
    pub status_history: BTreeMap<MessageId, Vec<MessageStatus>>,
}

impl SessionSnapshot {
    /// Capture transport-level state. `issued` lists the message ids handed
    /// to the transport, in order.
    pub fn capture<L, E>(transport: &Transport<L, E>, peer: &SimPeer, issued: &[MessageId]) -> Self
    where
        L: Link,
        E: Environment,
    {
        let transmitted = peer
            .sent_frames()
            .into_iter()
            .filter_map(|frame| match frame.payload {
                Payload::Message(message) => Some(message.id),
                _ => None,
            })
            .collect();

        Self {
            connection: transport.state(),
            queued: transport.queued(),
            link_open: peer.is_open(),
            issued: issued.to_vec(),
            transmitted,
            status_history: BTreeMap::new(),
        }
    }
}

/// Builds snapshots of a chat session and remembers status history.
#[derive(Debug, Clone, Default)]
pub struct SessionObserver {
    issued: Vec<MessageId>,
    history: BTreeMap<MessageId, Vec<MessageStatus>>,
}

impl SessionObserver {
    /// Create an observer with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the application sent message `id`.
    pub fn issued(&mut self, id: MessageId) {
        self.issued.push(id);
    }

    /// Capture the session and extend status history.
    pub fn snapshot<L, E>(&mut self, runtime: &Runtime<L, E>, peer: &SimPeer) -> SessionSnapshot
    where
        L: Link,
        E: Environment,
    {
        for (_, conversation) in runtime.chat().state().conversations() {
            for message in conversation.messages() {
                let key = message.client_id.clone().unwrap_or_else(|| message.id.clone());
                let history = self.history.entry(key).or_default();
                if history.last() != Some(&message.status) {
                    history.push(message.status);
                }
            }
        }

        let mut snapshot = SessionSnapshot::capture(runtime.transport(), peer, &self.issued);
        snapshot.status_history = self.history.clone();
        snapshot
    }
}
