//! Async transport driver.
//!
//! [`Transport`] owns the [`Connection`] state machine and a [`Link`], and
//! executes the machine's actions. All suspension happens in
//! [`Transport::poll_with`] and the explicit lifecycle calls; the state
//! machine itself stays synchronous.
//!
//! # Event loop
//!
//! `poll_with` waits on three cancel-safe sources at once: the link's next
//! inbound frame (while open), the earliest of the reconnect timer and the
//! caller's deadline, and a caller-supplied future. Whichever wins is handled
//! after the wait, so no action execution is ever cancelled halfway.

use std::{collections::VecDeque, convert::Infallible, future::Future, pin::pin};

use unichat_core::{
    Connection, ConnectionAction, ConnectionError, ConnectionState, Environment,
    MonotonicInstant, OutboundEntry, Topic, TransportConfig, TransportEvent,
};
use unichat_proto::{Decoded, Frame, Payload, UserId};

use crate::{
    Link, LinkError,
    listeners::{HandlerResult, Listeners, Subscription},
};

/// Successful `connect` or `reconnect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connected {
    /// Queued frames transmitted before the call returned
    pub flushed: usize,
}

/// Outcome of one [`Transport::poll_with`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled<T> {
    /// A transport event, already dispatched to listeners
    Event(TransportEvent),
    /// The caller's future completed
    External(T),
    /// The caller's deadline passed
    WakeUp,
    /// Nothing can wake the transport: no link, no timer, no deadline
    Idle,
}

#[derive(Debug, Default)]
struct Executed {
    transmitted: usize,
    connect_error: Option<ConnectionError>,
}

enum Wake<T> {
    Inbound(Option<Result<String, LinkError>>),
    Deadline,
    External(T),
}

/// Real-time transport to the message server.
///
/// # Invariants
///
/// - Frames reach the link only while the state is `Open`; otherwise they
///   wait in the outbound queue
/// - Listeners persist across `reconnect` and automatic reconnection; only
///   `disconnect` removes them
/// - Every event is dispatched to listeners when it happens and also
///   returned, in order, by `poll_*`
pub struct Transport<L, E>
where
    L: Link,
    E: Environment,
{
    link: L,
    env: E,
    connection: Connection<E::Instant>,
    listeners: Listeners,
    ready: VecDeque<TransportEvent>,
}

impl<L, E> Transport<L, E>
where
    L: Link,
    E: Environment,
{
    /// Create a disconnected transport.
    pub fn new(link: L, env: E, config: TransportConfig) -> Self {
        Self {
            link,
            env,
            connection: Connection::new(config),
            listeners: Listeners::new(),
            ready: VecDeque::new(),
        }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Identity of the current session, if connected or reconnecting.
    #[must_use]
    pub fn identity(&self) -> Option<&UserId> {
        self.connection.identity()
    }

    /// Frames waiting for an open link.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.connection.queued()
    }

    /// `Exhausted` once automatic reconnection has given up.
    #[must_use]
    pub fn failure(&self) -> Option<ConnectionError> {
        self.connection.failure()
    }

    /// Environment used for time and randomness.
    #[must_use]
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Underlying link.
    #[must_use]
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Register `handler` for `topic` (an [`unichat_proto::EventKind`] or a
    /// lifecycle [`Topic`]).
    pub fn on<F>(&mut self, topic: impl Into<Topic>, handler: F) -> Subscription
    where
        F: FnMut(&TransportEvent) -> HandlerResult + Send + 'static,
    {
        self.listeners.subscribe(topic.into(), handler)
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    /// Connect as `identity` and flush the outbound queue.
    ///
    /// The queue is fully transmitted, in order, before this returns. A
    /// failure of this first open is returned and not retried.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if already connecting or open
    /// - `ConnectionError::Link` if the link could not be opened
    pub async fn connect(
        &mut self,
        identity: impl Into<UserId>,
    ) -> Result<Connected, ConnectionError> {
        let actions = self.connection.connect(identity.into(), self.env.now())?;
        self.finish_open(actions).await
    }

    /// Close any current link and connect again with the same identity.
    ///
    /// Resets the reconnect counter, including after exhaustion. Listeners
    /// and queued frames are kept.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if there is no identity to reuse
    /// - `ConnectionError::Link` if the link could not be opened
    pub async fn reconnect(&mut self) -> Result<Connected, ConnectionError> {
        let actions = self.connection.reconnect(self.env.now())?;
        self.finish_open(actions).await
    }

    /// Close the link, cancel reconnection, and remove every listener.
    ///
    /// Idempotent. Listeners observe the `Closing`/`Disconnected`
    /// transitions before they are removed. Queued frames are kept.
    pub async fn disconnect(&mut self) {
        let actions = self.connection.disconnect();
        self.execute(actions).await;
        self.listeners.clear();
    }

    /// Send `payload`, stamped with the wall clock.
    ///
    /// Transmitted immediately when open, queued otherwise. Never fails: a
    /// broken link is handled as link loss. Payloads only the server sends
    /// (delivery and seen receipts) are dropped with a warning.
    pub async fn send(&mut self, payload: Payload) {
        let kind = payload.kind();
        if !kind.is_outbound() {
            tracing::warn!(%kind, "dropping server-only payload");
            return;
        }
        let frame = Frame::new(payload, self.env.wall_clock_millis());
        let actions = self.connection.send(frame, self.env.now());
        self.execute(actions).await;
    }

    /// Wait for the next event or `wake_at`, whichever comes first.
    ///
    /// Returns [`Polled::Idle`] instead of waiting forever.
    pub async fn poll_until(&mut self, wake_at: Option<E::Instant>) -> Polled<Infallible> {
        self.poll_inner(wake_at, std::future::pending(), true).await
    }

    /// Like [`Self::poll_until`], but also completes when `external` does.
    ///
    /// `external` is dropped if something else wins, so it must be
    /// cancel-safe.
    pub async fn poll_with<F: Future>(
        &mut self,
        wake_at: Option<E::Instant>,
        external: F,
    ) -> Polled<F::Output> {
        self.poll_inner(wake_at, external, false).await
    }

    /// Next transport event, or `None` once nothing can produce one.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            match self.poll_until(None).await {
                Polled::Event(event) => return Some(event),
                Polled::Idle => return None,
                Polled::WakeUp => {},
                Polled::External(never) => match never {},
            }
        }
    }

    async fn finish_open(
        &mut self,
        actions: Vec<ConnectionAction<E::Instant>>,
    ) -> Result<Connected, ConnectionError> {
        let executed = self.execute(actions).await;
        match executed.connect_error {
            Some(err) => Err(err),
            None => Ok(Connected { flushed: executed.transmitted }),
        }
    }

    async fn poll_inner<F: Future>(
        &mut self,
        wake_at: Option<E::Instant>,
        external: F,
        may_idle: bool,
    ) -> Polled<F::Output> {
        let mut external = pin!(external);

        loop {
            if let Some(event) = self.ready.pop_front() {
                return Polled::Event(event);
            }

            let open = self.connection.state() == ConnectionState::Open;
            let deadline = earliest(self.connection.next_deadline(), wake_at);
            if may_idle && !open && deadline.is_none() {
                return Polled::Idle;
            }

            let delay = deadline.map(|at| self.env.now().until(at));
            let env = self.env.clone();
            let link = &mut self.link;

            let wake = tokio::select! {
                biased;
                inbound = async {
                    if open { link.recv().await } else { std::future::pending().await }
                } => Wake::Inbound(inbound),
                () = async move {
                    match delay {
                        Some(delay) => env.sleep(delay).await,
                        None => std::future::pending().await,
                    }
                } => Wake::Deadline,
                output = &mut external => Wake::External(output),
            };

            match wake {
                Wake::External(output) => return Polled::External(output),
                Wake::Inbound(Some(Ok(text))) => self.handle_inbound(&text),
                Wake::Inbound(Some(Err(err))) => self.lose_link(&err.to_string()).await,
                Wake::Inbound(None) => self.lose_link("closed by server").await,
                Wake::Deadline => {
                    let now = self.env.now();
                    let actions = self.connection.tick(now);
                    self.execute(actions).await;

                    if self.ready.is_empty() && wake_at.is_some_and(|at| at <= now) {
                        return Polled::WakeUp;
                    }
                },
            }
        }
    }

    fn handle_inbound(&mut self, text: &str) {
        match Frame::decode(text) {
            Ok(Decoded::Frame(frame)) if frame.kind().is_inbound() => {
                let event = TransportEvent::Frame(frame);
                self.listeners.dispatch(&event);
                self.ready.push_back(event);
            },
            Ok(Decoded::Frame(frame)) => {
                tracing::debug!(kind = %frame.kind(), "ignoring outbound-only kind from server");
            },
            Ok(Decoded::Unknown { kind }) => {
                tracing::debug!(%kind, "ignoring unknown event kind");
            },
            Err(err) => {
                tracing::warn!(%err, len = text.len(), "dropping malformed frame");
            },
        }
    }

    async fn lose_link(&mut self, reason: &str) {
        self.link.close().await;
        let actions = self.connection.link_lost(reason, self.env.now());
        self.execute(actions).await;
    }

    async fn execute(&mut self, actions: Vec<ConnectionAction<E::Instant>>) -> Executed {
        let mut pending: VecDeque<_> = actions.into();
        let mut executed = Executed::default();

        while let Some(action) = pending.pop_front() {
            match action {
                ConnectionAction::OpenLink { identity } => {
                    let result = self.link.open(&identity).await;
                    let now = self.env.now();
                    let follow = match result {
                        Ok(()) => self.connection.link_opened(now),
                        Err(err) => self.connection.link_failed(&err.to_string(), now),
                    };
                    pending.extend(follow);
                },
                ConnectionAction::Transmit(entry) => {
                    let text = match entry.frame.encode() {
                        Ok(text) => text,
                        Err(err) => {
                            let kind = entry.kind();
                            tracing::error!(%kind, %err, "dropping unencodable frame");
                            continue;
                        },
                    };

                    match self.link.send(text).await {
                        Ok(()) => executed.transmitted += 1,
                        Err(err) => {
                            tracing::warn!(kind = %entry.kind(), %err, "transmit failed");
                            let (unsent, rest) = split_transmits(pending);
                            pending = rest;

                            self.link.close().await;
                            let now = self.env.now();
                            pending.extend(self.connection.transmit_failed(
                                &err.to_string(),
                                unsent,
                                now,
                            ));
                        },
                    }
                },
                ConnectionAction::CloseLink => {
                    self.link.close().await;
                    pending.extend(self.connection.link_closed());
                },
                ConnectionAction::Notify(event) => {
                    self.listeners.dispatch(&event);
                    self.ready.push_back(event);
                },
                ConnectionAction::ConnectFailed(err) => executed.connect_error = Some(err),
            }
        }

        executed
    }
}

fn earliest<I: Ord>(a: Option<I>, b: Option<I>) -> Option<I> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Separate not-yet-attempted transmits from the other pending actions,
/// preserving the order of both.
fn split_transmits<I>(
    pending: VecDeque<ConnectionAction<I>>,
) -> (Vec<OutboundEntry<I>>, VecDeque<ConnectionAction<I>>) {
    let mut unsent = Vec::new();
    let mut rest = VecDeque::new();

    for action in pending {
        match action {
            ConnectionAction::Transmit(entry) => unsent.push(entry),
            other => rest.push_back(other),
        }
    }
    (unsent, rest)
}
