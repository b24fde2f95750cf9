//! Transport connection state machine.
//!
//! Owns the connection lifecycle, the reconnect schedule, and the offline
//! outbound queue. Uses the action pattern: methods take time as input and
//! return actions for the driver to execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//!                  connect / reconnect timer
//! ┌──────────────┐ ──────────────────────> ┌────────────┐  link opened  ┌──────┐
//! │ Disconnected │                          │ Connecting │ ────────────> │ Open │
//! └──────────────┘ <────────────────────── └────────────┘               └──────┘
//!        ↑            open failed                                           │
//!        │ <──────────────────────────── link lost (backoff scheduled) ─────┤
//!        │                                                                  │ disconnect
//!        │           link closed          ┌─────────┐                       │
//!        └─────────────────────────────── │ Closing │ <─────────────────────┘
//!                                         └─────────┘
//! ```
//!
//! # Reconnection
//!
//! Only a link that drops unexpectedly (or a reconnect attempt that fails)
//! schedules another attempt. A failure of the first open after an explicit
//! `connect` is reported to the caller instead. Attempt `n` waits
//! [`BackoffPolicy::delay_for_attempt`]`(n)`; once `n` would exceed
//! `max_attempts` the machine emits `ConnectionFailed` and stays
//! disconnected until the caller asks again.

use std::fmt;

use unichat_proto::{Frame, UserId};

use crate::{
    BackoffPolicy, ConnectionError, MAX_TIMER, MonotonicInstant, OutboundEntry, OutboundQueue,
    TransportEvent,
};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No link and no open in progress
    Disconnected,
    /// Link open requested, not yet confirmed
    Connecting,
    /// Link established, frames flow directly
    Open,
    /// Caller-initiated close in progress
    Closing,
}

impl ConnectionState {
    /// Lowercase state name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions returned by the connection state machine.
///
/// The driver executes these in order:
/// - `OpenLink`: open the network link and report back with
///   [`Connection::link_opened`] or [`Connection::link_failed`]
/// - `Transmit`: encode and write the frame, reporting failures with
///   [`Connection::transmit_failed`]
/// - `CloseLink`: close the link, then call [`Connection::link_closed`]
/// - `Notify`: dispatch the event to listeners
/// - `ConnectFailed`: fail the caller's pending `connect`/`reconnect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction<I> {
    /// Open a link authenticated as `identity`
    OpenLink {
        /// Identity presented to the server
        identity: UserId,
    },

    /// Write this frame to the link
    Transmit(OutboundEntry<I>),

    /// Close the current link
    CloseLink,

    /// Dispatch to listeners
    Notify(TransportEvent),

    /// The explicit open the caller is waiting on failed
    ConnectFailed(ConnectionError),
}

/// Transport configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportConfig {
    /// Reconnect schedule
    pub backoff: BackoffPolicy,
}

/// Why the current open was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenReason {
    /// Caller asked; failure is reported to the caller
    Requested,
    /// Backoff timer fired; failure schedules the next attempt
    Retry,
}

/// Connection state machine
///
/// # Invariants
///
/// - At most one reconnect timer is pending
/// - `reconnect_attempt` counts consecutive failed automatic attempts and is
///   zero whenever the state is `Open`
/// - Queued frames are flushed in enqueue order before the `Open` state
///   change is announced
#[derive(Debug, Clone)]
pub struct Connection<I> {
    state: ConnectionState,
    config: TransportConfig,
    identity: Option<UserId>,
    open_reason: OpenReason,
    reconnect_attempt: u32,
    reconnect_at: Option<I>,
    exhausted_after: Option<u32>,
    queue: OutboundQueue<I>,
}

impl<I: MonotonicInstant> Connection<I> {
    /// Create a disconnected connection.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            identity: None,
            open_reason: OpenReason::Requested,
            reconnect_attempt: 0,
            reconnect_at: None,
            exhausted_after: None,
            queue: OutboundQueue::new(),
        }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Identity of the most recent `connect`. Cleared by `disconnect`.
    #[must_use]
    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    /// Consecutive failed automatic reconnect attempts.
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    /// Number of frames waiting for an open link.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Frames waiting for an open link, head first.
    #[must_use]
    pub fn queue(&self) -> &OutboundQueue<I> {
        &self.queue
    }

    /// When [`Self::tick`] next has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.reconnect_at
    }

    /// `Exhausted` once automatic reconnection has given up.
    #[must_use]
    pub fn failure(&self) -> Option<ConnectionError> {
        self.exhausted_after.map(|attempts| ConnectionError::Exhausted { attempts })
    }

    /// Start connecting as `identity`.
    ///
    /// Resets the reconnect counter and any previous exhaustion.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` unless disconnected
    pub fn connect(
        &mut self,
        identity: UserId,
        _now: I,
    ) -> Result<Vec<ConnectionAction<I>>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "connect" });
        }

        tracing::debug!(user = %identity, "connecting");
        self.identity = Some(identity.clone());
        self.reset_schedule();
        self.open_reason = OpenReason::Requested;

        Ok(self.begin_open(identity))
    }

    /// Force a fresh connection with the last identity.
    ///
    /// Closes any current link, resets the reconnect counter, and opens
    /// again. Listeners and the outbound queue are untouched.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if `connect` was never called or
    ///   `disconnect` cleared the identity
    pub fn reconnect(&mut self, _now: I) -> Result<Vec<ConnectionAction<I>>, ConnectionError> {
        let Some(identity) = self.identity.clone() else {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "reconnect" });
        };

        let mut actions = Vec::new();
        if matches!(self.state, ConnectionState::Open | ConnectionState::Connecting) {
            actions.push(ConnectionAction::CloseLink);
        }

        tracing::debug!(user = %identity, "forced reconnect");
        self.reset_schedule();
        self.open_reason = OpenReason::Requested;
        actions.extend(self.begin_open(identity));

        Ok(actions)
    }

    /// The link requested by `OpenLink` is up.
    ///
    /// Returns the queued frames as `Transmit` actions, in order, followed by
    /// the `Open` notification. If the machine has moved on since the open
    /// was requested, the stale link is closed instead.
    pub fn link_opened(&mut self, _now: I) -> Vec<ConnectionAction<I>> {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, "closing link opened in stale state");
            return vec![ConnectionAction::CloseLink];
        }

        self.state = ConnectionState::Open;
        self.reconnect_attempt = 0;
        self.reconnect_at = None;

        let queued = self.queue.drain();
        tracing::info!(flushed = queued.len(), "connection open");

        let mut actions: Vec<_> = queued.into_iter().map(ConnectionAction::Transmit).collect();
        actions.push(ConnectionAction::Notify(TransportEvent::StateChanged(ConnectionState::Open)));
        actions
    }

    /// The link requested by `OpenLink` could not be opened.
    ///
    /// A requested open fails back to the caller with `ConnectFailed`. A
    /// retry schedules the next attempt or gives up.
    pub fn link_failed(&mut self, reason: &str, now: I) -> Vec<ConnectionAction<I>> {
        match self.state {
            ConnectionState::Connecting => {},
            ConnectionState::Closing => return self.link_closed(),
            ConnectionState::Disconnected | ConnectionState::Open => return Vec::new(),
        }

        match self.open_reason {
            OpenReason::Requested => {
                tracing::warn!(%reason, "connect failed");
                self.state = ConnectionState::Disconnected;
                vec![
                    ConnectionAction::Notify(TransportEvent::StateChanged(
                        ConnectionState::Disconnected,
                    )),
                    ConnectionAction::ConnectFailed(ConnectionError::Link(reason.to_owned())),
                ]
            },
            OpenReason::Retry => {
                let attempt = self.reconnect_attempt;
                tracing::warn!(%reason, attempt, "reconnect attempt failed");
                self.schedule_reconnect(now)
            },
        }
    }

    /// The open link dropped without the caller asking.
    pub fn link_lost(&mut self, reason: &str, now: I) -> Vec<ConnectionAction<I>> {
        match self.state {
            ConnectionState::Open => {
                tracing::warn!(%reason, "link lost");
                self.open_reason = OpenReason::Retry;
                self.schedule_reconnect(now)
            },
            ConnectionState::Closing => self.link_closed(),
            ConnectionState::Connecting => self.link_failed(reason, now),
            ConnectionState::Disconnected => Vec::new(),
        }
    }

    /// Writing to the link failed.
    ///
    /// `unsent` holds the entries scheduled after the failed one that were
    /// never attempted. They return to the head of the queue in order. The
    /// failed entry itself is not requeued.
    pub fn transmit_failed(
        &mut self,
        reason: &str,
        unsent: Vec<OutboundEntry<I>>,
        now: I,
    ) -> Vec<ConnectionAction<I>> {
        tracing::debug!(requeued = unsent.len(), "requeueing unsent frames");
        self.queue.requeue_front(unsent);
        self.link_lost(reason, now)
    }

    /// Send a frame, or queue it if the link is not open.
    pub fn send(&mut self, frame: Frame, now: I) -> Vec<ConnectionAction<I>> {
        if self.state == ConnectionState::Open {
            return vec![ConnectionAction::Transmit(OutboundEntry { frame, enqueued_at: now })];
        }

        tracing::debug!(kind = %frame.kind(), state = %self.state, "queueing frame");
        self.queue.push(frame, now);
        Vec::new()
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Idempotent. Clears the identity and cancels any pending reconnect.
    /// The outbound queue is kept and flushes on the next successful
    /// connect.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction<I>> {
        self.identity = None;
        self.reset_schedule();
        self.open_reason = OpenReason::Requested;

        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => {
                tracing::debug!("disconnecting");
                self.state = ConnectionState::Closing;
                vec![
                    ConnectionAction::Notify(TransportEvent::StateChanged(
                        ConnectionState::Closing,
                    )),
                    ConnectionAction::CloseLink,
                ]
            },
            ConnectionState::Closing | ConnectionState::Disconnected => Vec::new(),
        }
    }

    /// The link closed after a `CloseLink` action.
    pub fn link_closed(&mut self) -> Vec<ConnectionAction<I>> {
        if self.state != ConnectionState::Closing {
            return Vec::new();
        }

        self.state = ConnectionState::Disconnected;
        vec![ConnectionAction::Notify(TransportEvent::StateChanged(ConnectionState::Disconnected))]
    }

    /// Fire the reconnect timer if it is due.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction<I>> {
        match self.reconnect_at {
            Some(at) if at <= now => {},
            _ => return Vec::new(),
        }
        self.reconnect_at = None;

        if self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        let Some(identity) = self.identity.clone() else {
            return Vec::new();
        };

        tracing::info!(attempt = self.reconnect_attempt, "reconnecting");
        self.open_reason = OpenReason::Retry;
        self.begin_open(identity)
    }

    fn begin_open(&mut self, identity: UserId) -> Vec<ConnectionAction<I>> {
        self.state = ConnectionState::Connecting;
        vec![
            ConnectionAction::Notify(TransportEvent::StateChanged(ConnectionState::Connecting)),
            ConnectionAction::OpenLink { identity },
        ]
    }

    fn reset_schedule(&mut self) {
        self.reconnect_attempt = 0;
        self.reconnect_at = None;
        self.exhausted_after = None;
    }

    fn schedule_reconnect(&mut self, now: I) -> Vec<ConnectionAction<I>> {
        self.state = ConnectionState::Disconnected;
        let mut actions = vec![ConnectionAction::Notify(TransportEvent::StateChanged(
            ConnectionState::Disconnected,
        ))];

        let attempt = self.reconnect_attempt.saturating_add(1);
        if !self.config.backoff.allows(attempt) {
            tracing::error!(attempts = self.reconnect_attempt, "giving up on reconnection");
            self.reconnect_at = None;
            self.exhausted_after = Some(self.reconnect_attempt);
            actions.push(ConnectionAction::Notify(TransportEvent::ConnectionFailed {
                attempts: self.reconnect_attempt,
            }));
            return actions;
        }

        let delay = self.config.backoff.delay_for_attempt(attempt).min(MAX_TIMER);
        tracing::info!(attempt, ?delay, "reconnect scheduled");
        self.reconnect_attempt = attempt;
        self.reconnect_at = Some(now.after(delay));
        actions.push(ConnectionAction::Notify(TransportEvent::ReconnectScheduled {
            attempt,
            delay,
        }));
        actions
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use unichat_proto::{Payload, payloads::TypingNotice};

    use super::*;

    fn config() -> TransportConfig {
        TransportConfig {
            backoff: BackoffPolicy {
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(4),
                max_attempts: 3,
            },
        }
    }

    fn frame(n: u64) -> Frame {
        Frame::new(
            Payload::Typing(TypingNotice { conversation_id: "c".into(), user_id: "u".into() }),
            n,
        )
    }

    fn open(conn: &mut Connection<Instant>, now: Instant) {
        conn.connect("alice".into(), now).unwrap();
        conn.link_opened(now);
    }

    fn notified(actions: &[ConnectionAction<Instant>]) -> Vec<TransportEvent> {
        actions
            .iter()
            .filter_map(|a| match a {
                ConnectionAction::Notify(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connect_requests_link_with_identity() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());

        let actions = conn.connect("alice".into(), t0).unwrap();

        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert_eq!(actions, vec![
            ConnectionAction::Notify(TransportEvent::StateChanged(ConnectionState::Connecting)),
            ConnectionAction::OpenLink { identity: "alice".into() },
        ]);
    }

    #[test]
    fn connect_twice_is_rejected() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        conn.connect("alice".into(), t0).unwrap();

        let err = conn.connect("alice".into(), t0).unwrap_err();
        assert_eq!(err, ConnectionError::InvalidState {
            state: ConnectionState::Connecting,
            operation: "connect",
        });
    }

    #[test]
    fn queued_frames_flush_in_order_before_open_is_announced() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        assert!(conn.send(frame(1), t0).is_empty());
        assert!(conn.send(frame(2), t0).is_empty());
        assert_eq!(conn.queued(), 2);

        conn.connect("alice".into(), t0).unwrap();
        let actions = conn.link_opened(t0);

        assert_eq!(conn.queued(), 0);
        assert_eq!(actions.len(), 3);
        let stamps: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                ConnectionAction::Transmit(entry) => Some(entry.frame.timestamp),
                _ => None,
            })
            .collect();
        assert_eq!(stamps, vec![1, 2]);
        assert_eq!(
            actions.last(),
            Some(&ConnectionAction::Notify(TransportEvent::StateChanged(ConnectionState::Open)))
        );
    }

    #[test]
    fn send_while_open_transmits_immediately() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);

        let actions = conn.send(frame(9), t0);
        assert_eq!(actions, vec![ConnectionAction::Transmit(OutboundEntry {
            frame: frame(9),
            enqueued_at: t0,
        })]);
        assert_eq!(conn.queued(), 0);
    }

    #[test]
    fn initial_open_failure_is_reported_not_retried() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        conn.connect("alice".into(), t0).unwrap();

        let actions = conn.link_failed("refused", t0);

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(actions.contains(&ConnectionAction::ConnectFailed(ConnectionError::Link(
            "refused".into()
        ))));
        assert_eq!(conn.next_deadline(), None);
    }

    #[test]
    fn link_loss_schedules_backoff() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);

        let actions = conn.link_lost("reset", t0);

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(notified(&actions), vec![
            TransportEvent::StateChanged(ConnectionState::Disconnected),
            TransportEvent::ReconnectScheduled { attempt: 1, delay: Duration::from_secs(1) },
        ]);
        assert_eq!(conn.next_deadline(), Some(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn tick_before_deadline_does_nothing() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);
        conn.link_lost("reset", t0);

        assert!(conn.tick(t0 + Duration::from_millis(999)).is_empty());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn failed_retries_back_off_then_give_up() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);

        let mut now = t0;
        let mut actions = conn.link_lost("reset", now);
        let mut delays = Vec::new();

        loop {
            let events = notified(&actions);
            if let Some(TransportEvent::ConnectionFailed { attempts }) = events.last() {
                assert_eq!(*attempts, 3);
                break;
            }
            let Some(deadline) = conn.next_deadline() else {
                panic!("expected a scheduled reconnect");
            };
            delays.push(deadline - now);
            now = deadline;

            let retry = conn.tick(now);
            assert!(retry.contains(&ConnectionAction::OpenLink { identity: "alice".into() }));
            actions = conn.link_failed("refused", now);
        }

        assert_eq!(delays, vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
        ]);
        assert_eq!(conn.next_deadline(), None);
        assert_eq!(conn.failure(), Some(ConnectionError::Exhausted { attempts: 3 }));
    }

    #[test]
    fn successful_retry_resets_attempts() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);
        conn.link_lost("reset", t0);

        let later = t0 + Duration::from_secs(1);
        conn.tick(later);
        conn.link_opened(later);

        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(conn.reconnect_attempt(), 0);
    }

    #[test]
    fn disconnect_cancels_reconnect_and_keeps_queue() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);
        conn.link_lost("reset", t0);
        conn.send(frame(1), t0);

        assert!(conn.disconnect().is_empty());
        assert_eq!(conn.next_deadline(), None);
        assert_eq!(conn.identity(), None);
        assert_eq!(conn.queued(), 1);
        assert!(conn.tick(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn disconnect_from_open_goes_through_closing() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);

        let actions = conn.disconnect();
        assert_eq!(conn.state(), ConnectionState::Closing);
        assert!(actions.contains(&ConnectionAction::CloseLink));

        // Second call is a no-op
        assert!(conn.disconnect().is_empty());

        let actions = conn.link_closed();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(notified(&actions), vec![TransportEvent::StateChanged(
            ConnectionState::Disconnected
        )]);
    }

    #[test]
    fn huge_backoff_is_clamped_to_max_timer() {
        let t0 = Instant::now();
        let mut conn = Connection::new(TransportConfig {
            backoff: BackoffPolicy {
                base_delay: Duration::MAX,
                max_delay: Duration::MAX,
                max_attempts: 3,
            },
        });
        open(&mut conn, t0);

        let actions = conn.link_lost("reset", t0);

        assert!(notified(&actions).contains(&TransportEvent::ReconnectScheduled {
            attempt: 1,
            delay: MAX_TIMER,
        }));
        assert_eq!(conn.next_deadline(), Some(t0 + MAX_TIMER));
    }

    #[test]
    fn link_lost_while_closing_completes_close_without_retry() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);
        conn.disconnect();

        conn.link_lost("closed by peer", t0);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.next_deadline(), None);
    }

    #[test]
    fn stale_open_is_closed() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        conn.connect("alice".into(), t0).unwrap();
        conn.disconnect();

        assert_eq!(conn.link_opened(t0), vec![ConnectionAction::CloseLink]);
    }

    #[test]
    fn transmit_failure_requeues_unsent_at_front() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);
        conn.link_lost("reset", t0);
        conn.send(frame(3), t0);

        let unsent = vec![
            OutboundEntry { frame: frame(1), enqueued_at: t0 },
            OutboundEntry { frame: frame(2), enqueued_at: t0 },
        ];
        // Already disconnected, so no second schedule
        assert!(conn.transmit_failed("broken pipe", unsent, t0).is_empty());

        let stamps: Vec<_> = conn.queue().iter().map(|e| e.frame.timestamp).collect();
        assert_eq!(stamps, vec![1, 2, 3]);
    }

    #[test]
    fn transmit_failure_while_open_is_link_loss() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);

        let unsent = vec![OutboundEntry { frame: frame(1), enqueued_at: t0 }];
        let actions = conn.transmit_failed("broken pipe", unsent, t0);

        assert_eq!(conn.queued(), 1);
        assert!(notified(&actions).contains(&TransportEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(1),
        }));
    }

    #[test]
    fn reconnect_after_exhaustion_starts_over() {
        let t0 = Instant::now();
        let mut conn = Connection::new(TransportConfig {
            backoff: BackoffPolicy { max_attempts: 0, ..config().backoff },
        });
        open(&mut conn, t0);

        let actions = conn.link_lost("reset", t0);
        assert!(notified(&actions).contains(&TransportEvent::ConnectionFailed { attempts: 0 }));

        let actions = conn.reconnect(t0).unwrap();
        assert!(actions.contains(&ConnectionAction::OpenLink { identity: "alice".into() }));
        assert_eq!(conn.failure(), None);
        assert_eq!(conn.reconnect_attempt(), 0);
    }

    #[test]
    fn reconnect_while_open_closes_first() {
        let t0 = Instant::now();
        let mut conn = Connection::new(config());
        open(&mut conn, t0);

        let actions = conn.reconnect(t0).unwrap();
        assert_eq!(actions.first(), Some(&ConnectionAction::CloseLink));
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[test]
    fn reconnect_without_identity_is_rejected() {
        let mut conn = Connection::<Instant>::new(config());
        assert!(matches!(
            conn.reconnect(Instant::now()),
            Err(ConnectionError::InvalidState { operation: "reconnect", .. })
        ));
    }
}
