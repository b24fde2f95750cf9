//! Transport events and the topics listeners subscribe to.

use std::time::Duration;

use unichat_proto::{EventKind, Frame};

use crate::ConnectionState;

/// Something a transport listener may observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Decoded inbound frame
    Frame(Frame),

    /// Connection state transition
    StateChanged(ConnectionState),

    /// Automatic reconnect attempt scheduled
    ReconnectScheduled {
        /// 1-based attempt number
        attempt: u32,
        /// Delay before the attempt
        delay: Duration,
    },

    /// Automatic reconnection gave up
    ConnectionFailed {
        /// Reconnect attempts made
        attempts: u32,
    },
}

impl TransportEvent {
    /// Topic this event is dispatched under.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::Frame(frame) => Topic::Frame(frame.kind()),
            Self::StateChanged(_) => Topic::StateChanged,
            Self::ReconnectScheduled { .. } => Topic::ReconnectScheduled,
            Self::ConnectionFailed { .. } => Topic::ConnectionFailed,
        }
    }
}

/// Listener subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Inbound frames of one kind
    Frame(EventKind),
    /// Every connection state transition
    StateChanged,
    /// Scheduled reconnect attempts
    ReconnectScheduled,
    /// Terminal reconnect failure
    ConnectionFailed,
}

impl From<EventKind> for Topic {
    fn from(kind: EventKind) -> Self {
        Self::Frame(kind)
    }
}
