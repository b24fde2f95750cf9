//! Fuzz target for the Connection state machine
//!
//! Ensure the reconnect schedule and outbound queue stay consistent under any
//! interleaving of caller operations and link outcomes.
//!
//! # Strategy
//!
//! - Lifecycle: connect, disconnect, reconnect in any state
//! - Link outcomes: opened, failed, lost, closed, transmit failures
//! - Time: arbitrary jumps, including past several deadlines at once
//!
//! # Invariants
//!
//! - Reconnect attempt never exceeds the policy maximum
//! - Scheduled delays follow the backoff policy exactly
//! - `Open` implies an empty queue and a reset attempt counter
//! - A pending deadline implies `Disconnected`
//! - Frames are transmitted in send order, each at most once

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use unichat_core::{
    BackoffPolicy, Connection, ConnectionAction, ConnectionState, OutboundEntry, TransportConfig,
    TransportEvent,
};
use unichat_proto::{Frame, Payload, payloads::TypingNotice};

#[derive(Debug, Clone, Arbitrary)]
enum ConnectionOp {
    Connect,
    Disconnect,
    Reconnect,
    Send,
    LinkOpened,
    LinkFailed,
    LinkLost,
    LinkClosed,
    /// Fail the next in-flight transmit, requeueing the rest
    TransmitFailed,
    Advance { millis: u16 },
}

fn frame(seq: u64) -> Frame {
    Frame::new(
        Payload::Typing(TypingNotice { conversation_id: "c".into(), user_id: "u".into() }),
        seq,
    )
}

fuzz_target!(|ops: Vec<ConnectionOp>| {
    let policy = BackoffPolicy {
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(2),
        max_attempts: 4,
    };
    let mut conn = Connection::new(TransportConfig { backoff: policy });
    let mut now = Instant::now();
    let mut next_seq = 0u64;
    // Entries written by the most recent step; a transmit failure hits these
    let mut in_flight: Vec<OutboundEntry<Instant>> = Vec::new();
    let mut transmitted: Vec<u64> = Vec::new();

    for op in ops {
        let actions = match op {
            ConnectionOp::Connect => conn.connect("alice".into(), now).unwrap_or_default(),
            ConnectionOp::Disconnect => conn.disconnect(),
            ConnectionOp::Reconnect => conn.reconnect(now).unwrap_or_default(),
            ConnectionOp::Send => {
                next_seq += 1;
                conn.send(frame(next_seq), now)
            },
            ConnectionOp::LinkOpened => conn.link_opened(now),
            ConnectionOp::LinkFailed => conn.link_failed("refused", now),
            ConnectionOp::LinkLost => conn.link_lost("reset", now),
            ConnectionOp::LinkClosed => conn.link_closed(),
            ConnectionOp::TransmitFailed => {
                if in_flight.is_empty() || conn.state() != ConnectionState::Open {
                    Vec::new()
                } else {
                    // The first in-flight entry is lost; the rest return to the queue
                    let unsent = in_flight.split_off(1);
                    in_flight.clear();
                    transmitted.retain(|seq| !unsent.iter().any(|e| e.frame.timestamp == *seq));
                    conn.transmit_failed("broken pipe", unsent, now)
                }
            },
            ConnectionOp::Advance { millis } => {
                now += Duration::from_millis(u64::from(millis));
                conn.tick(now)
            },
        };

        if conn.state() != ConnectionState::Open {
            in_flight.clear();
        }
        if actions.iter().any(|a| matches!(a, ConnectionAction::Transmit(_))) {
            in_flight.clear();
        }

        for action in actions {
            match action {
                ConnectionAction::Transmit(entry) => {
                    transmitted.push(entry.frame.timestamp);
                    in_flight.push(entry);
                },
                ConnectionAction::Notify(TransportEvent::ReconnectScheduled { attempt, delay }) => {
                    assert!(attempt >= 1 && attempt <= policy.max_attempts);
                    assert_eq!(delay, policy.delay_for_attempt(attempt));
                },
                _ => {},
            }
        }

        assert!(conn.reconnect_attempt() <= policy.max_attempts);
        if conn.state() == ConnectionState::Open {
            assert_eq!(conn.reconnect_attempt(), 0);
            assert_eq!(conn.queued(), 0);
        }
        if conn.next_deadline().is_some() {
            assert_eq!(conn.state(), ConnectionState::Disconnected);
        }
    }

    // Requeued frames were never written, so every written frame appears once
    // and in send order
    assert!(transmitted.windows(2).all(|w| w[0] < w[1]), "frames reordered: {transmitted:?}");
});
