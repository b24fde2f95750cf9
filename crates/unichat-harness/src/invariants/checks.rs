//! Standard invariant checks.

use std::collections::{HashMap, HashSet};

use unichat_core::ConnectionState;

use super::{Invariant, InvariantResult, SessionSnapshot, Violation};

/// The link is up only while the transport is `Open`.
///
/// A link left open in any other state would let frames bypass the queue or
/// leak a socket after `disconnect`.
pub struct LinkOnlyWhenOpen;

impl Invariant for LinkOnlyWhenOpen {
    fn name(&self) -> &'static str {
        "link_only_when_open"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.link_open && state.connection != ConnectionState::Open {
            return Err(Violation {
                invariant: self.name(),
                message: format!("link is up while {}", state.connection),
            });
        }
        Ok(())
    }
}

/// Nothing waits in the outbound queue while `Open`.
pub struct QueueDrainedWhenOpen;

impl Invariant for QueueDrainedWhenOpen {
    fn name(&self) -> &'static str {
        "queue_drained_when_open"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.connection == ConnectionState::Open && state.queued > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} frames queued while open", state.queued),
            });
        }
        Ok(())
    }
}

/// Messages reach the wire at most once and in the order they were sent.
///
/// Frames may be missing (lost with a failed send) but never reordered.
/// Skipped when no issued ids were recorded.
pub struct TransmitOrder;

impl Invariant for TransmitOrder {
    fn name(&self) -> &'static str {
        "transmit_order"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.issued.is_empty() {
            return Ok(());
        }

        let position: HashMap<_, _> =
            state.issued.iter().enumerate().map(|(i, id)| (id, i)).collect();
        let mut seen = HashSet::new();
        let mut last = None;

        for id in &state.transmitted {
            if !seen.insert(id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("message {id} transmitted twice"),
                });
            }
            let Some(&at) = position.get(id) else {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("message {id} transmitted but never sent"),
                });
            };
            if last.is_some_and(|prev| at < prev) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("message {id} transmitted out of order"),
                });
            }
            last = Some(at);
        }
        Ok(())
    }
}

/// Every recorded status transition is a legal advance.
pub struct StatusMonotonicity;

impl Invariant for StatusMonotonicity {
    fn name(&self) -> &'static str {
        "status_monotonicity"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for (id, history) in &state.status_history {
            for window in history.windows(2) {
                if window[0].advance(window[1]) != Some(window[1]) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("message {id}: status went {} → {}", window[0], window[1]),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use unichat_chat::MessageStatus;
    use unichat_proto::MessageId;

    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            connection: ConnectionState::Open,
            queued: 0,
            link_open: true,
            issued: vec!["a".into(), "b".into(), "c".into()],
            transmitted: vec!["a".into(), "c".into()],
            status_history: BTreeMap::new(),
        }
    }

    #[test]
    fn healthy_snapshot_passes() {
        assert!(crate::InvariantRegistry::standard().check_all(&snapshot()).is_ok());
    }

    #[test]
    fn reordered_transmission_is_flagged() {
        let mut state = snapshot();
        state.transmitted = vec!["b".into(), "a".into()];
        assert!(TransmitOrder.check(&state).is_err());
    }

    #[test]
    fn duplicate_transmission_is_flagged() {
        let mut state = snapshot();
        state.transmitted = vec!["a".into(), "a".into()];
        assert!(TransmitOrder.check(&state).is_err());
    }

    #[test]
    fn link_up_while_disconnected_is_flagged() {
        let mut state = snapshot();
        state.connection = ConnectionState::Disconnected;
        assert!(LinkOnlyWhenOpen.check(&state).is_err());
    }

    #[test]
    fn regression_is_flagged() {
        let mut state = snapshot();
        let id: MessageId = "a".into();
        state
            .status_history
            .insert(id, vec![MessageStatus::Sent, MessageStatus::Seen, MessageStatus::Delivered]);
        assert!(StatusMonotonicity.check(&state).is_err());
    }
}
