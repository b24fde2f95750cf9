//! Property-based tests for the listener registry.
//!
//! Random interleavings of subscribe and unsubscribe must leave exactly the
//! live handlers reachable, each topic dispatching only to its own.

use std::time::Duration;

use proptest::prelude::*;
use unichat_client::{ConnectionState, Listeners, Subscription, Topic, TransportEvent};

#[derive(Debug, Clone)]
enum Op {
    Subscribe(usize),
    /// Unsubscribe the nth subscription ever made, live or not
    Unsubscribe(usize),
}

fn events() -> [TransportEvent; 3] {
    [
        TransportEvent::StateChanged(ConnectionState::Open),
        TransportEvent::ReconnectScheduled { attempt: 1, delay: Duration::from_secs(1) },
        TransportEvent::ConnectionFailed { attempts: 3 },
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0..3usize).prop_map(Op::Subscribe),
        1 => (0..16usize).prop_map(Op::Unsubscribe),
    ]
}

proptest! {
    #[test]
    fn prop_dispatch_reaches_live_handlers(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let events = events();
        let mut listeners = Listeners::new();
        let mut made: Vec<(Subscription, bool)> = Vec::new();

        for op in ops {
            match op {
                Op::Subscribe(i) => {
                    let subscription = listeners.subscribe(events[i].topic(), |_| Ok(()));
                    made.push((subscription, true));
                },
                Op::Unsubscribe(n) => {
                    if let Some((subscription, live)) = made.get_mut(n) {
                        prop_assert_eq!(listeners.unsubscribe(*subscription), *live);
                        *live = false;
                    }
                },
            }

            for event in &events {
                let topic: Topic = event.topic();
                let expected = made.iter().filter(|(s, live)| *live && s.topic() == topic).count();
                prop_assert_eq!(listeners.dispatch(event), expected);
            }
            prop_assert_eq!(listeners.len(), made.iter().filter(|(_, live)| *live).count());
            prop_assert_eq!(listeners.is_empty(), listeners.len() == 0);
        }
    }
}
