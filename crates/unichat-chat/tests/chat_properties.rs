//! Property-based tests for the conversation reducer and typing debounce.
//!
//! These verify properties that must hold for any sequence of server events,
//! including duplicated, reordered, and contradictory ones.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use proptest::prelude::*;
use unichat_chat::{ConversationState, Message, MessageStatus, TypingDebouncer, TypingSignal};
use unichat_proto::{
    ConversationId, Frame, MessageId, Payload,
    payloads::{ChatMessage, DeleteNotice, DeleteScope, DeliveryReceipt, SeenReceipt},
};

const OWN_MESSAGES: usize = 4;
const WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
enum Inbound {
    Delivered(usize),
    Seen(usize),
    Delete(usize, bool),
    Incoming(usize),
}

fn inbound() -> impl Strategy<Value = Inbound> {
    prop_oneof![
        (0..OWN_MESSAGES).prop_map(Inbound::Delivered),
        (0..OWN_MESSAGES).prop_map(Inbound::Seen),
        (0..OWN_MESSAGES, any::<bool>()).prop_map(|(i, everyone)| Inbound::Delete(i, everyone)),
        (0..3usize).prop_map(Inbound::Incoming),
    ]
}

fn conv() -> ConversationId {
    "c1".into()
}

fn id(i: usize) -> MessageId {
    MessageId::new(format!("m{i}"))
}

fn frame(op: &Inbound) -> Frame {
    let payload = match *op {
        Inbound::Delivered(i) => Payload::MessageDelivered(DeliveryReceipt {
            message_id: id(i),
            conversation_id: conv(),
            client_message_id: None,
        }),
        Inbound::Seen(i) => Payload::MessageSeen(SeenReceipt {
            message_id: id(i),
            conversation_id: conv(),
            seen_by: "bob".into(),
        }),
        Inbound::Delete(i, everyone) => Payload::DeleteMessage(DeleteNotice {
            message_id: id(i),
            conversation_id: conv(),
            scope: if everyone { DeleteScope::ForEveryone } else { DeleteScope::ForMe },
        }),
        Inbound::Incoming(i) => Payload::Message(ChatMessage {
            id: MessageId::new(format!("in-{i}")),
            conversation_id: conv(),
            sender_id: "bob".into(),
            content: "hi".into(),
        }),
    };
    Frame::new(payload, 1)
}

/// Server events about one own message, which the server calls `srv-1`.
#[derive(Debug, Clone, Copy)]
enum Receipt {
    /// Delivery carrying our client id
    Keyed,
    /// Delivery under the canonical id only
    Unkeyed,
    Seen,
    /// The server's copy of our own message
    Echo,
}

/// The keyed delivery plus any of the others, in any order.
fn receipts() -> impl Strategy<Value = Vec<Receipt>> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_flat_map(|(unkeyed, seen, echo)| {
        let mut receipts = vec![Receipt::Keyed];
        receipts.extend(unkeyed.then_some(Receipt::Unkeyed));
        receipts.extend(seen.then_some(Receipt::Seen));
        receipts.extend(echo.then_some(Receipt::Echo));
        Just(receipts).prop_shuffle()
    })
}

fn receipt_frame(receipt: Receipt) -> Frame {
    let canonical = MessageId::new("srv-1");
    let payload = match receipt {
        Receipt::Keyed | Receipt::Unkeyed => Payload::MessageDelivered(DeliveryReceipt {
            message_id: canonical,
            conversation_id: conv(),
            client_message_id: matches!(receipt, Receipt::Keyed).then(|| id(0)),
        }),
        Receipt::Seen => Payload::MessageSeen(SeenReceipt {
            message_id: canonical,
            conversation_id: conv(),
            seen_by: "bob".into(),
        }),
        Receipt::Echo => Payload::Message(ChatMessage {
            id: canonical,
            conversation_id: conv(),
            sender_id: "alice".into(),
            content: "x".into(),
        }),
    };
    Frame::new(payload, 1)
}

fn statuses(state: &ConversationState<Instant>) -> HashMap<MessageId, MessageStatus> {
    state.messages(&conv()).iter().map(|m| (m.id.clone(), m.status)).collect()
}

proptest! {
    /// Replaying any frame immediately changes nothing and reports nothing.
    #[test]
    fn prop_inbound_is_idempotent(ops in prop::collection::vec(inbound(), 1..40)) {
        let now = Instant::now();
        let mut state = ConversationState::new("alice".into(), WINDOW);
        for i in 0..OWN_MESSAGES {
            state.insert_local(Message::local(id(i), conv(), "alice".into(), "x".into(), 0));
        }

        for op in &ops {
            let frame = frame(op);
            state.apply_inbound(&frame, now);
            let after_first = state.messages(&conv()).to_vec();

            let replay = state.apply_inbound(&frame, now);

            prop_assert!(replay.is_empty(), "replay of {:?} emitted {:?}", op, replay);
            prop_assert_eq!(state.messages(&conv()), after_first.as_slice());
        }
    }

    /// Every status change is a legal advance, whatever the event order.
    #[test]
    fn prop_status_never_regresses(ops in prop::collection::vec(inbound(), 1..60)) {
        let now = Instant::now();
        let mut state = ConversationState::new("alice".into(), WINDOW);
        for i in 0..OWN_MESSAGES {
            state.insert_local(Message::local(id(i), conv(), "alice".into(), "x".into(), 0));
        }

        for op in &ops {
            let before = statuses(&state);
            state.apply_inbound(&frame(op), now);

            for (message, after) in statuses(&state) {
                if let Some(&prior) = before.get(&message) {
                    prop_assert!(
                        prior == after || prior.advance(after) == Some(after),
                        "{} went {} → {} on {:?}", message, prior, after, op
                    );
                }
            }
        }

        // Deleted messages keep no content
        for message in state.messages(&conv()) {
            if message.status.is_deleted() {
                prop_assert!(message.content.is_empty());
            }
        }
    }

    /// However the server orders its events about one message, the result
    /// is a single message under the canonical id at the highest status
    /// reported, and replaying everything changes nothing.
    #[test]
    fn prop_receipt_order_does_not_matter(receipts in receipts()) {
        let now = Instant::now();
        let mut state = ConversationState::new("alice".into(), WINDOW);
        state.insert_local(Message::local(id(0), conv(), "alice".into(), "x".into(), 0));

        for receipt in &receipts {
            state.apply_inbound(&receipt_frame(*receipt), now);
        }

        let messages = state.messages(&conv());
        prop_assert_eq!(messages.len(), 1, "{:?} left {:?}", receipts, messages);
        prop_assert_eq!(&messages[0].id, &MessageId::new("srv-1"));
        prop_assert_eq!(&messages[0].client_id, &Some(id(0)));
        let expected = if receipts.iter().any(|r| matches!(r, Receipt::Seen)) {
            MessageStatus::Seen
        } else {
            MessageStatus::Delivered
        };
        prop_assert_eq!(messages[0].status, expected, "after {:?}", receipts);

        let settled = messages.to_vec();
        for receipt in &receipts {
            let replay = state.apply_inbound(&receipt_frame(*receipt), now);
            prop_assert!(replay.is_empty(), "replay of {:?} emitted {:?}", receipt, replay);
        }
        prop_assert_eq!(state.messages(&conv()), settled.as_slice());
    }

    /// A burst is any run of keystrokes with gaps shorter than the window:
    /// exactly one start and one stop per burst.
    #[test]
    fn prop_debounce_one_start_per_burst(gaps in prop::collection::vec(0u64..2500, 1..30)) {
        let t0 = Instant::now();
        let mut debouncer = TypingDebouncer::new(WINDOW);
        let conversation = conv();

        let mut at = t0;
        let mut signals = Vec::new();
        for gap in &gaps {
            at += Duration::from_millis(*gap);
            signals.extend(debouncer.tick(at));
            signals.extend(debouncer.keystroke(&conversation, at));
        }
        signals.extend(debouncer.tick(at + WINDOW));

        let starts = signals.iter().filter(|s| matches!(s, TypingSignal::Start(_))).count();
        let stops = signals.iter().filter(|s| matches!(s, TypingSignal::Stop(_))).count();
        let pauses = gaps.iter().skip(1).filter(|gap| Duration::from_millis(**gap) >= WINDOW);
        let bursts = 1 + pauses.count();

        prop_assert_eq!(starts, bursts);
        prop_assert_eq!(stops, bursts);
        prop_assert!(matches!(signals.first(), Some(TypingSignal::Start(_))));
        prop_assert!(matches!(signals.last(), Some(TypingSignal::Stop(_))));
    }
}
