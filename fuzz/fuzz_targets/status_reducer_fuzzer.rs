//! Fuzz target for the conversation status reducer
//!
//! Feed arbitrary sequences of receipts, deletions, incoming messages and
//! connection failures into a `ConversationState` holding a few optimistic
//! local messages.
//!
//! # Invariants
//!
//! - A message status only ever advances along the delivery order
//! - Deleted statuses are terminal and deleted messages keep no content
//! - Replaying any inbound frame changes nothing and reports nothing
//! - Message ids stay unique within the conversation

#![no_main]

use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use unichat_chat::{ConversationState, Message, MessageStatus};
use unichat_proto::{
    ConversationId, Frame, MessageId, Payload,
    payloads::{ChatMessage, DeleteNotice, DeleteScope, DeliveryReceipt, SeenReceipt},
};

const OWN_MESSAGES: u8 = 4;

#[derive(Debug, Clone, Arbitrary)]
enum ReducerOp {
    Delivered { message: u8 },
    /// Server ack carrying our client id, assigning a server id
    Acked { message: u8, server: u8 },
    Seen { message: u8 },
    Delete { message: u8, everyone: bool },
    Incoming { message: u8 },
    FailPending,
}

fn conv() -> ConversationId {
    "c1".into()
}

fn local_id(i: u8) -> MessageId {
    MessageId::new(format!("m{}", i % OWN_MESSAGES))
}

fn server_id(i: u8) -> MessageId {
    MessageId::new(format!("srv-{}", i % 8))
}

fn target(i: u8) -> MessageId {
    // Receipts may name a local or a server id
    if i & 0x80 == 0 { local_id(i) } else { server_id(i) }
}

fn frame(op: &ReducerOp) -> Option<Frame> {
    let payload = match *op {
        ReducerOp::Delivered { message } => Payload::MessageDelivered(DeliveryReceipt {
            message_id: target(message),
            conversation_id: conv(),
            client_message_id: None,
        }),
        ReducerOp::Acked { message, server } => Payload::MessageDelivered(DeliveryReceipt {
            message_id: server_id(server),
            conversation_id: conv(),
            client_message_id: Some(local_id(message)),
        }),
        ReducerOp::Seen { message } => Payload::MessageSeen(SeenReceipt {
            message_id: target(message),
            conversation_id: conv(),
            seen_by: "bob".into(),
        }),
        ReducerOp::Delete { message, everyone } => Payload::DeleteMessage(DeleteNotice {
            message_id: target(message),
            conversation_id: conv(),
            scope: if everyone { DeleteScope::ForEveryone } else { DeleteScope::ForMe },
        }),
        ReducerOp::Incoming { message } => Payload::Message(ChatMessage {
            id: MessageId::new(format!("in-{}", message % 4)),
            conversation_id: conv(),
            sender_id: "bob".into(),
            content: "hi".into(),
        }),
        ReducerOp::FailPending => return None,
    };
    Some(Frame::new(payload, 1))
}

fn statuses(state: &ConversationState<Instant>) -> HashMap<MessageId, MessageStatus> {
    state.messages(&conv()).iter().map(|m| (m.id.clone(), m.status)).collect()
}

fuzz_target!(|ops: Vec<ReducerOp>| {
    let now = Instant::now();
    let mut state = ConversationState::new("alice".into(), Duration::from_secs(1));
    for i in 0..OWN_MESSAGES {
        state.insert_local(Message::local(local_id(i), conv(), "alice".into(), "x".into(), 0));
    }

    for op in &ops {
        let before = statuses(&state);

        match frame(op) {
            Some(frame) => {
                state.apply_inbound(&frame, now);
                let after_first = state.messages(&conv()).to_vec();
                let replay = state.apply_inbound(&frame, now);
                assert!(replay.is_empty(), "replay of {op:?} emitted {replay:?}");
                assert_eq!(state.messages(&conv()), after_first.as_slice());
            },
            None => {
                state.fail_pending();
            },
        }

        for (message, after) in statuses(&state) {
            if let Some(&prior) = before.get(&message) {
                assert!(
                    prior == after || prior.advance(after) == Some(after),
                    "{message} went {prior} -> {after} on {op:?}"
                );
            }
        }

        let messages = state.messages(&conv());
        let ids: HashSet<_> = messages.iter().map(|m| &m.id).collect();
        assert_eq!(ids.len(), messages.len(), "duplicate message ids");
        for message in messages {
            if message.status.is_deleted() {
                assert!(message.content.is_empty());
            }
        }
    }
});
