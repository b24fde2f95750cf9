//! Terminal rendering of chat events.

use unichat_chat::{ChatEvent, ConversationState, Message, MessageStatus};
use unichat_core::MonotonicInstant;

/// One line describing `event`, or `None` if it is not worth showing.
pub fn event_line<I: MonotonicInstant>(
    state: &ConversationState<I>,
    event: &ChatEvent,
) -> Option<String> {
    match event {
        ChatEvent::MessageAdded { message_id, .. } => {
            let message = state.find(message_id)?;
            // Own messages were echoed when typed
            if message.sender_id == *state.user() {
                return None;
            }
            Some(message_line(message))
        },
        ChatEvent::MessageRekeyed { .. } | ChatEvent::Seeded { .. } => None,
        ChatEvent::StatusChanged { conversation_id, message_id, status } => {
            Some(format!("[{conversation_id}] {message_id} {}", status_label(*status)))
        },
        ChatEvent::PeerTyping { conversation_id, user_id, typing: true } => {
            Some(format!("[{conversation_id}] {user_id} is typing"))
        },
        ChatEvent::PeerTyping { typing: false, .. } => None,
        ChatEvent::PresenceChanged { user_id, online } => {
            Some(format!("{user_id} is {}", if *online { "online" } else { "offline" }))
        },
        ChatEvent::ActiveConversation(Some(id)) => Some(format!("opened {id}")),
        ChatEvent::ActiveConversation(None) => Some("closed conversation".to_owned()),
        ChatEvent::Connection(state) => Some(format!("connection {state}")),
        ChatEvent::Reconnecting { attempt, delay } => {
            Some(format!("reconnecting in {}ms (attempt {attempt})", delay.as_millis()))
        },
        ChatEvent::ConnectionFailed { attempts } => Some(format!(
            "gave up after {attempts} reconnect attempts, /reconnect to try again"
        )),
    }
}

/// A message as shown in the log and in `/history`.
pub fn message_line(message: &Message) -> String {
    if message.status.is_deleted() {
        let Message { conversation_id, id, sender_id, .. } = message;
        return format!("[{conversation_id}] {id} <{sender_id}> (deleted)");
    }
    format!(
        "[{}] {} <{}> {}",
        message.conversation_id, message.id, message.sender_id, message.content
    )
}

fn status_label(status: MessageStatus) -> &'static str {
    match status {
        MessageStatus::Sent => "sent",
        MessageStatus::SendFailed => "failed to send",
        MessageStatus::Delivered => "delivered",
        MessageStatus::Seen => "seen",
        MessageStatus::DeletedSelf => "deleted for you",
        MessageStatus::DeletedEveryone => "deleted for everyone",
    }
}
