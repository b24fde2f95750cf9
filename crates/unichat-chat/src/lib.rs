//! Conversation state machine for unichat.
//!
//! Sits on top of the transport and turns wire events into conversation
//! state a UI can render: messages with monotone delivery status, typing
//! indicators, and presence.
//!
//! # Components
//!
//! - [`ConversationState`]: Pure reducer over inbound frames
//! - [`Chat`]: Validates UI commands and produces outbound payloads
//! - [`TypingDebouncer`] / [`PeerTyping`]: Local and remote typing timers
//! - [`Runtime`]: Drives a [`Chat`] over a live [`unichat_client::Transport`]
//!
//! # Status order
//!
//! ```text
//! Sent ─┬─▶ Delivered ──▶ Seen
//!       └─▶ SendFailed ─▶ Delivered ──▶ Seen
//!
//! any live status ──▶ DeletedSelf | DeletedEveryone   (terminal)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chat;
pub mod conversation;
pub mod error;
pub mod message;
pub mod presence;
pub mod runtime;
pub mod typing;

pub use chat::{Chat, ChatAction, ChatConfig, MAX_CONTENT_LEN};
pub use conversation::{ChatEvent, Conversation, ConversationState};
pub use error::ChatError;
pub use message::{Message, MessageStatus, MessageType};
pub use presence::{Presence, PresenceBook};
pub use runtime::{Runtime, Step};
pub use typing::{PeerTyping, TypingDebouncer, TypingSignal};
