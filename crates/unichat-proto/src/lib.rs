//! Wire protocol for unichat real-time messaging.
//!
//! Every event travels as one JSON text frame over a persistent full-duplex
//! socket:
//!
//! ```text
//! { "type": "<kind>", ...kind-specific fields..., "timestamp": <epoch-ms> }
//! ```
//!
//! The `type` tag selects a [`Payload`] variant. Field names are camelCase on
//! the wire and snake_case in Rust.
//!
//! # Components
//!
//! - [`EventKind`]: The closed set of recognized event kinds
//! - [`Payload`]: Tagged union of kind-specific bodies
//! - [`Frame`]: Payload plus sender timestamp, with encode/decode
//! - [`Decoded`]: Decode result that keeps unknown kinds distinguishable from
//!   malformed input

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
mod frame;
mod ids;
mod kind;
pub mod payloads;

pub use errors::ProtocolError;
pub use frame::{Decoded, Frame, MAX_FRAME_SIZE};
pub use ids::{ConversationId, MessageId, UserId};
pub use kind::EventKind;
pub use payloads::Payload;
