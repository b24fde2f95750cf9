//! Frame type combining payload and sender timestamp.
//!
//! A `Frame` is one JSON object on the wire. The payload's fields and its
//! `type` tag are flattened into the top-level object next to `timestamp`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    EventKind, Payload,
    errors::{ProtocolError, Result},
};

/// Largest frame text accepted by [`Frame::decode`] (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Kind-specific body, including the `type` tag
    #[serde(flatten)]
    pub payload: Payload,

    /// Sender wall clock in Unix milliseconds
    pub timestamp: u64,
}

/// Outcome of decoding a frame.
///
/// Unknown kinds are not errors: newer servers may emit events this client
/// does not understand, and those are skipped rather than tearing down the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Recognized, well-formed frame
    Frame(Frame),
    /// Well-formed JSON object with an unrecognized `type`
    Unknown {
        /// The unrecognized tag
        kind: String,
    },
}

impl Frame {
    /// Create a frame stamped with `timestamp` (Unix ms).
    #[must_use]
    pub fn new(payload: Payload, timestamp: u64) -> Self {
        Self { payload, timestamp }
    }

    /// Event kind of the payload.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Serialize to a JSON text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if serialization fails (not expected for
    ///   well-typed payloads)
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::TooLarge` if `text` exceeds [`MAX_FRAME_SIZE`]
    /// - `ProtocolError::Malformed` if `text` is not a JSON object matching the
    ///   schema of its kind
    /// - `ProtocolError::MissingType` if the object has no string `type`
    pub fn decode(text: &str) -> Result<Decoded> {
        if text.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::TooLarge { size: text.len(), max: MAX_FRAME_SIZE });
        }

        let value: Value = serde_json::from_str(text)?;
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Err(ProtocolError::MissingType);
        };

        if EventKind::from_wire(tag).is_none() {
            return Ok(Decoded::Unknown { kind: tag.to_owned() });
        }

        let frame = serde_json::from_value(value)?;
        Ok(Decoded::Frame(frame))
    }
}
