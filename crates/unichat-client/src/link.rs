//! Link trait for abstracting the network connection.
//!
//! The [`Link`] trait decouples [`crate::Transport`] from a specific network
//! stack. Production uses a WebSocket; tests use an in-memory link with
//! scripted failures.

use std::future::Future;

use thiserror::Error;
use unichat_proto::UserId;

/// Link I/O errors.
///
/// Never surfaced per operation once the transport is open: a failing link
/// is handled as transient link loss and goes down the reconnect path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Link could not be established
    #[error("connect failed: {0}")]
    Connect(String),

    /// Established link failed
    #[error("link error: {0}")]
    Io(String),

    /// Operation on a link that is not open
    #[error("link is closed")]
    Closed,
}

/// Bidirectional text-frame connection to the message server.
///
/// # Invariants
///
/// - [`Self::recv`] MUST be cancel-safe: dropping its future before it
///   completes loses no frame
/// - After [`Self::close`] the link can be opened again
pub trait Link: Send {
    /// Open the link, authenticating as `identity`.
    fn open(&mut self, identity: &UserId) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Write one text frame.
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Next inbound text frame.
    ///
    /// `None` means the peer closed the link.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, LinkError>>> + Send;

    /// Close the link. Closing a closed link is a no-op.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
