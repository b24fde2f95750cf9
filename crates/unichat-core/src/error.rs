//! Connection errors.

use thiserror::Error;

use crate::ConnectionState;

/// Errors surfaced by the connection state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Link could not be opened on an explicit `connect`/`reconnect`
    #[error("link failed to open: {0}")]
    Link(String),

    /// Operation not valid in the current state
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Current connection state
        state: ConnectionState,
        /// Attempted operation
        operation: &'static str,
    },

    /// Automatic reconnection gave up
    #[error("reconnection gave up after {attempts} attempts")]
    Exhausted {
        /// Reconnect attempts made before giving up
        attempts: u32,
    },
}

impl ConnectionError {
    /// Whether a later retry of the same operation may succeed.
    ///
    /// Link failures are transient. Invalid-state errors and exhaustion need
    /// the caller to change something first.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Link(_))
    }
}
