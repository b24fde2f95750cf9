//! Core
//!
//! Sans-IO building blocks for the unichat transport: the connection state
//! machine, reconnect backoff, the offline outbound queue, and the
//! environment abstraction that keeps time and randomness injectable.
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O. Methods take the current instant as a
//! parameter and return [`ConnectionAction`]s that a driver executes: open a
//! link, transmit a frame, close the link, or notify listeners. The async
//! driver lives in `unichat-client`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod connection;
pub mod env;
pub mod error;
pub mod event;
pub mod queue;

pub use backoff::BackoffPolicy;
pub use connection::{Connection, ConnectionAction, ConnectionState, TransportConfig};
pub use env::{Environment, MAX_TIMER, MonotonicInstant};
pub use error::ConnectionError;
pub use event::{Topic, TransportEvent};
pub use queue::{OutboundEntry, OutboundQueue};
