//! Client
//!
//! Async driver for the unichat transport. [`Transport`] executes the actions
//! of the sans-IO [`unichat_core::Connection`] against a pluggable [`Link`],
//! dispatches inbound frames and lifecycle events to registered listeners,
//! and runs the reconnect timer.
//!
//! # Links
//!
//! - [`WsLink`]: WebSocket link over tokio-tungstenite (`websocket` feature)
//! - `unichat_harness::SimLink`: in-memory link for deterministic tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod link;
mod listeners;
mod system_env;
mod transport;
#[cfg(feature = "websocket")]
mod websocket;

pub use link::{Link, LinkError};
pub use listeners::{HandlerError, HandlerResult, Listeners, Subscription};
pub use system_env::SystemEnv;
pub use transport::{Connected, Polled, Transport};
pub use unichat_core::{
    BackoffPolicy, ConnectionError, ConnectionState, Topic, TransportConfig, TransportEvent,
};
#[cfg(feature = "websocket")]
pub use websocket::WsLink;
