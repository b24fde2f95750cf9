//! Deterministic simulation harness for unichat testing.
//!
//! In-memory implementations of the Environment and Link traits for
//! reproducible tests on tokio's paused clock.
//!
//! # Components
//!
//! - [`SimEnv`]: Seeded RNG, `tokio::time` instants and a virtual wall clock
//! - [`sim_link`]: A [`SimLink`] for the transport and a [`SimPeer`] handle
//!   that plays the server: it injects frames, refuses opens, fails sends,
//!   and drops the link
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties of a running session
//! against a [`SessionSnapshot`]. Use [`InvariantRegistry::standard()`] for
//! the common transport and chat invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_env;
pub mod sim_link;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, LinkOnlyWhenOpen, QueueDrainedWhenOpen,
    SessionObserver, SessionSnapshot, StatusMonotonicity, TransmitOrder, Violation,
};
pub use sim_env::SimEnv;
pub use sim_link::{SimLink, SimPeer, sim_link};
