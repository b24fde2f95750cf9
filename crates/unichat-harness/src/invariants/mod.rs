//! Invariant checking for simulated sessions.
//!
//! Invariants are properties that must hold whenever the session is
//! quiescent (between driver calls), whatever faults the peer injected.
//!
//! # Architecture
//!
//! A [`SessionObserver`] extracts observable state from a running
//! `Runtime` and its [`crate::SimPeer`] into a [`SessionSnapshot`], keeping
//! per-message status history across snapshots. Registered [`Invariant`]s
//! are then checked against the snapshot.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = observer.snapshot(&runtime, &peer);
//! registry.assert_all(&snapshot, "after reconnect");
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{LinkOnlyWhenOpen, QueueDrainedWhenOpen, StatusMonotonicity, TransmitOrder};
pub use snapshot::{SessionObserver, SessionSnapshot};

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Check that failed
    pub invariant: &'static str,
    /// What the snapshot showed
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property every quiescent session snapshot satisfies.
pub trait Invariant: Send + Sync {
    /// Short name used in violation reports.
    fn name(&self) -> &'static str;

    /// Check `snapshot`.
    fn check(&self, snapshot: &SessionSnapshot) -> InvariantResult;
}

/// Set of session checks run together.
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Registry with no checks.
    #[must_use]
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Registry with every session check:
    /// - [`LinkOnlyWhenOpen`]: the link is up only in the `Open` state
    /// - [`QueueDrainedWhenOpen`]: nothing waits in the queue while open
    /// - [`TransmitOrder`]: messages reach the wire once, in send order
    /// - [`StatusMonotonicity`]: message statuses never regress
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(LinkOnlyWhenOpen);
        registry.add(QueueDrainedWhenOpen);
        registry.add(TransmitOrder);
        registry.add(StatusMonotonicity);
        registry
    }

    /// Register another check.
    pub fn add<I: Invariant + 'static>(&mut self, check: I) {
        self.checks.push(Box::new(check));
    }

    /// Run every check against `snapshot`.
    ///
    /// # Errors
    ///
    /// Every violation found, in registration order.
    pub fn check_all(&self, snapshot: &SessionSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.checks.iter().filter_map(|check| check.check(snapshot).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Run every check, panicking with `context` on any violation.
    ///
    /// # Panics
    ///
    /// If any check fails.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, snapshot: &SessionSnapshot, context: &str) {
        if let Err(violations) = self.check_all(snapshot) {
            let report: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("session invariants broken {context}:\n  {}", report.join("\n  "));
        }
    }
}
