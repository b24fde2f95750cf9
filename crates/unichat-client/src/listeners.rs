//! Listener registry keyed by [`Topic`].
//!
//! Handlers for one topic run in registration order. A handler that returns
//! an error or panics is logged and skipped; the remaining handlers still run
//! and the registry stays usable.

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
};

use thiserror::Error;
use unichat_core::{Topic, TransportEvent};

/// Failure reported by a listener.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("handler failed: {0}")]
pub struct HandlerError(pub String);

impl From<&str> for HandlerError {
    fn from(reason: &str) -> Self {
        Self(reason.to_owned())
    }
}

impl From<String> for HandlerError {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

/// Listener return type.
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Box<dyn FnMut(&TransportEvent) -> HandlerResult + Send>;

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    topic: Topic,
    id: u64,
}

impl Subscription {
    /// Topic this subscription listens on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// Registered listeners.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    by_topic: HashMap<Topic, Vec<(u64, Handler)>>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("count", &self.len()).finish()
    }
}

impl Listeners {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`.
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> Subscription
    where
        F: FnMut(&TransportEvent) -> HandlerResult + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.by_topic.entry(topic).or_default().push((id, Box::new(handler)));

        Subscription { topic, id }
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let Some(handlers) = self.by_topic.get_mut(&subscription.topic) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription.id);
        let removed = handlers.len() != before;

        if handlers.is_empty() {
            self.by_topic.remove(&subscription.topic);
        }
        removed
    }

    /// Run every handler registered for the event's topic.
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn dispatch(&mut self, event: &TransportEvent) -> usize {
        let topic = event.topic();
        let Some(handlers) = self.by_topic.get_mut(&topic) else {
            return 0;
        };

        let mut succeeded = 0;
        for (id, handler) in handlers.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(err)) => {
                    tracing::warn!(?topic, listener = id, %err, "listener failed");
                },
                Err(_) => {
                    tracing::warn!(?topic, listener = id, "listener panicked");
                },
            }
        }
        succeeded
    }

    /// Remove every handler.
    pub fn clear(&mut self) {
        self.by_topic.clear();
    }

    /// Total registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_topic.values().map(Vec::len).sum()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_topic.is_empty()
    }
}
