//! Typing indicators.
//!
//! [`TypingDebouncer`] turns the local user's keystrokes into `typing` and
//! `stop-typing` commands with a reset-on-activity window. [`PeerTyping`]
//! tracks remote users' indicators and expires them when no refresh arrives.

use std::{collections::HashMap, time::Duration};

use unichat_core::MonotonicInstant;
use unichat_proto::{ConversationId, UserId};

/// Command produced by the debouncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingSignal {
    /// Announce typing in this conversation
    Start(ConversationId),
    /// Announce that typing stopped in this conversation
    Stop(ConversationId),
}

/// Reset-on-activity debounce for the local user's typing state.
///
/// # Invariants
///
/// - Exactly one `Start` per typing burst, however many keystrokes it has
/// - Every `Start` is followed by exactly one `Stop` unless [`Self::cancel`]
///   drops the burst
#[derive(Debug, Clone)]
pub struct TypingDebouncer<I> {
    window: Duration,
    active: Option<(ConversationId, I)>,
}

impl<I: MonotonicInstant> TypingDebouncer<I> {
    /// Create a debouncer whose burst ends `window` after the last keystroke.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, active: None }
    }

    /// Conversation of the current burst.
    #[must_use]
    pub fn conversation(&self) -> Option<&ConversationId> {
        self.active.as_ref().map(|(conversation, _)| conversation)
    }

    /// When the current burst ends if no keystroke arrives.
    #[must_use]
    pub fn deadline(&self) -> Option<I> {
        self.active.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Keystroke in `conversation`.
    ///
    /// Starts a burst or extends the current one. A keystroke in a different
    /// conversation stops the old burst first.
    pub fn keystroke(&mut self, conversation: &ConversationId, now: I) -> Vec<TypingSignal> {
        let deadline = now.after(self.window);

        if let Some((current, expires)) = self.active.as_mut() {
            if current == conversation {
                *expires = deadline;
                return Vec::new();
            }
        }

        let mut signals: Vec<_> = self.stop().into_iter().collect();
        self.active = Some((conversation.clone(), deadline));
        signals.push(TypingSignal::Start(conversation.clone()));
        signals
    }

    /// End the current burst now.
    pub fn stop(&mut self) -> Option<TypingSignal> {
        self.active.take().map(|(conversation, _)| TypingSignal::Stop(conversation))
    }

    /// End the burst if its window elapsed.
    pub fn tick(&mut self, now: I) -> Option<TypingSignal> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.stop(),
            _ => None,
        }
    }

    /// Drop the burst without a `Stop`.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

/// Remote typing indicators keyed by (conversation, peer).
#[derive(Debug, Clone)]
pub struct PeerTyping<I> {
    timeout: Duration,
    expires: HashMap<(ConversationId, UserId), I>,
}

impl<I: MonotonicInstant> PeerTyping<I> {
    /// Create a tracker whose indicators expire `timeout` after the last
    /// refresh.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, expires: HashMap::new() }
    }

    /// Whether `peer` is typing in `conversation`.
    #[must_use]
    pub fn is_typing(&self, conversation: &ConversationId, peer: &UserId) -> bool {
        self.expires.contains_key(&(conversation.clone(), peer.clone()))
    }

    /// Earliest expiry.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.expires.values().min().copied()
    }

    /// Typing event from `peer`. Returns `true` if the peer was not typing.
    pub fn refresh(&mut self, conversation: ConversationId, peer: UserId, now: I) -> bool {
        self.expires.insert((conversation, peer), now.after(self.timeout)).is_none()
    }

    /// Clear an indicator. Returns `true` if the peer was typing.
    pub fn clear(&mut self, conversation: &ConversationId, peer: &UserId) -> bool {
        self.expires.remove(&(conversation.clone(), peer.clone())).is_some()
    }

    /// Remove every indicator that expired by `now`, in a stable order.
    pub fn expire(&mut self, now: I) -> Vec<(ConversationId, UserId)> {
        let mut expired: Vec<_> = self
            .expires
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        expired.sort();

        for key in &expired {
            self.expires.remove(key);
        }
        expired
    }

    /// Remove every indicator, in a stable order.
    pub fn clear_all(&mut self) -> Vec<(ConversationId, UserId)> {
        let mut all: Vec<_> = self.expires.drain().map(|(key, _)| key).collect();
        all.sort();
        all
    }
}
