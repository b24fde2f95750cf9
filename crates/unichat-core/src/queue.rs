//! Offline outbound queue.
//!
//! Frames sent while the link is not open wait here and are flushed in
//! enqueue order as soon as the link opens.

use std::collections::VecDeque;

use unichat_proto::{EventKind, Frame};

/// A frame waiting to be transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEntry<I> {
    /// Frame to transmit
    pub frame: Frame,
    /// When the caller handed the frame to the transport
    pub enqueued_at: I,
}

impl<I> OutboundEntry<I> {
    /// Event kind of the queued frame.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.frame.kind()
    }
}

/// FIFO of frames awaiting an open link.
///
/// # Invariants
///
/// - Entries leave in the order they entered, except that
///   [`Self::requeue_front`] restores previously drained entries ahead of
///   anything queued since
#[derive(Debug, Clone)]
pub struct OutboundQueue<I> {
    entries: VecDeque<OutboundEntry<I>>,
}

impl<I> Default for OutboundQueue<I> {
    fn default() -> Self {
        Self { entries: VecDeque::new() }
    }
}

impl<I> OutboundQueue<I> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame.
    pub fn push(&mut self, frame: Frame, enqueued_at: I) {
        self.entries.push_back(OutboundEntry { frame, enqueued_at });
    }

    /// Put entries that could not be transmitted back at the head, keeping
    /// their relative order.
    pub fn requeue_front(&mut self, entries: Vec<OutboundEntry<I>>) {
        for entry in entries.into_iter().rev() {
            self.entries.push_front(entry);
        }
    }

    /// Remove and return every entry in order.
    pub fn drain(&mut self) -> Vec<OutboundEntry<I>> {
        self.entries.drain(..).collect()
    }

    /// Number of queued frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries, head first.
    pub fn iter(&self) -> impl Iterator<Item = &OutboundEntry<I>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use unichat_proto::{Payload, payloads::TypingNotice};

    use super::*;

    fn frame(n: u64) -> Frame {
        Frame::new(
            Payload::Typing(TypingNotice { conversation_id: "c".into(), user_id: "u".into() }),
            n,
        )
    }

    fn stamps(entries: &[OutboundEntry<u32>]) -> Vec<u64> {
        entries.iter().map(|e| e.frame.timestamp).collect()
    }

    #[test]
    fn drains_in_enqueue_order() {
        let mut queue = OutboundQueue::new();
        for n in 1..=3 {
            queue.push(frame(n), 0u32);
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(stamps(&queue.drain()), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn requeue_goes_ahead_of_newer_entries() {
        let mut queue = OutboundQueue::new();
        queue.push(frame(1), 0u32);
        queue.push(frame(2), 0);
        let drained = queue.drain();

        queue.push(frame(3), 1);
        queue.requeue_front(drained);

        assert_eq!(stamps(&queue.drain()), vec![1, 2, 3]);
    }

    #[test]
    fn entry_kind_follows_frame() {
        let mut queue = OutboundQueue::new();
        queue.push(frame(1), 0u32);
        assert_eq!(queue.iter().next().map(OutboundEntry::kind), Some(EventKind::Typing));
    }
}
