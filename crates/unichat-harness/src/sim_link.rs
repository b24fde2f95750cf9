//! In-memory link with a scriptable server side.
//!
//! [`sim_link`] returns the two ends of one simulated connection. The
//! [`SimLink`] goes into the transport under test; the [`SimPeer`] stays with
//! the test and plays the server: it pushes inbound frames, inspects what was
//! transmitted, and injects faults.
//!
//! The link has no notion of latency. Faults are counted: `refuse_next(2)`
//! makes the next two opens fail and later opens succeed.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::Notify;
use unichat_client::{Link, LinkError};
use unichat_proto::{Decoded, Frame, UserId};

#[derive(Debug)]
enum Inbound {
    Text(String),
    Drop,
    Close,
}

#[derive(Debug, Default)]
struct Shared {
    open: bool,
    refuse_opens: u32,
    fail_sends: u32,
    open_attempts: u32,
    closes: u32,
    identities: Vec<UserId>,
    inbound: VecDeque<Inbound>,
    sent: Vec<String>,
}

#[derive(Debug, Default)]
struct Channel {
    shared: Mutex<Shared>,
    wake: Notify,
}

impl Channel {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, item: Inbound) {
        self.lock().inbound.push_back(item);
        self.wake.notify_one();
    }
}

/// Create a connected pair of link and peer.
#[must_use]
pub fn sim_link() -> (SimLink, SimPeer) {
    let channel = Arc::new(Channel::default());
    (SimLink { channel: Arc::clone(&channel) }, SimPeer { channel })
}

/// Client end of a simulated connection.
#[derive(Debug)]
pub struct SimLink {
    channel: Arc<Channel>,
}

impl SimLink {
    fn take_inbound(&self) -> Option<Option<Result<String, LinkError>>> {
        let mut shared = self.channel.lock();
        if !shared.open {
            return Some(None);
        }

        match shared.inbound.pop_front()? {
            Inbound::Text(text) => Some(Some(Ok(text))),
            Inbound::Drop => {
                shared.open = false;
                Some(Some(Err(LinkError::Io("connection reset by peer".into()))))
            },
            Inbound::Close => {
                shared.open = false;
                Some(None)
            },
        }
    }
}

impl Link for SimLink {
    async fn open(&mut self, identity: &UserId) -> Result<(), LinkError> {
        let mut shared = self.channel.lock();
        shared.open_attempts += 1;
        shared.identities.push(identity.clone());

        if shared.refuse_opens > 0 {
            shared.refuse_opens -= 1;
            tracing::trace!(%identity, "sim link refused open");
            return Err(LinkError::Connect("connection refused".into()));
        }

        shared.open = true;
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<(), LinkError> {
        let mut shared = self.channel.lock();
        if !shared.open {
            return Err(LinkError::Closed);
        }
        if shared.fail_sends > 0 {
            shared.fail_sends -= 1;
            shared.open = false;
            return Err(LinkError::Io("broken pipe".into()));
        }

        shared.sent.push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LinkError>> {
        loop {
            if let Some(item) = self.take_inbound() {
                return item;
            }
            self.channel.wake.notified().await;
        }
    }

    async fn close(&mut self) {
        let mut shared = self.channel.lock();
        if shared.open {
            shared.open = false;
            shared.closes += 1;
        }
        // Frames in flight die with the connection
        shared.inbound.clear();
    }
}

/// Server end of a simulated connection.
#[derive(Debug, Clone)]
pub struct SimPeer {
    channel: Arc<Channel>,
}

impl SimPeer {
    /// Deliver `frame` to the client.
    ///
    /// # Panics
    ///
    /// Panics if the frame cannot be encoded.
    #[allow(clippy::expect_used)]
    pub fn push(&self, frame: &Frame) {
        let text = frame.encode().expect("invariant: test frames encode");
        self.push_text(text);
    }

    /// Deliver raw text, e.g. malformed JSON or an unknown kind.
    pub fn push_text(&self, text: impl Into<String>) {
        self.channel.push(Inbound::Text(text.into()));
    }

    /// Fail the next `n` open attempts.
    pub fn refuse_next(&self, n: u32) {
        self.channel.lock().refuse_opens = n;
    }

    /// Fail the next `n` sends; each failure also breaks the link.
    pub fn fail_next_sends(&self, n: u32) {
        self.channel.lock().fail_sends = n;
    }

    /// Break the link abruptly, after frames already pushed.
    pub fn drop_link(&self) {
        if self.is_open() {
            self.channel.push(Inbound::Drop);
        }
    }

    /// Close the link cleanly from the server side, after frames already
    /// pushed.
    pub fn close_link(&self) {
        if self.is_open() {
            self.channel.push(Inbound::Close);
        }
    }

    /// Whether the link is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.channel.lock().open
    }

    /// Number of open attempts, successful or not.
    #[must_use]
    pub fn open_attempts(&self) -> u32 {
        self.channel.lock().open_attempts
    }

    /// Number of client-side closes of an open link.
    #[must_use]
    pub fn closes(&self) -> u32 {
        self.channel.lock().closes
    }

    /// Identity presented on each open attempt.
    #[must_use]
    pub fn identities(&self) -> Vec<UserId> {
        self.channel.lock().identities.clone()
    }

    /// Raw text the client transmitted, in order.
    #[must_use]
    pub fn sent_texts(&self) -> Vec<String> {
        self.channel.lock().sent.clone()
    }

    /// Frames the client transmitted, in order. Undecodable text is skipped.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.sent_texts()
            .iter()
            .filter_map(|text| match Frame::decode(text) {
                Ok(Decoded::Frame(frame)) => Some(frame),
                _ => None,
            })
            .collect()
    }
}
