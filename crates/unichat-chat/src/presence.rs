//! Peer presence, last writer wins on timestamp.

use std::collections::HashMap;

use unichat_proto::UserId;

/// Presence of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    /// Whether the user is online
    pub online: bool,
    /// Unix milliseconds of the update that set this
    pub updated_at: u64,
}

/// Presence of every known user.
#[derive(Debug, Clone, Default)]
pub struct PresenceBook {
    users: HashMap<UserId, Presence>,
}

impl PresenceBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Presence of `user`, if any update was seen.
    #[must_use]
    pub fn get(&self, user: &UserId) -> Option<Presence> {
        self.users.get(user).copied()
    }

    /// Apply an update stamped `updated_at`.
    ///
    /// Older updates are ignored; an equal timestamp accepts the later
    /// arrival. Returns `true` if the online flag changed.
    pub fn apply(&mut self, user: &UserId, online: bool, updated_at: u64) -> bool {
        match self.users.get_mut(user) {
            Some(current) if updated_at < current.updated_at => false,
            Some(current) => {
                let changed = current.online != online;
                *current = Presence { online, updated_at };
                changed
            },
            None => {
                self.users.insert(user.clone(), Presence { online, updated_at });
                true
            },
        }
    }
}
