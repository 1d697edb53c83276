use crate::domains::presence::ChatPresence;

/// Holds the node's authoritative presence record and its Lamport clock.
///
/// The methods that compute a next record never mutate; the engine applies
/// the result through [`PresenceManager::replace`] so every change goes
/// through one funnel.
pub struct PresenceManager {
    presence: ChatPresence,
}

impl PresenceManager {
    pub fn new(presence: ChatPresence) -> Self {
        Self { presence }
    }

    pub fn presence(&self) -> &ChatPresence {
        &self.presence
    }

    pub fn clock(&self) -> u64 {
        self.presence.user.logical_clock
    }

    pub fn incremented(&self) -> ChatPresence {
        let mut next = self.presence.clone();
        next.user.logical_clock = self.clock().saturating_add(1);
        next
    }

    pub fn merged(&self, received_clock: u64) -> ChatPresence {
        let mut next = self.presence.clone();
        next.user.logical_clock = self.clock().max(received_clock).saturating_add(1);
        next
    }

    pub fn renamed(&self, name: String) -> ChatPresence {
        let mut next = self.presence.clone();
        next.user.name = Some(name);
        next
    }

    /// Replaces the record wholesale. Identity and keys stay those of this
    /// node and the clock never moves backwards.
    pub fn replace(&mut self, mut presence: ChatPresence) -> &ChatPresence {
        presence.user.id = self.presence.user.id;
        presence.user.public_keys = self.presence.user.public_keys;
        presence.user.logical_clock = presence.user.logical_clock.max(self.clock());
        self.presence = presence;
        &self.presence
    }
}
