use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::domains::presence::ChatPresence;
use crate::domains::user::ChatUser;
use crate::e2e::PublicKeys;
use crate::interfaces::directory::UserDirectory;
use crate::services::dispatcher::SubscriptionId;

/// Ordered chain of lookup providers. Providers are asked in registration
/// order and the first answer wins.
#[derive(Default)]
pub struct DirectoryResolver {
    providers: Vec<(SubscriptionId, Arc<dyn UserDirectory>)>,
}

impl DirectoryResolver {
    pub(crate) fn register(&mut self, id: SubscriptionId, provider: Arc<dyn UserDirectory>) {
        self.providers.push((id, provider));
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.providers.len();
        self.providers.retain(|(existing, _)| *existing != id);
        self.providers.len() != before
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn find_user(&self, user_id: Uuid) -> Option<ChatUser> {
        self.providers
            .iter()
            .find_map(|(_, provider)| provider.find_user(user_id))
    }

    pub fn find_public_keys(&self, user_id: Uuid) -> Option<PublicKeys> {
        self.find_user(user_id).and_then(|user| user.public_keys)
    }
}

/// Latest known presence per peer, fed from presence updates.
#[derive(Clone, Default)]
pub struct PresenceDirectory {
    presences: Arc<RwLock<HashMap<Uuid, ChatPresence>>>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `presence` unless a record with a higher clock is already known.
    pub fn observe(&self, presence: &ChatPresence) {
        let mut presences = self
            .presences
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stale = presences
            .get(&presence.user.id)
            .is_some_and(|known| known.user.logical_clock > presence.user.logical_clock);
        if !stale {
            presences.insert(presence.user.id, presence.clone());
        }
    }

    pub fn presence(&self, user_id: Uuid) -> Option<ChatPresence> {
        self.presences
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    /// Known peers in a stable order.
    pub fn nearby(&self) -> Vec<ChatPresence> {
        let mut nearby: Vec<ChatPresence> = self
            .presences
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        nearby.sort_by_key(|presence| presence.user.id);
        nearby
    }

    pub fn len(&self) -> usize {
        self.presences
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserDirectory for PresenceDirectory {
    fn find_user(&self, user_id: Uuid) -> Option<ChatUser> {
        self.presence(user_id).map(|presence| presence.user)
    }
}
