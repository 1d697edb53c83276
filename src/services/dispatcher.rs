use std::sync::Arc;

use crate::domains::message::{ChatDeletion, ChatMessage};
use crate::domains::presence::ChatPresence;
use crate::interfaces::directory::UserDirectory;
use crate::services::directory::DirectoryResolver;

pub type MessageHandler = Arc<dyn Fn(&ChatMessage) + Send + Sync>;
pub type PresenceHandler = Arc<dyn Fn(&ChatPresence) + Send + Sync>;
pub type DeletionHandler = Arc<dyn Fn(&ChatDeletion) + Send + Sync>;

/// Handle returned on registration, used to remove the consumer again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

pub enum Subscription {
    MessageAdded(MessageHandler),
    PresenceUpdated(PresenceHandler),
    MessageDeleted(DeletionHandler),
    IdentityLookup(Arc<dyn UserDirectory>),
}

struct Registry<H> {
    entries: Vec<(SubscriptionId, H)>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> Registry<H> {
    fn push(&mut self, id: SubscriptionId, handler: H) {
        self.entries.push((id, handler));
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    fn handlers(&self) -> impl Iterator<Item = &H> {
        self.entries.iter().map(|(_, handler)| handler)
    }
}

/// Synchronous, in-order fan-out of decoded events to registered consumers.
#[derive(Default)]
pub struct EventDispatcher {
    next_id: u64,
    message_added: Registry<MessageHandler>,
    presence_updated: Registry<PresenceHandler>,
    message_deleted: Registry<DeletionHandler>,
    directory: DirectoryResolver,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscription: Subscription) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId::new(self.next_id);
        self.insert(id, subscription);
        id
    }

    /// Registers under an id allocated by the caller.
    pub(crate) fn insert(&mut self, id: SubscriptionId, subscription: Subscription) {
        match subscription {
            Subscription::MessageAdded(handler) => self.message_added.push(id, handler),
            Subscription::PresenceUpdated(handler) => self.presence_updated.push(id, handler),
            Subscription::MessageDeleted(handler) => self.message_deleted.push(id, handler),
            Subscription::IdentityLookup(provider) => self.directory.register(id, provider),
        }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.message_added.remove(id)
            || self.presence_updated.remove(id)
            || self.message_deleted.remove(id)
            || self.directory.remove(id)
    }

    pub fn on_message_added<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.subscribe(Subscription::MessageAdded(Arc::new(handler)))
    }

    pub fn on_presence_updated<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatPresence) + Send + Sync + 'static,
    {
        self.subscribe(Subscription::PresenceUpdated(Arc::new(handler)))
    }

    pub fn on_message_deleted<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatDeletion) + Send + Sync + 'static,
    {
        self.subscribe(Subscription::MessageDeleted(Arc::new(handler)))
    }

    pub fn on_identity_lookup<D>(&mut self, provider: D) -> SubscriptionId
    where
        D: UserDirectory + 'static,
    {
        self.subscribe(Subscription::IdentityLookup(Arc::new(provider)))
    }

    pub fn directory(&self) -> &DirectoryResolver {
        &self.directory
    }

    pub fn message_added(&self, message: &ChatMessage) {
        for handler in self.message_added.handlers() {
            handler(message);
        }
    }

    pub fn presence_updated(&self, presence: &ChatPresence) {
        for handler in self.presence_updated.handlers() {
            handler(presence);
        }
    }

    pub fn message_deleted(&self, deletion: &ChatDeletion) {
        for handler in self.message_deleted.handlers() {
            handler(deletion);
        }
    }
}
