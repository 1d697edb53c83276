use tracing::{debug, warn};
use uuid::Uuid;

use crate::domains::envelope::Envelope;
use crate::domains::message::{ChatAttachment, ChatChannel, ChatDeletion, ChatMessage, ChatMessageContent};
use crate::domains::presence::ChatPresence;
use crate::domains::user::ChatUser;
use crate::e2e::manager::KeyPairManager;
use crate::e2e::PublicKeys;
use crate::error::Result;
use crate::services::dispatcher::EventDispatcher;
use crate::services::presence::PresenceManager;
use crate::services::transport::TransportWrapper;

/// Flooding engine for one node.
///
/// Every inbound envelope not yet visited by this node is rebroadcast once
/// with the node added to its visited set. Independently of that, the
/// envelope's clock is merged and its items are dispatched. Each receipt
/// dispatches an addressed message at most once; a re-received envelope is
/// dispatched again, so consumers dedupe by message id if they need to.
///
/// The engine is not synchronized. Callers serialize access, see
/// [`crate::client::ChatController`].
pub struct DisseminationEngine {
    transport: TransportWrapper,
    keys: KeyPairManager,
    presence: PresenceManager,
    dispatcher: EventDispatcher,
    emit_all_received_chat_messages: bool,
}

impl DisseminationEngine {
    pub fn new(me: ChatUser, transport: TransportWrapper, keys: KeyPairManager) -> Self {
        let mut user = me;
        user.public_keys = Some(keys.public_keys());
        Self {
            transport,
            keys,
            presence: PresenceManager::new(ChatPresence::new(user)),
            dispatcher: EventDispatcher::new(),
            emit_all_received_chat_messages: false,
        }
    }

    /// Debug switch: dispatch every received chat message, including those
    /// addressed to other nodes and those that could not be decrypted.
    pub fn with_emit_all_received_chat_messages(mut self, enabled: bool) -> Self {
        self.emit_all_received_chat_messages = enabled;
        self
    }

    pub fn me(&self) -> &ChatUser {
        &self.presence.presence().user
    }

    pub fn presence(&self) -> &ChatPresence {
        self.presence.presence()
    }

    pub fn logical_clock(&self) -> u64 {
        self.presence.clock()
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    pub fn receive(&mut self, envelope: Envelope) {
        let me = self.me().id;

        if !envelope.has_visited(&me) {
            let forwarded = envelope.forwarded_by(me);
            debug!(
                visited = forwarded.visited_users.len(),
                "forwarding envelope"
            );
            self.transport.forward(&forwarded);
        }

        if let Some(clock) = envelope.logical_clock {
            self.merge_clock(clock);
        }

        for message in &envelope.added_chat_messages {
            if !message.is_received_by(me) && !self.emit_all_received_chat_messages {
                continue;
            }
            match self.decrypt_if_needed(message) {
                Ok(plain) => self.dispatcher.message_added(&plain),
                Err(err) if self.emit_all_received_chat_messages => {
                    debug!(message_id = %message.id, error = %err, "emitting undecrypted message");
                    self.dispatcher.message_added(message);
                }
                Err(err) => {
                    warn!(message_id = %message.id, error = %err, "dropping undecryptable message");
                }
            }
        }

        for presence in &envelope.updated_presences {
            self.dispatcher.presence_updated(presence);
        }

        for deletion in &envelope.delete_messages {
            self.dispatcher.message_deleted(deletion);
        }
    }

    /// Sends a chat message. A message on a direct channel is sealed for its
    /// members first. If any member's key is unknown, or the envelope does
    /// not fit the origination budget, the send is rejected and nothing
    /// changes.
    pub fn send(
        &mut self,
        content: String,
        channel: Option<ChatChannel>,
        attachments: Option<Vec<ChatAttachment>>,
        replied_to_message_id: Option<Uuid>,
    ) -> Result<ChatMessage> {
        let message = ChatMessage::new(
            self.me().clone(),
            ChatMessageContent::Text(content),
            channel,
            attachments,
            replied_to_message_id,
        );
        let outbound = self
            .keys
            .encrypt_if_needed(&message, |id| self.find_public_keys(id))?;

        let next = self.presence.incremented();
        let envelope = Envelope::from_sender(self.me().id, next.user.logical_clock)
            .with_chat_messages(vec![outbound]);
        self.transport.broadcast(&envelope)?;
        debug!(message_id = %message.id, clock = next.user.logical_clock, "sent chat message");
        self.update_presence(next);

        self.dispatcher.message_added(&message);
        Ok(message)
    }

    pub fn delete(&mut self, message_ids: Vec<Uuid>) -> Result<Vec<ChatDeletion>> {
        let deleted_by = self.me().id;
        let deletions: Vec<ChatDeletion> = message_ids
            .into_iter()
            .map(|message_id| ChatDeletion {
                message_id,
                deleted_by,
            })
            .collect();
        if deletions.is_empty() {
            return Ok(deletions);
        }

        let next = self.presence.incremented();
        let envelope = Envelope::from_sender(deleted_by, next.user.logical_clock)
            .with_deletions(deletions.clone());
        self.transport.broadcast(&envelope)?;
        self.update_presence(next);

        for deletion in &deletions {
            self.dispatcher.message_deleted(deletion);
        }
        Ok(deletions)
    }

    /// One heartbeat: bump the clock and broadcast only the presence record.
    /// A record too large to send leaves the clock where it was.
    pub fn broadcast_presence(&mut self) {
        let next = self.presence.incremented();
        debug!(
            status = ?next.status,
            info = %next.info,
            clock = next.user.logical_clock,
            "broadcasting presence"
        );
        let envelope = Envelope::from_sender(next.user.id, next.user.logical_clock)
            .with_presences(vec![next.clone()]);
        match self.transport.broadcast(&envelope) {
            Ok(()) => self.update_presence(next),
            Err(err) => warn!(error = %err, "skipping presence heartbeat"),
        }
    }

    /// The single path through which the local presence record changes.
    pub fn update_presence(&mut self, presence: ChatPresence) {
        let current = self.presence.replace(presence);
        self.dispatcher.presence_updated(current);
    }

    pub fn update_name(&mut self, name: String) {
        let next = self.presence.renamed(name);
        self.update_presence(next);
    }

    fn merge_clock(&mut self, received_clock: u64) {
        let next = self.presence.merged(received_clock);
        self.update_presence(next);
    }

    fn find_public_keys(&self, user_id: Uuid) -> Option<PublicKeys> {
        if user_id == self.me().id {
            return Some(self.keys.public_keys());
        }
        self.dispatcher.directory().find_public_keys(user_id)
    }

    fn decrypt_if_needed(&self, message: &ChatMessage) -> Result<ChatMessage> {
        self.keys
            .decrypt_if_needed(self.me().id, message, |id| self.find_public_keys(id))
    }
}
