use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::NodeConfig;
use crate::domains::envelope::Envelope;
use crate::domains::message::{ChatAttachment, ChatChannel, ChatDeletion, ChatMessage};
use crate::domains::presence::ChatPresence;
use crate::domains::user::ChatUser;
use crate::e2e::manager::KeyPairManager;
use crate::error::{FloodChatError, Result};
use crate::interfaces::directory::UserDirectory;
use crate::interfaces::transport::ChatTransport;
use crate::services::codec::EnvelopeCodec;
use crate::services::directory::PresenceDirectory;
use crate::services::dispatcher::{Subscription, SubscriptionId};
use crate::services::dissemination::DisseminationEngine;
use crate::services::transport::TransportWrapper;

enum Command {
    Receive(Envelope),
    Send {
        content: String,
        channel: Option<ChatChannel>,
        attachments: Option<Vec<ChatAttachment>>,
        replied_to_message_id: Option<Uuid>,
        respond_to: oneshot::Sender<Result<ChatMessage>>,
    },
    Delete {
        message_ids: Vec<Uuid>,
        respond_to: oneshot::Sender<Result<Vec<ChatDeletion>>>,
    },
    UpdatePresence(ChatPresence),
    UpdateName(String),
    Subscribe(SubscriptionId, Subscription),
    Unsubscribe(SubscriptionId),
}

/// Public surface of a chat node.
///
/// One task owns the [`DisseminationEngine`]; inbound payloads, the presence
/// heartbeat and every call on this handle are queued into it, so engine
/// state is only ever touched from that task. Consumers run on that task
/// too and must not block on this controller.
///
/// Dropping the controller stops the task and its heartbeat.
pub struct ChatController {
    cmd_tx: mpsc::UnboundedSender<Command>,
    presence_rx: watch::Receiver<ChatPresence>,
    next_subscription: AtomicU64,
    task: Option<JoinHandle<()>>,
}

impl ChatController {
    /// Spawns the node on the current tokio runtime with a fresh key pair.
    pub fn start(me: ChatUser, transport: Arc<dyn ChatTransport>, config: &NodeConfig) -> Self {
        Self::start_with_keys(me, transport, KeyPairManager::generate(), config)
    }

    pub fn start_with_keys(
        mut me: ChatUser,
        transport: Arc<dyn ChatTransport>,
        keys: KeyPairManager,
        config: &NodeConfig,
    ) -> Self {
        if me.name.is_none() {
            me.name = config.name.clone();
        }
        let wrapper = TransportWrapper::new(
            transport,
            EnvelopeCodec::new(config.max_envelope_bytes()),
        );
        let engine = DisseminationEngine::new(me, wrapper.clone(), keys)
            .with_emit_all_received_chat_messages(config.emit_all_received_chat_messages());

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (presence_tx, presence_rx) = watch::channel(engine.presence().clone());

        let inbound = cmd_tx.clone();
        wrapper.on_receive(move |envelope| {
            let _ = inbound.send(Command::Receive(envelope));
        });

        let task = tokio::spawn(run(
            engine,
            cmd_rx,
            presence_tx,
            config.presence_interval(),
        ));

        Self {
            cmd_tx,
            presence_rx,
            next_subscription: AtomicU64::new(0),
            task: Some(task),
        }
    }

    pub fn me(&self) -> ChatUser {
        self.presence_rx.borrow().user.clone()
    }

    pub fn presence(&self) -> ChatPresence {
        self.presence_rx.borrow().clone()
    }

    pub fn watch_presence(&self) -> watch::Receiver<ChatPresence> {
        self.presence_rx.clone()
    }

    pub async fn send(
        &self,
        content: impl Into<String>,
        channel: Option<ChatChannel>,
        attachments: Option<Vec<ChatAttachment>>,
        replying_to: Option<Uuid>,
    ) -> Result<ChatMessage> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Send {
            content: content.into(),
            channel,
            attachments,
            replied_to_message_id: replying_to,
            respond_to: tx,
        })?;
        rx.await
            .map_err(|e| FloodChatError::Runtime(e.to_string()))?
    }

    pub async fn send_text(&self, content: impl Into<String>) -> Result<ChatMessage> {
        self.send(content, None, None, None).await
    }

    pub async fn delete(&self, message_ids: Vec<Uuid>) -> Result<Vec<ChatDeletion>> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Delete {
            message_ids,
            respond_to: tx,
        })?;
        rx.await
            .map_err(|e| FloodChatError::Runtime(e.to_string()))?
    }

    pub fn update_presence(&self, presence: ChatPresence) -> Result<()> {
        self.command(Command::UpdatePresence(presence))
    }

    pub fn update_name(&self, name: impl Into<String>) -> Result<()> {
        self.command(Command::UpdateName(name.into()))
    }

    pub fn on_message_added<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.subscribe(Subscription::MessageAdded(Arc::new(handler)))
    }

    pub fn on_presence_updated<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatPresence) + Send + Sync + 'static,
    {
        self.subscribe(Subscription::PresenceUpdated(Arc::new(handler)))
    }

    pub fn on_message_deleted<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatDeletion) + Send + Sync + 'static,
    {
        self.subscribe(Subscription::MessageDeleted(Arc::new(handler)))
    }

    pub fn on_identity_lookup<D>(&self, provider: D) -> SubscriptionId
    where
        D: UserDirectory + 'static,
    {
        self.subscribe(Subscription::IdentityLookup(Arc::new(provider)))
    }

    /// Feeds `directory` from presence updates and uses it for key lookups.
    pub fn attach_directory(&self, directory: &PresenceDirectory) -> [SubscriptionId; 2] {
        let observer = directory.clone();
        let presence = self.on_presence_updated(move |presence| observer.observe(presence));
        let lookup = self.on_identity_lookup(directory.clone());
        [presence, lookup]
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.command(Command::Unsubscribe(id))
    }

    /// Stops the node and waits for its task to finish. Safe to call twice.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    fn subscribe(&self, subscription: Subscription) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed) + 1);
        if self.command(Command::Subscribe(id, subscription)).is_err() {
            warn!("registering a consumer on a stopped chat controller");
        }
        id
    }

    fn command(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .send(command)
            .map_err(|_| FloodChatError::Runtime("chat controller stopped".to_string()))
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    mut engine: DisseminationEngine,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    presence_tx: watch::Sender<ChatPresence>,
    presence_interval: Duration,
) {
    let mut heartbeat = time::interval_at(Instant::now() + presence_interval, presence_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = cmd_rx.recv() => {
                let Some(command) = command else {
                    break;
                };
                handle_command(&mut engine, command);
            }
            _ = heartbeat.tick() => engine.broadcast_presence(),
        }

        presence_tx.send_if_modified(|current| {
            if current == engine.presence() {
                return false;
            }
            *current = engine.presence().clone();
            true
        });
    }
    debug!("chat controller loop finished");
}

fn handle_command(engine: &mut DisseminationEngine, command: Command) {
    match command {
        Command::Receive(envelope) => engine.receive(envelope),
        Command::Send {
            content,
            channel,
            attachments,
            replied_to_message_id,
            respond_to,
        } => {
            let result = engine.send(content, channel, attachments, replied_to_message_id);
            if let Err(err) = &result {
                warn!(error = %err, "rejected send");
            }
            let _ = respond_to.send(result);
        }
        Command::Delete {
            message_ids,
            respond_to,
        } => {
            let result = engine.delete(message_ids);
            if let Err(err) = &result {
                warn!(error = %err, "rejected delete");
            }
            let _ = respond_to.send(result);
        }
        Command::UpdatePresence(presence) => engine.update_presence(presence),
        Command::UpdateName(name) => engine.update_name(name),
        Command::Subscribe(id, subscription) => engine.dispatcher_mut().insert(id, subscription),
        Command::Unsubscribe(id) => {
            engine.dispatcher_mut().unsubscribe(id);
        }
    }
}
