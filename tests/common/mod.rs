#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use floodchat::e2e::manager::KeyPairManager;
use floodchat::interfaces::transport::{ChatTransport, PayloadHandler};
use floodchat::services::codec::EnvelopeCodec;
use floodchat::services::directory::PresenceDirectory;
use floodchat::services::dissemination::DisseminationEngine;
use floodchat::services::transport::TransportWrapper;
use floodchat::{ChatDeletion, ChatMessage, ChatPresence, ChatUser, Envelope};

/// Captures every outbound payload instead of sending it anywhere.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    handler: Mutex<Option<PayloadHandler>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn raw(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn take_sent(&self) -> Vec<Envelope> {
        let codec = EnvelopeCodec::default();
        self.sent
            .lock()
            .unwrap()
            .drain(..)
            .map(|raw| codec.decode(&raw).unwrap())
            .collect()
    }

    /// Pushes a payload through the registered handler.
    pub fn deliver(&self, raw: &str) {
        if let Some(handler) = self.handler.lock().unwrap().as_ref() {
            handler(raw.to_string());
        }
    }
}

impl ChatTransport for RecordingTransport {
    fn broadcast(&self, raw: &str) {
        self.sent.lock().unwrap().push(raw.to_string());
    }

    fn on_receive(&self, handler: PayloadHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }
}

pub struct TestNode {
    pub engine: DisseminationEngine,
    pub transport: Arc<RecordingTransport>,
    pub directory: PresenceDirectory,
    pub messages: Arc<Mutex<Vec<ChatMessage>>>,
    pub presences: Arc<Mutex<Vec<ChatPresence>>>,
    pub deletions: Arc<Mutex<Vec<ChatDeletion>>>,
}

impl TestNode {
    pub fn new(name: &str) -> Self {
        Self::with_emit_all(name, false)
    }

    pub fn with_emit_all(name: &str, emit_all: bool) -> Self {
        Self::build(name, emit_all, EnvelopeCodec::default())
    }

    pub fn with_codec(name: &str, codec: EnvelopeCodec) -> Self {
        Self::build(name, false, codec)
    }

    fn build(name: &str, emit_all: bool, codec: EnvelopeCodec) -> Self {
        let transport = RecordingTransport::new();
        let wrapper = TransportWrapper::new(transport.clone(), codec);
        let mut engine = DisseminationEngine::new(
            ChatUser::new(Some(name.to_string())),
            wrapper,
            KeyPairManager::generate(),
        )
        .with_emit_all_received_chat_messages(emit_all);

        let directory = PresenceDirectory::new();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let presences = Arc::new(Mutex::new(Vec::new()));
        let deletions = Arc::new(Mutex::new(Vec::new()));

        let dispatcher = engine.dispatcher_mut();
        dispatcher.on_identity_lookup(directory.clone());
        let sink = messages.clone();
        dispatcher.on_message_added(move |message| sink.lock().unwrap().push(message.clone()));
        let sink = presences.clone();
        dispatcher.on_presence_updated(move |presence| sink.lock().unwrap().push(presence.clone()));
        let sink = deletions.clone();
        dispatcher.on_message_deleted(move |deletion| sink.lock().unwrap().push(deletion.clone()));

        Self {
            engine,
            transport,
            directory,
            messages,
            presences,
            deletions,
        }
    }

    pub fn id(&self) -> Uuid {
        self.engine.me().id
    }

    pub fn clock(&self) -> u64 {
        self.engine.logical_clock()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|message| message.content.to_string())
            .collect()
    }

    /// Lets this node resolve `other`'s identity and keys.
    pub fn learn(&self, other: &TestNode) {
        self.directory.observe(other.engine.presence());
    }
}
