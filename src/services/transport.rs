use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::domains::envelope::Envelope;
use crate::error::Result;
use crate::interfaces::transport::{ChatTransport, PayloadHandler};
use crate::services::codec::EnvelopeCodec;

/// Puts envelopes through the codec on their way to and from a transport.
/// Malformed payloads are dropped here and never reach the engine.
#[derive(Clone)]
pub struct TransportWrapper {
    transport: Arc<dyn ChatTransport>,
    codec: EnvelopeCodec,
}

impl TransportWrapper {
    pub fn new(transport: Arc<dyn ChatTransport>, codec: EnvelopeCodec) -> Self {
        Self { transport, codec }
    }

    /// Broadcasts an envelope originated by this node. Nothing reaches the
    /// transport if it cannot be encoded within the origination budget.
    pub fn broadcast(&self, envelope: &Envelope) -> Result<()> {
        let raw = self.codec.encode_originated(envelope)?;
        self.transport.broadcast(&raw);
        Ok(())
    }

    /// Rebroadcasts an envelope received from a peer, whatever its size.
    pub fn forward(&self, envelope: &Envelope) {
        match self.codec.encode(envelope) {
            Ok(raw) => self.transport.broadcast(&raw),
            Err(err) => warn!(error = %err, "dropping forwarded envelope"),
        }
    }

    pub fn on_receive<F>(&self, handler: F)
    where
        F: Fn(Envelope) + Send + Sync + 'static,
    {
        let codec = self.codec;
        self.transport.on_receive(Box::new(move |raw: String| {
            match codec.decode(&raw) {
                Ok(envelope) => handler(envelope),
                Err(err) => warn!(error = %err, "dropping malformed envelope"),
            }
        }));
    }
}

type SharedHandler = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Default)]
struct MeshState {
    next_node: usize,
    handlers: HashMap<usize, SharedHandler>,
    links: HashMap<usize, BTreeSet<usize>>,
    broadcasts: HashMap<usize, usize>,
}

/// In-process simulated mesh. Nodes only hear broadcasts from nodes they
/// are linked to, the way radio peers only hear neighbours in range.
#[derive(Clone, Default)]
pub struct LocalMesh {
    state: Arc<Mutex<MeshState>>,
}

impl LocalMesh {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MeshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn join(&self) -> Arc<MeshTransport> {
        let mut state = self.lock();
        let node = state.next_node;
        state.next_node += 1;
        state.links.entry(node).or_default();
        Arc::new(MeshTransport {
            mesh: self.clone(),
            node,
        })
    }

    pub fn link(&self, a: &MeshTransport, b: &MeshTransport) {
        if a.node == b.node {
            return;
        }
        let mut state = self.lock();
        state.links.entry(a.node).or_default().insert(b.node);
        state.links.entry(b.node).or_default().insert(a.node);
    }

    /// Links consecutive nodes: n0 - n1 - ... - nk.
    pub fn link_line(&self, nodes: &[Arc<MeshTransport>]) {
        for pair in nodes.windows(2) {
            self.link(&pair[0], &pair[1]);
        }
    }

    fn broadcast_from(&self, node: usize, raw: &str) {
        let targets: Vec<SharedHandler> = {
            let mut state = self.lock();
            *state.broadcasts.entry(node).or_default() += 1;
            let peers = state.links.get(&node).cloned().unwrap_or_default();
            let targets = peers
                .iter()
                .filter_map(|peer| state.handlers.get(peer).cloned())
                .collect();
            targets
        };
        debug!(node, peers = targets.len(), "mesh broadcast");
        for handler in targets {
            handler(raw.to_string());
        }
    }
}

pub struct MeshTransport {
    mesh: LocalMesh,
    node: usize,
}

impl MeshTransport {
    pub fn node(&self) -> usize {
        self.node
    }

    pub fn broadcast_count(&self) -> usize {
        self.mesh
            .lock()
            .broadcasts
            .get(&self.node)
            .copied()
            .unwrap_or(0)
    }
}

impl ChatTransport for MeshTransport {
    fn broadcast(&self, raw: &str) {
        self.mesh.broadcast_from(self.node, raw);
    }

    fn on_receive(&self, handler: PayloadHandler) {
        self.mesh.lock().handlers.insert(self.node, Arc::from(handler));
    }
}
