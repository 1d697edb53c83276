use crate::domains::envelope::Envelope;
use crate::error::{FloodChatError, Result};

pub const DEFAULT_MAX_ENVELOPE_BYTES: usize = 65_536;

/// Wire bytes one more visited-set entry adds: a quoted hyphenated UUID
/// plus its separator.
pub const VISITED_ENTRY_BYTES: usize = 39;

/// Hops of visited-set growth kept free below the limit when a node
/// originates an envelope.
pub const FORWARD_HOP_RESERVE: usize = 32;

/// Text codec between [`Envelope`] and the opaque payload handed to a
/// transport.
///
/// The size limit applies to inbound payloads and to envelopes this node
/// originates. Forwards are never size checked: each hop grows the visited
/// set and the envelope was already accepted.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeCodec {
    max_envelope_bytes: usize,
}

impl EnvelopeCodec {
    pub fn new(max_envelope_bytes: usize) -> Self {
        Self { max_envelope_bytes }
    }

    /// Largest payload this node will originate.
    pub fn origination_budget(&self) -> usize {
        let headroom =
            (VISITED_ENTRY_BYTES * FORWARD_HOP_RESERVE).min(self.max_envelope_bytes / 4);
        self.max_envelope_bytes - headroom
    }

    pub fn encode(&self, envelope: &Envelope) -> Result<String> {
        serde_json::to_string(envelope).map_err(|e| FloodChatError::Serialization(e.to_string()))
    }

    /// Encodes an envelope this node is about to originate, leaving room
    /// for the visited set to grow as it is flooded.
    pub fn encode_originated(&self, envelope: &Envelope) -> Result<String> {
        let raw = self.encode(envelope)?;
        let budget = self.origination_budget();
        if raw.len() > budget {
            return Err(FloodChatError::Serialization(format!(
                "envelope of {} bytes exceeds origination budget of {}",
                raw.len(),
                budget
            )));
        }
        Ok(raw)
    }

    pub fn decode(&self, raw: &str) -> Result<Envelope> {
        if raw.len() > self.max_envelope_bytes {
            return Err(FloodChatError::Serialization(format!(
                "payload of {} bytes exceeds limit of {}",
                raw.len(),
                self.max_envelope_bytes
            )));
        }
        serde_json::from_str(raw).map_err(|e| FloodChatError::Serialization(e.to_string()))
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENVELOPE_BYTES)
    }
}
