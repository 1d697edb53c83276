use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{FloodChatError, Result};
use crate::services::codec::DEFAULT_MAX_ENVELOPE_BYTES;

pub const DEFAULT_PRESENCE_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_LOG_FILTER: &str = "info,floodchat=info";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeConfig {
    pub name: Option<String>,
    pub presence_interval_secs: Option<u64>,
    pub emit_all_received_chat_messages: Option<bool>,
    pub max_envelope_bytes: Option<usize>,
}

impl NodeConfig {
    pub fn presence_interval(&self) -> Duration {
        let secs = self
            .presence_interval_secs
            .unwrap_or(DEFAULT_PRESENCE_INTERVAL_SECS);
        Duration::from_secs(secs.max(1))
    }

    pub fn emit_all_received_chat_messages(&self) -> bool {
        self.emit_all_received_chat_messages.unwrap_or(false)
    }

    pub fn max_envelope_bytes(&self) -> usize {
        self.max_envelope_bytes
            .unwrap_or(DEFAULT_MAX_ENVELOPE_BYTES)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub node: Option<NodeConfig>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| FloodChatError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| FloodChatError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn node(&self) -> NodeConfig {
        self.node.clone().unwrap_or_default()
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
