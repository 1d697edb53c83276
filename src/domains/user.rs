use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::e2e::PublicKeys;

/// A participant in the mesh. The id never changes; name, keys and clock
/// are refreshed by later presence records for the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<PublicKeys>,
    #[serde(default)]
    pub logical_clock: u64,
}

impl ChatUser {
    pub fn new(name: Option<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: Uuid, name: Option<String>) -> Self {
        Self {
            id,
            name,
            public_keys: None,
            logical_clock: 0,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous user>")
    }
}

impl Default for ChatUser {
    fn default() -> Self {
        Self::new(None)
    }
}
