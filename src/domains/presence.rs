use serde::{Deserialize, Serialize};

use crate::domains::user::ChatUser;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatStatus {
    #[default]
    Online,
    Away,
    Busy,
    Offline,
}

/// A node's self-description. The embedded user carries the node's
/// current logical clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPresence {
    pub user: ChatUser,
    #[serde(default)]
    pub status: ChatStatus,
    #[serde(default)]
    pub info: String,
}

impl ChatPresence {
    pub fn new(user: ChatUser) -> Self {
        Self {
            user,
            status: ChatStatus::default(),
            info: String::new(),
        }
    }
}
