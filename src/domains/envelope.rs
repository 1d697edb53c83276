use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::message::{ChatDeletion, ChatMessage};
use crate::domains::null_as_default;
use crate::domains::presence::ChatPresence;

/// The only unit placed on the wire.
///
/// Item lists are always present in memory; on the wire an empty list is
/// omitted and an absent or `null` list decodes as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub visited_users: BTreeSet<Uuid>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub added_chat_messages: Vec<ChatMessage>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub updated_presences: Vec<ChatPresence>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub delete_messages: Vec<ChatDeletion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_clock: Option<u64>,
}

impl Envelope {
    /// A fresh envelope visited only by its sender.
    pub fn from_sender(sender: Uuid, logical_clock: u64) -> Self {
        Self {
            visited_users: BTreeSet::from([sender]),
            logical_clock: Some(logical_clock),
            ..Self::default()
        }
    }

    pub fn with_chat_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.added_chat_messages = messages;
        self
    }

    pub fn with_presences(mut self, presences: Vec<ChatPresence>) -> Self {
        self.updated_presences = presences;
        self
    }

    pub fn with_deletions(mut self, deletions: Vec<ChatDeletion>) -> Self {
        self.delete_messages = deletions;
        self
    }

    pub fn has_visited(&self, user_id: &Uuid) -> bool {
        self.visited_users.contains(user_id)
    }

    /// Same payload with `user_id` added to the visited set.
    pub fn forwarded_by(&self, user_id: Uuid) -> Self {
        let mut forwarded = self.clone();
        forwarded.visited_users.insert(user_id);
        forwarded
    }
}
