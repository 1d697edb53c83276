use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::base64_bytes;
use crate::domains::now_ms;
use crate::domains::user::ChatUser;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatChannel {
    Room(String),
    /// Direct conversation restricted to the listed members.
    Dm(BTreeSet<Uuid>),
}

impl ChatChannel {
    pub fn room(name: impl Into<String>) -> Self {
        Self::Room(name.into())
    }

    pub fn dm(members: impl IntoIterator<Item = Uuid>) -> Self {
        Self::Dm(members.into_iter().collect())
    }

    pub fn members(&self) -> Option<&BTreeSet<Uuid>> {
        match self {
            Self::Room(_) => None,
            Self::Dm(members) => Some(members),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatAttachmentKind {
    Image,
    VoiceNote,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAttachment {
    pub id: Uuid,
    pub kind: ChatAttachmentKind,
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl ChatAttachment {
    pub fn new(kind: ChatAttachmentKind, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            data,
        }
    }
}

/// Ciphertext for a single member of a direct conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedBox {
    #[serde(with = "base64_bytes")]
    pub nonce: [u8; 12],
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: [u8; 64],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedContent {
    pub boxes: BTreeMap<Uuid, SealedBox>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatMessageContent {
    Text(String),
    Encrypted(SealedContent),
}

impl ChatMessageContent {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

impl fmt::Display for ChatMessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Encrypted(_) => f.write_str("<encrypted>"),
        }
    }
}

impl From<&str> for ChatMessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ChatMessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    /// Unix time in milliseconds at the author's device.
    #[serde(default)]
    pub timestamp: i64,
    pub author: ChatUser,
    pub content: ChatMessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChatChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<ChatAttachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replied_to_message_id: Option<Uuid>,
}

impl ChatMessage {
    pub fn new(
        author: ChatUser,
        content: ChatMessageContent,
        channel: Option<ChatChannel>,
        attachments: Option<Vec<ChatAttachment>>,
        replied_to_message_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now_ms(),
            author,
            content,
            channel,
            attachments,
            replied_to_message_id,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.content.is_encrypted()
    }

    /// Members of the recipient restriction, if there is one.
    pub fn recipients(&self) -> Option<&BTreeSet<Uuid>> {
        self.channel.as_ref().and_then(ChatChannel::members)
    }

    pub fn is_received_by(&self, user_id: Uuid) -> bool {
        match self.recipients() {
            Some(members) => members.contains(&user_id),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDeletion {
    pub message_id: Uuid,
    pub deleted_by: Uuid,
}
