pub mod client;
pub mod config;
pub mod domains;
pub mod e2e;
pub mod error;
pub mod interfaces;
pub mod services;

pub use crate::client::ChatController;
pub use crate::config::{Config, NodeConfig};
pub use crate::domains::envelope::Envelope;
pub use crate::domains::message::{
    ChatAttachment, ChatAttachmentKind, ChatChannel, ChatDeletion, ChatMessage, ChatMessageContent,
};
pub use crate::domains::presence::{ChatPresence, ChatStatus};
pub use crate::domains::user::ChatUser;
pub use crate::error::{FloodChatError, Result};
pub use crate::services::dispatcher::SubscriptionId;
