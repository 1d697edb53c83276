use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FloodChatError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("no public key known for user {0}")]
    UnknownPublicKey(Uuid),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, FloodChatError>;
