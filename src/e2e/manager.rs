use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::message::{ChatAttachment, ChatMessage, ChatMessageContent, SealedBox, SealedContent};
use crate::e2e::{establish_session, PrivateKeys, PublicKeys, NONCE_LEN};
use crate::error::{FloodChatError, Result};

/// Plaintext that gets sealed for each member of a direct conversation.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedBody {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachments: Option<Vec<ChatAttachment>>,
}

/// Owns the node's key pair for its whole lifetime.
pub struct KeyPairManager {
    private: PrivateKeys,
}

impl KeyPairManager {
    pub fn generate() -> Self {
        Self::from_private(PrivateKeys::generate())
    }

    pub fn from_private(private: PrivateKeys) -> Self {
        Self { private }
    }

    pub fn public_keys(&self) -> PublicKeys {
        self.private.public_keys()
    }

    /// Seals messages carrying a recipient restriction, one box per member.
    /// Unrestricted messages are returned unchanged.
    pub fn encrypt_if_needed<F>(&self, message: &ChatMessage, find_keys: F) -> Result<ChatMessage>
    where
        F: Fn(Uuid) -> Option<PublicKeys>,
    {
        let Some(members) = message.recipients() else {
            return Ok(message.clone());
        };
        let ChatMessageContent::Text(text) = &message.content else {
            return Ok(message.clone());
        };

        let body = serde_json::to_vec(&SealedBody {
            text: text.clone(),
            attachments: message.attachments.clone(),
        })
        .map_err(|e| FloodChatError::Serialization(e.to_string()))?;

        let mut sealed = SealedContent::default();
        for member in members {
            let keys = find_keys(*member).ok_or(FloodChatError::UnknownPublicKey(*member))?;
            let session = establish_session(&self.private, &keys)?;
            let (nonce, ciphertext) = session.seal(message.id.as_bytes(), &body)?;
            let signature = self
                .private
                .sign(&signable(message.id, *member, &nonce, &ciphertext));
            sealed.boxes.insert(
                *member,
                SealedBox {
                    nonce,
                    ciphertext,
                    signature,
                },
            );
        }

        Ok(ChatMessage {
            content: ChatMessageContent::Encrypted(sealed),
            attachments: None,
            ..message.clone()
        })
    }

    /// Opens the box addressed to `me`. The author's keys are needed both to
    /// verify the signature and to derive the session.
    ///
    /// Content must be sealed exactly when the message is restricted to a
    /// set of members; anything else is rejected.
    pub fn decrypt_if_needed<F>(&self, me: Uuid, message: &ChatMessage, find_keys: F) -> Result<ChatMessage>
    where
        F: Fn(Uuid) -> Option<PublicKeys>,
    {
        let sealed = match (&message.content, message.recipients().is_some()) {
            (ChatMessageContent::Text(_), false) => return Ok(message.clone()),
            (ChatMessageContent::Encrypted(sealed), true) => sealed,
            (ChatMessageContent::Text(_), true) => {
                return Err(FloodChatError::Crypto(
                    "direct message arrived without encryption".to_string(),
                ))
            }
            (ChatMessageContent::Encrypted(_), false) => {
                return Err(FloodChatError::Crypto(
                    "encrypted content on an unrestricted message".to_string(),
                ))
            }
        };
        let sealed_box = sealed
            .boxes
            .get(&me)
            .ok_or_else(|| FloodChatError::Crypto("no sealed box for this node".to_string()))?;
        let author = message.author.id;
        let author_keys = find_keys(author).ok_or(FloodChatError::UnknownPublicKey(author))?;

        author_keys.verify(
            &signable(message.id, me, &sealed_box.nonce, &sealed_box.ciphertext),
            &sealed_box.signature,
        )?;
        let session = establish_session(&self.private, &author_keys)?;
        let plaintext = session.open(
            &sealed_box.nonce,
            message.id.as_bytes(),
            &sealed_box.ciphertext,
        )?;
        let body: SealedBody = serde_json::from_slice(&plaintext)
            .map_err(|e| FloodChatError::Serialization(e.to_string()))?;

        Ok(ChatMessage {
            content: ChatMessageContent::Text(body.text),
            attachments: body.attachments,
            ..message.clone()
        })
    }
}

fn signable(message_id: Uuid, member: Uuid, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32 + NONCE_LEN + ciphertext.len());
    bytes.extend_from_slice(message_id.as_bytes());
    bytes.extend_from_slice(member.as_bytes());
    bytes.extend_from_slice(nonce);
    bytes.extend_from_slice(ciphertext);
    bytes
}
