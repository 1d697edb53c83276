use std::fmt;

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::domains::base64_bytes;
use crate::error::{FloodChatError, Result};

pub mod manager;

const E2E_CONTEXT: &[u8] = b"floodchat-e2e-v1";
pub const NONCE_LEN: usize = 12;

/// Public halves advertised inside the owner's presence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeys {
    #[serde(with = "base64_bytes")]
    pub encryption: [u8; 32],
    #[serde(with = "base64_bytes")]
    pub signing: [u8; 32],
}

impl PublicKeys {
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.signing)
            .map_err(|e| FloodChatError::Crypto(e.to_string()))?;
        key.verify(message, &Signature::from_bytes(signature))
            .map_err(|_| FloodChatError::Crypto("invalid signature".to_string()))
    }
}

#[derive(Clone)]
pub struct PrivateKeys {
    encryption: StaticSecret,
    signing: SigningKey,
}

impl PrivateKeys {
    pub fn generate() -> Self {
        Self {
            encryption: StaticSecret::random_from_rng(OsRng),
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_keys(&self) -> PublicKeys {
        PublicKeys {
            encryption: PublicKey::from(&self.encryption).to_bytes(),
            signing: self.signing.verifying_key().to_bytes(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl fmt::Debug for PrivateKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeys")
            .field("public", &self.public_keys())
            .finish_non_exhaustive()
    }
}

pub struct E2eSession {
    key: Key,
}

impl E2eSession {
    pub fn from_shared_secret(shared_secret: [u8; 32], context: &[u8]) -> Result<Self> {
        let hk = Hkdf::<Sha256>::new(None, &shared_secret);
        let mut okm = [0u8; 32];
        hk.expand(context, &mut okm)
            .map_err(|_| FloodChatError::Crypto("HKDF expand failed".to_string()))?;
        Ok(Self {
            key: Key::from_slice(&okm).to_owned(),
        })
    }

    pub fn seal(&self, aad: &[u8], plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>)> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad })
            .map_err(|_| FloodChatError::Crypto("encrypt failed".to_string()))?;
        Ok((nonce.into(), ciphertext))
    }

    pub fn open(&self, nonce: &[u8; NONCE_LEN], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| FloodChatError::Crypto("decrypt failed".to_string()))
    }
}

/// Both ends derive the same session: ours(private) x theirs(public).
pub fn establish_session(ours: &PrivateKeys, theirs: &PublicKeys) -> Result<E2eSession> {
    let shared = ours
        .encryption
        .diffie_hellman(&PublicKey::from(theirs.encryption));
    if !shared.was_contributory() {
        return Err(FloodChatError::Crypto(
            "non-contributory key agreement".to_string(),
        ));
    }
    E2eSession::from_shared_secret(shared.to_bytes(), E2E_CONTEXT)
}
