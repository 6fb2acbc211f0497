//! Symmetric AEAD adapter for wire-field encryption
//!
//! Machine labels and addresses travel to the registry as opaque strings.
//! When encryption is enabled they are sealed with ChaCha20-Poly1305 under
//! one shared key; the textual envelope is `base64(nonce || ciphertext || tag)`
//! with a fresh random nonce per call.
//!
//! Key material is 32 raw bytes, standard-base64 encoded in configuration.
//! If no key is configured, `generate()` produces a fresh one and
//! [`AddressCipher::key_b64`] exposes it so the configuration collaborator
//! can persist it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Key size for ChaCha20-Poly1305
pub const KEY_SIZE: usize = 32;

/// Nonce size for ChaCha20-Poly1305
pub const NONCE_SIZE: usize = 12;

/// Tag size for ChaCha20-Poly1305
pub const TAG_SIZE: usize = 16;

/// AEAD cipher over opaque wire strings
pub struct AddressCipher {
    cipher: ChaCha20Poly1305,
    key_b64: String,
}

// Custom Debug implementation that hides the key material
impl std::fmt::Debug for AddressCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressCipher")
            .field("key_b64", &"<REDACTED>")
            .finish()
    }
}

impl AddressCipher {
    /// Create a cipher from a standard-base64 encoded 32-byte key.
    pub fn from_key_b64(key_b64: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(key_b64)
            .map_err(|_| Error::config("encryption key is not valid base64"))?;
        if bytes.len() != KEY_SIZE {
            return Err(Error::config(format!(
                "encryption key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&bytes)),
            key_b64: key_b64.to_string(),
        })
    }

    /// Generate a cipher with a fresh random key.
    ///
    /// The caller must surface [`AddressCipher::key_b64`] to whoever owns
    /// configuration persistence; a generated key that is not written back
    /// makes every published entry undecodable after restart.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
            key_b64: STANDARD.encode(key),
        }
    }

    /// The key in its configuration encoding.
    pub fn key_b64(&self) -> &str {
        &self.key_b64
    }

    /// Seal a string into the textual envelope.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| Error::Other("AEAD encryption failed".to_string()))?;

        let mut envelope = Vec::with_capacity(NONCE_SIZE + sealed.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&sealed);
        Ok(STANDARD.encode(envelope))
    }

    /// Open a textual envelope.
    ///
    /// Any tampering, truncation, or wrong-key input yields
    /// [`Error::Decryption`]; the authentication tag guarantees this never
    /// returns a plausible-looking but wrong string.
    pub fn decrypt_str(&self, token: &str) -> Result<String> {
        let raw = STANDARD.decode(token).map_err(|_| Error::Decryption)?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Decryption);
        }
        let (nonce, sealed) = raw.split_at(NONCE_SIZE);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| Error::Decryption)?;
        String::from_utf8(plain).map_err(|_| Error::Decryption)
    }
}
