//! # Secure Channel
//!
//! AES-256-GCM confidentiality and integrity for payloads exchanged with a
//! trusted mate.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┬──────────────────┐
//! │ nonce (12 B) │ ciphertext (len(plaintext))  │ GCM tag (16 B)   │
//! └──────────────┴──────────────────────────────┴──────────────────┘
//! ```
//!
//! A fresh random nonce is drawn for every message. Reusing a nonce under
//! the same key breaks GCM completely, so nonces are never derived from
//! counters held by the caller. Random 96-bit nonces are safe for about
//! 2^32 messages per key.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};

use super::exchange::{derive_session_key, generate_nonce, SharedSecret};
use super::{decode_base64, encode_base64, SHARED_SECRET_SIZE};
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Per-mate AEAD channel.
///
/// Cheap to build; open one on demand from the trust store rather than
/// caching it.
#[derive(Clone)]
pub struct SecureChannel {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel").finish_non_exhaustive()
    }
}

impl SecureChannel {
    /// Build a channel keyed directly with `key`
    pub fn new(key: &[u8; SHARED_SECRET_SIZE]) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Self { cipher }
    }

    /// Build a channel from a raw ECDH secret.
    ///
    /// The AES key is the HKDF-SHA256 expansion of the secret, so both
    /// sides of a pairing arrive at the same channel from the same ECDH
    /// output.
    pub fn from_shared_secret(secret: &SharedSecret) -> Result<Self> {
        let key = derive_session_key(secret)?;
        Ok(Self::new(&key))
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = generate_nonce();
        let payload = Payload {
            msg: plaintext,
            aad: &[],
        };

        let ciphertext = self
            .cipher
            .encrypt(AesNonce::from_slice(&nonce), payload)
            .map_err(|e| Error::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt data produced by [`SecureChannel::encrypt`]
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE {
            return Err(Error::CiphertextTooShort);
        }
        let (nonce, body) = data.split_at(NONCE_SIZE);
        let payload = Payload { msg: body, aad: &[] };

        self.cipher
            .decrypt(AesNonce::from_slice(nonce), payload)
            .map_err(|_| Error::DecryptionFailed)
    }

    /// Encrypt and base64-encode, for JSON/text transports
    pub fn encrypt_base64(&self, plaintext: &[u8]) -> Result<String> {
        self.encrypt(plaintext).map(encode_base64)
    }

    /// Decode base64 and decrypt
    pub fn decrypt_base64(&self, encoded: &str) -> Result<Vec<u8>> {
        let data = decode_base64(encoded).map_err(|_| Error::DecryptionFailed)?;
        self.decrypt(&data)
    }

    /// Encrypt a UTF-8 string to base64 text
    pub fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        self.encrypt_base64(plaintext.as_bytes())
    }

    /// Decrypt base64 text back into a UTF-8 string
    pub fn decrypt_string(&self, encoded: &str) -> Result<String> {
        let plaintext = self.decrypt_base64(encoded)?;
        String::from_utf8(plaintext).map_err(|_| Error::DecryptionFailed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
