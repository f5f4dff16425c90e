//! # Cryptography Module
//!
//! All cryptographic primitives used by Navigator Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐         ┌─────────────────┐                       │
//! │  │  Signing Key    │         │  Exchange Key   │                       │
//! │  │  (Ed25519)      │         │  (X25519)       │                       │
//! │  │                 │         │                 │                       │
//! │  │ • Identity      │         │ • Pairing ECDH  │                       │
//! │  │ • Pairing code  │         │ • Shared secret │                       │
//! │  │ • Signatures    │         │                 │                       │
//! │  └─────────────────┘         └────────┬────────┘                       │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                        HKDF-SHA256(shared secret)                      │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                         AES-256-GCM SecureChannel                      │
//! │                  (random 96-bit nonce prepended per message)           │
//! │                                                                         │
//! │  Pairing code: SHA-256(mate_key || navigator_key)[0..3] mod 10^6       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: secret keys and derived secrets are zeroized on drop
//! 2. **Constant-Time Operations**: dalek curve arithmetic throughout
//! 3. **Secure Random**: `rand::rngs::OsRng` for every key, nonce and id
//! 4. **Strict Lengths**: key material of the wrong length is rejected, never
//!    padded or truncated

mod channel;
mod exchange;
mod keys;
mod signing;

pub use channel::{SecureChannel, NONCE_SIZE, TAG_SIZE};
pub use exchange::{
    compute_shared_secret, derive_pairing_code, derive_session_key, generate_nonce,
    generate_random_id, SharedSecret, PAIRING_CODE_DIGITS,
};
pub(crate) use exchange::fingerprint;
pub use keys::{clamp_scalar, ExchangeKeyPair, SigningKeyPair};
pub use signing::{sign, verify, Signature, SIGNATURE_SIZE};

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Size of public keys in bytes (Ed25519 and X25519)
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of the Ed25519 keypair encoding (seed || public key)
pub const SIGNING_KEYPAIR_SIZE: usize = 64;

/// Size of an X25519 private scalar
pub const EXCHANGE_KEY_SIZE: usize = 32;

/// Size of the ECDH shared secret and of the session key
pub const SHARED_SECRET_SIZE: usize = 32;

/// Why a base64 key field could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyDecodeError {
    /// Not valid standard base64
    #[error("invalid base64: {0}")]
    Base64(String),

    /// Decoded to the wrong number of bytes
    #[error("expected {expected} bytes, got {actual}")]
    Length {
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },
}

/// Encode bytes as standard base64
pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64 of any length
pub fn decode_base64(text: &str) -> std::result::Result<Vec<u8>, KeyDecodeError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| KeyDecodeError::Base64(e.to_string()))
}

/// Decode base64 into exactly `N` bytes.
pub fn decode_fixed<const N: usize>(text: &str) -> std::result::Result<[u8; N], KeyDecodeError> {
    let bytes = zeroize::Zeroizing::new(decode_base64(text)?);
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| KeyDecodeError::Length {
        expected: N,
        actual: bytes.len(),
    })
}
