//! # Key Exchange
//!
//! Stateless primitives used during pairing: ECDH, session key
//! derivation, the human-verifiable pairing code, nonces and random ids.
//!
//! ## Pairing Code
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PAIRING CODE DERIVATION                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   mate signing key (32)  ||  navigator signing key (32)                │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                     SHA-256 digest                                      │
//! │                          │                                              │
//! │                          ▼                                              │
//! │          digest[0..3] as big-endian u24  mod 1 000 000                 │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                  "042917" (zero padded)                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The concatenation order is part of the wire contract. Both ends must
//! hash the mate key first; otherwise the two displayed codes differ and
//! the human check that rules out key substitution is meaningless.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use x25519_dalek::PublicKey as X25519PublicKey;
use zeroize::{Zeroizing, ZeroizeOnDrop};

use super::channel::NONCE_SIZE;
use super::keys::ExchangeKeyPair;
use super::{encode_base64, PUBLIC_KEY_SIZE, SHARED_SECRET_SIZE};
use crate::error::{Error, Result};

/// Number of digits in a pairing code
pub const PAIRING_CODE_DIGITS: usize = 6;

const PAIRING_CODE_MODULUS: u32 = 1_000_000;

/// HKDF salt for session key derivation
const SESSION_KEY_SALT: &[u8] = b"navigator-pairing-hkdf-salt-v1";

/// HKDF info string for session key derivation
const SESSION_KEY_INFO: &[u8] = b"navigator-secure-channel-v1";

/// Raw X25519 output shared by navigator and mate.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl SharedSecret {
    /// Wrap raw secret bytes
    pub fn from_bytes(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }

    /// Base64 form, as persisted in the trust store
    pub fn to_base64(&self) -> String {
        encode_base64(self.0)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// X25519 scalar multiplication of our private key with a peer public key.
///
/// An all-zero result means the peer sent a low-order point; it is
/// rejected as [`Error::InvalidExchangeKey`].
pub fn compute_shared_secret(
    own: &ExchangeKeyPair,
    peer_public: &[u8; PUBLIC_KEY_SIZE],
) -> Result<SharedSecret> {
    let peer = X25519PublicKey::from(*peer_public);
    let shared = own.secret().diffie_hellman(&peer);
    if !shared.was_contributory() {
        return Err(Error::InvalidExchangeKey(
            "key exchange produced an all-zero secret".into(),
        ));
    }
    Ok(SharedSecret(shared.to_bytes()))
}

/// Derive the AES-256-GCM session key from an ECDH secret via HKDF-SHA256.
pub fn derive_session_key(
    shared_secret: &SharedSecret,
) -> Result<Zeroizing<[u8; SHARED_SECRET_SIZE]>> {
    let hkdf = Hkdf::<Sha256>::new(Some(SESSION_KEY_SALT), shared_secret.as_bytes());
    let mut key = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
    hkdf.expand(SESSION_KEY_INFO, &mut key[..])
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;
    Ok(key)
}

/// Six-digit code both humans compare during pairing.
///
/// `key_a` is the mate's signing key and `key_b` the navigator's.
pub fn derive_pairing_code(key_a: &[u8], key_b: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key_a);
    hasher.update(key_b);
    let digest = hasher.finalize();

    let value = u32::from_be_bytes([0, digest[0], digest[1], digest[2]]);
    format!(
        "{:0width$}",
        value % PAIRING_CODE_MODULUS,
        width = PAIRING_CODE_DIGITS
    )
}

/// Fresh random AES-GCM nonce
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// `n` random bytes, hex encoded (2n characters)
pub fn generate_random_id(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of a public key as lowercase hex. Safe to log.
pub(crate) fn fingerprint(public_key: &[u8]) -> String {
    hex::encode(Sha256::digest(public_key))
}

// ============================================================================
// TESTS
// ============================================================================
