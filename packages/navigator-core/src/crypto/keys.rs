//! # Key Management
//!
//! Key generation and the in-memory representation of the navigator's
//! long-term keys.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SigningKeyPair (Ed25519)                                              │
//! │  • Public key: 32 bytes, published to mates out-of-band                │
//! │  • Private key: 64 bytes on disk = seed (32) || public key (32)        │
//! │  • Used for the pairing code and for outbound signatures               │
//! │                                                                         │
//! │  ExchangeKeyPair (X25519)                                              │
//! │  • Public key: 32 bytes, published with the signing key                │
//! │  • Private key: 32 bytes, stored clamped                               │
//! │  • Used once per pairing to compute the ECDH shared secret             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use super::exchange::{compute_shared_secret, SharedSecret};
use super::signing::Signature;
use super::{EXCHANGE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNING_KEYPAIR_SIZE};
use crate::error::{Error, Result};

/// Ed25519 signing keypair
pub struct SigningKeyPair {
    // ed25519_dalek::SigningKey zeroizes itself on drop
    secret: SigningKey,
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SigningKeyPair {
    /// Generate a new random signing keypair
    pub fn generate() -> Self {
        let secret = SigningKey::generate(&mut OsRng);
        Self { secret }
    }

    /// Rebuild from the 64-byte `seed || public` encoding.
    ///
    /// Fails when the embedded public half does not match the seed.
    pub fn from_keypair_bytes(bytes: &[u8; SIGNING_KEYPAIR_SIZE]) -> Result<Self> {
        let secret = SigningKey::from_keypair_bytes(bytes)
            .map_err(|_| Error::KeyLoad("signing key does not match its public key".into()))?;
        Ok(Self { secret })
    }

    /// The 64-byte private key encoding (for storage only)
    pub fn keypair_bytes(&self) -> Zeroizing<[u8; SIGNING_KEYPAIR_SIZE]> {
        Zeroizing::new(self.secret.to_keypair_bytes())
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.secret.verifying_key().to_bytes()
    }

    /// Get the verifying key for signature verification
    pub fn verifying_key(&self) -> VerifyingKey {
        self.secret.verifying_key()
    }

    /// Sign arbitrary data
    pub fn sign(&self, data: &[u8]) -> Signature {
        super::signing::sign(self, data)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

/// Apply X25519 clamping to a private scalar in place.
///
/// Clears bits 0, 1 and 2 of the first byte, clears bit 7 and sets bit 6
/// of the last byte.
pub fn clamp_scalar(bytes: &mut [u8; EXCHANGE_KEY_SIZE]) {
    bytes[0] &= 0b1111_1000;
    bytes[31] &= 0b0111_1111;
    bytes[31] |= 0b0100_0000;
}

/// X25519 keypair for the pairing key exchange
pub struct ExchangeKeyPair {
    // x25519_dalek::StaticSecret zeroizes itself on drop
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl std::fmt::Debug for ExchangeKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeKeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl ExchangeKeyPair {
    /// Generate a new random keypair with a clamped private scalar
    pub fn generate() -> Self {
        let mut bytes = [0u8; EXCHANGE_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        let keypair = Self::from_private_bytes(&bytes);
        bytes.zeroize();
        keypair
    }

    /// Rebuild from a private scalar. The scalar is clamped first.
    pub fn from_private_bytes(bytes: &[u8; EXCHANGE_KEY_SIZE]) -> Self {
        let mut clamped = *bytes;
        clamp_scalar(&mut clamped);
        let secret = StaticSecret::from(clamped);
        clamped.zeroize();
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The clamped private scalar (for storage only)
    pub fn private_bytes(&self) -> Zeroizing<[u8; EXCHANGE_KEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// ECDH with a peer's public key. See [`compute_shared_secret`].
    pub fn diffie_hellman(&self, peer_public: &[u8; PUBLIC_KEY_SIZE]) -> Result<SharedSecret> {
        compute_shared_secret(self, peer_public)
    }

    pub(crate) fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

// ============================================================================
// TESTS
// ============================================================================
