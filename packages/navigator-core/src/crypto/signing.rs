//! # Digital Signatures
//!
//! Ed25519 signatures for the navigator identity and for verifying data
//! signed by trusted mates.
//!
//! Signatures are deterministic: signing the same message with the same
//! key always produces the same 64 bytes.

use ed25519_dalek::{Signature as Ed25519Signature, Signer, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::keys::SigningKeyPair;
use super::{decode_fixed, encode_base64, PUBLIC_KEY_SIZE};
use crate::error::{Error, Result};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 digital signature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_base64")] pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Encode as base64
    pub fn to_base64(&self) -> String {
        encode_base64(self.0)
    }

    /// Decode from base64
    pub fn from_base64(text: &str) -> Result<Self> {
        decode_fixed::<SIGNATURE_SIZE>(text)
            .map(Self)
            .map_err(|e| Error::Serialization(format!("Invalid signature: {e}")))
    }
}

/// Sign a message using Ed25519
pub fn sign(keypair: &SigningKeyPair, message: &[u8]) -> Signature {
    let sig = keypair.signing_key().sign(message);
    Signature(sig.to_bytes())
}

/// Verify an Ed25519 signature.
///
/// Uses strict verification (rejects small-order keys and malleable
/// signatures). A public key that is not a valid curve point simply
/// fails verification.
pub fn verify(public_key: &[u8; PUBLIC_KEY_SIZE], message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Ed25519Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &sig).is_ok()
}

/// Serde helper for signature bytes
mod signature_base64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 64], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode_base64(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<[u8; 64], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_fixed::<64>(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
