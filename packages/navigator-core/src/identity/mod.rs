//! # Identity Module
//!
//! The navigator's long-term keys: an Ed25519 signing keypair that mates
//! pin during pairing, and an X25519 exchange keypair used for the pairing
//! key exchange.
//!
//! ## Load Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     IdentityStore::load_or_create                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  navigator_keys.json                                                   │
//! │         │                                                               │
//! │         ├── missing ─────────────► generate both keypairs, save        │
//! │         │                                                               │
//! │         ├── no exchange fields ──► keep signing key,                   │
//! │         │                          generate exchange keypair, save     │
//! │         │                                                               │
//! │         ├── complete ────────────► load both, check public halves      │
//! │         │                                                               │
//! │         └── anything malformed ──► Error::KeyLoad                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A malformed file is never answered by generating a new identity. Every
//! mate has pinned the old signing key, so silently replacing it would
//! break all existing pairings.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "private_key": "<base64, 64 bytes: seed || public>",
//!   "exchange_public_key": "<base64, 32 bytes>",
//!   "exchange_private_key": "<base64, 32 bytes, clamped>"
//! }
//! ```

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{
    decode_fixed, encode_base64, fingerprint, ExchangeKeyPair, Signature, SigningKeyPair,
    EXCHANGE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNING_KEYPAIR_SIZE,
};
use crate::error::{Error, Result};
use crate::storage::{read_optional, write_private_file};

/// On-disk representation of the identity
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct IdentityFile {
    private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exchange_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exchange_private_key: Option<String>,
}

/// The navigator's persisted keys.
///
/// Immutable after load; share it behind an `Arc`.
pub struct IdentityStore {
    signing: SigningKeyPair,
    exchange: ExchangeKeyPair,
    path: PathBuf,
    /// Serializes concurrent saves
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("fingerprint", &self.fingerprint())
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl IdentityStore {
    /// Load the identity at `path`, creating it if the file does not exist.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let Some(bytes) = read_optional(&path).map_err(|e| Error::KeyLoad(e.to_string()))? else {
            let store = Self {
                signing: SigningKeyPair::generate(),
                exchange: ExchangeKeyPair::generate(),
                path,
                write_lock: Mutex::new(()),
            };
            store.save()?;
            tracing::info!(
                "Created navigator identity {} at {}",
                store.fingerprint(),
                store.path.display()
            );
            return Ok(store);
        };

        let file: IdentityFile = serde_json::from_slice(&bytes)
            .map_err(|e| Error::KeyLoad(format!("malformed identity file: {}", e)))?;

        let signing = decode_signing(&file.private_key)?;

        let (exchange, upgraded) = match (&file.exchange_public_key, &file.exchange_private_key) {
            (Some(public), Some(private)) => (decode_exchange(public, private)?, false),
            (None, None) => (ExchangeKeyPair::generate(), true),
            _ => {
                return Err(Error::KeyLoad(
                    "identity file has only one of the exchange key fields".into(),
                ))
            }
        };

        let store = Self {
            signing,
            exchange,
            path,
            write_lock: Mutex::new(()),
        };

        if upgraded {
            store.save()?;
            tracing::info!(
                "Generated exchange keypair for existing identity {}",
                store.fingerprint()
            );
        } else {
            tracing::debug!("Loaded navigator identity {}", store.fingerprint());
        }

        Ok(store)
    }

    /// Persist both keypairs to the path the identity was loaded from
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.path)
    }

    /// Persist both keypairs to `path` (atomic, mode 0600)
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let file = IdentityFile {
            private_key: encode_base64(&self.signing.keypair_bytes()[..]),
            exchange_public_key: Some(encode_base64(self.exchange.public_bytes())),
            exchange_private_key: Some(encode_base64(&self.exchange.private_bytes()[..])),
        };
        let json = zeroize::Zeroizing::new(serde_json::to_vec_pretty(&file)?);

        let _guard = self.write_lock.lock();
        write_private_file(path, &json)?;
        tracing::debug!("Saved navigator identity to {}", path.display());
        Ok(())
    }

    /// Where this identity is persisted
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signing public key bytes
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing.public_bytes()
    }

    /// Signing public key, base64
    pub fn public_key_b64(&self) -> String {
        encode_base64(self.signing.public_bytes())
    }

    /// Exchange public key bytes
    pub fn exchange_public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.exchange.public_bytes()
    }

    /// Exchange public key, base64
    pub fn exchange_public_key_b64(&self) -> String {
        encode_base64(self.exchange.public_bytes())
    }

    /// Sign data with the navigator's identity key
    pub fn sign(&self, data: &[u8]) -> Signature {
        self.signing.sign(data)
    }

    /// SHA-256 hex of the signing public key. Safe to log.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.signing.public_bytes())
    }

    /// The signing keypair
    pub fn signing_keypair(&self) -> &SigningKeyPair {
        &self.signing
    }

    /// The exchange keypair
    pub fn exchange_keypair(&self) -> &ExchangeKeyPair {
        &self.exchange
    }
}

fn decode_signing(encoded: &str) -> Result<SigningKeyPair> {
    let bytes = zeroize::Zeroizing::new(
        decode_fixed::<SIGNING_KEYPAIR_SIZE>(encoded)
            .map_err(|e| Error::KeyLoad(format!("private_key: {}", e)))?,
    );
    SigningKeyPair::from_keypair_bytes(&bytes)
}

fn decode_exchange(public: &str, private: &str) -> Result<ExchangeKeyPair> {
    let private = zeroize::Zeroizing::new(
        decode_fixed::<EXCHANGE_KEY_SIZE>(private)
            .map_err(|e| Error::KeyLoad(format!("exchange_private_key: {}", e)))?,
    );
    let public = decode_fixed::<PUBLIC_KEY_SIZE>(public)
        .map_err(|e| Error::KeyLoad(format!("exchange_public_key: {}", e)))?;

    let keypair = ExchangeKeyPair::from_private_bytes(&private);
    if keypair.public_bytes() != public {
        return Err(Error::KeyLoad(
            "exchange public key does not match exchange private key".into(),
        ));
    }
    Ok(keypair)
}

// ============================================================================
// TESTS
// ============================================================================
