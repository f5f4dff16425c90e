//! # Trust Store
//!
//! Durable set of mates the navigator has paired with.
//!
//! ## Durability
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         MUTATION PATH                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   write lock ──► snapshot ──► apply change ──► write trusted_mates.json │
//! │                                                    │                    │
//! │                                    ┌───────────────┴───────────────┐    │
//! │                                    ▼                               ▼    │
//! │                                 success                         failure │
//! │                              release lock               restore snapshot│
//! │                                                          Error::Persistence
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write lock is held across the save, so what is in memory is always
//! what is on disk once the lock is released. Readers take the read lock
//! and get clones.
//!
//! ## File Format
//!
//! A JSON array of [`TrustedMate`] with snake_case fields and RFC 3339
//! timestamps. The mate type is stored under `"type"`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    decode_fixed, generate_random_id, verify, SecureChannel, SharedSecret, Signature,
    PUBLIC_KEY_SIZE, SHARED_SECRET_SIZE,
};
use crate::error::{Error, Result};
use crate::storage::{read_optional, write_private_file};
use crate::time::{Clock, SystemClock};

/// Length in bytes of a mate id before hex encoding
pub const MATE_ID_BYTES: usize = 16;

/// A mate that completed pairing
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedMate {
    /// Random 32-character hex id
    pub id: String,
    /// Display name chosen by the mate
    pub name: String,
    /// Free-form kind of mate ("desktop", "phone", ...)
    #[serde(rename = "type")]
    pub mate_type: String,
    /// Ed25519 public key, base64
    pub public_key: String,
    /// X25519 public key, base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_key: Option<String>,
    /// Raw ECDH output, base64. Absent for identity-only mates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,
    /// When pairing was approved
    pub paired_at: DateTime<Utc>,
    /// Last time the mate was seen
    pub last_seen: DateTime<Utc>,
    /// Arbitrary string attributes
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Model the mate is configured to use
    #[serde(default)]
    pub model: String,
    /// System prompt configured for the mate
    #[serde(default)]
    pub system_prompt: String,
    /// Current operating mode
    #[serde(default)]
    pub active_mode: String,
}

impl std::fmt::Debug for TrustedMate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedMate")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mate_type", &self.mate_type)
            .field("public_key", &self.public_key)
            .field("exchange_key", &self.exchange_key)
            .field(
                "shared_secret",
                &self.shared_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("paired_at", &self.paired_at)
            .field("last_seen", &self.last_seen)
            .field("metadata", &self.metadata)
            .field("model", &self.model)
            .field("active_mode", &self.active_mode)
            .finish_non_exhaustive()
    }
}

impl TrustedMate {
    /// A freshly paired mate with a new random id
    pub fn new(
        name: impl Into<String>,
        mate_type: impl Into<String>,
        public_key: impl Into<String>,
        exchange_key: Option<String>,
        shared_secret: Option<&SharedSecret>,
        paired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_random_id(MATE_ID_BYTES),
            name: name.into(),
            mate_type: mate_type.into(),
            public_key: public_key.into(),
            exchange_key,
            shared_secret: shared_secret.map(SharedSecret::to_base64),
            paired_at,
            last_seen: paired_at,
            metadata: BTreeMap::new(),
            model: String::new(),
            system_prompt: String::new(),
            active_mode: String::new(),
        }
    }

    /// Decoded signing public key
    pub fn public_key_bytes(&self) -> Result<[u8; PUBLIC_KEY_SIZE]> {
        decode_fixed::<PUBLIC_KEY_SIZE>(&self.public_key)
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))
    }

    /// Whether a channel can be opened to this mate
    pub fn has_shared_secret(&self) -> bool {
        self.shared_secret.is_some()
    }

    /// Open a secure channel from the stored shared secret
    pub fn secure_channel(&self) -> Result<SecureChannel> {
        let encoded = self.shared_secret.as_deref().ok_or(Error::NoSharedSecret)?;
        let bytes = decode_fixed::<SHARED_SECRET_SIZE>(encoded)
            .map_err(|e| Error::InvalidSharedSecret(e.to_string()))?;
        SecureChannel::from_shared_secret(&SharedSecret::from_bytes(bytes))
    }
}

/// Partial update of a mate's configuration. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MateConfigUpdate {
    /// New model
    pub model: Option<String>,
    /// New system prompt
    pub system_prompt: Option<String>,
    /// New active mode
    pub active_mode: Option<String>,
}

impl MateConfigUpdate {
    fn apply(self, mate: &mut TrustedMate) {
        if let Some(model) = self.model {
            mate.model = model;
        }
        if let Some(prompt) = self.system_prompt {
            mate.system_prompt = prompt;
        }
        if let Some(mode) = self.active_mode {
            mate.active_mode = mode;
        }
    }
}

/// Concurrency-safe, file-backed set of trusted mates
pub struct TrustStore {
    path: PathBuf,
    mates: RwLock<Vec<TrustedMate>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("path", &self.path)
            .field("mates", &self.mates.read().len())
            .finish_non_exhaustive()
    }
}

impl TrustStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_clock(path, Arc::new(SystemClock))
    }

    /// Load with an explicit time source for `last_seen` updates
    pub fn load_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mates = match read_optional(&path)? {
            None => Vec::new(),
            Some(bytes) => {
                let mates: Vec<TrustedMate> = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::CorruptTrustStore(e.to_string()))?;
                for mate in &mates {
                    mate.public_key_bytes().map_err(|_| {
                        Error::CorruptTrustStore(format!("mate {} has an invalid public key", mate.id))
                    })?;
                }
                mates
            }
        };

        tracing::info!("Loaded {} trusted mates from {}", mates.len(), path.display());

        Ok(Self {
            path,
            mates: RwLock::new(mates),
            clock,
        })
    }

    /// Where the store is persisted
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of trusted mates
    pub fn len(&self) -> usize {
        self.mates.read().len()
    }

    /// Whether no mate is trusted
    pub fn is_empty(&self) -> bool {
        self.mates.read().is_empty()
    }

    /// Look up a mate by id
    pub fn get(&self, id: &str) -> Option<TrustedMate> {
        self.mates.read().iter().find(|m| m.id == id).cloned()
    }

    /// First mate whose signing key equals `public_key`
    pub fn find_by_public_key(&self, public_key: &[u8; PUBLIC_KEY_SIZE]) -> Option<TrustedMate> {
        self.mates
            .read()
            .iter()
            .find(|m| has_public_key(m, public_key))
            .cloned()
    }

    /// Whether any mate has the signing key `public_key`
    pub fn contains_public_key(&self, public_key: &[u8; PUBLIC_KEY_SIZE]) -> bool {
        self.mates.read().iter().any(|m| has_public_key(m, public_key))
    }

    /// All trusted mates
    pub fn list(&self) -> Vec<TrustedMate> {
        self.mates.read().clone()
    }

    /// Add a mate and persist
    pub fn insert(&self, mate: TrustedMate) -> Result<TrustedMate> {
        mate.public_key_bytes()?;
        self.mutate(|mates| {
            mates.push(mate.clone());
            Ok(mate)
        })
    }

    /// Add a mate unless its signing key is already trusted
    pub fn insert_unique(&self, mate: TrustedMate) -> Result<TrustedMate> {
        let key = mate.public_key_bytes()?;
        self.mutate(|mates| {
            if mates.iter().any(|m| has_public_key(m, &key)) {
                return Err(Error::DuplicateMate);
            }
            mates.push(mate.clone());
            Ok(mate)
        })
    }

    /// Remove a mate. Removing an unknown id is an error.
    pub fn remove(&self, id: &str) -> Result<TrustedMate> {
        let removed = self.mutate(|mates| {
            let index = mates
                .iter()
                .position(|m| m.id == id)
                .ok_or(Error::MateNotFound)?;
            Ok(mates.remove(index))
        })?;
        tracing::info!("Removed trusted mate {} ({})", removed.name, removed.id);
        Ok(removed)
    }

    /// Set `last_seen` to now
    pub fn update_last_seen(&self, id: &str) -> Result<()> {
        let now = self.clock.now();
        self.mutate(|mates| {
            find_mut(mates, id)?.last_seen = now;
            Ok(())
        })
    }

    /// Apply a configuration update
    pub fn update_config(&self, id: &str, update: MateConfigUpdate) -> Result<TrustedMate> {
        self.mutate(|mates| {
            let mate = find_mut(mates, id)?;
            update.apply(mate);
            Ok(mate.clone())
        })
    }

    /// Set one metadata attribute
    pub fn set_metadata(
        &self,
        id: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.mutate(|mates| {
            find_mut(mates, id)?.metadata.insert(key, value);
            Ok(())
        })
    }

    /// Open an AES-GCM channel to a trusted mate
    pub fn open_secure_channel(&self, id: &str) -> Result<SecureChannel> {
        let mates = self.mates.read();
        let mate = mates.iter().find(|m| m.id == id).ok_or(Error::MateNotFound)?;
        mate.secure_channel()
    }

    /// Check a signature made with a trusted mate's identity key.
    ///
    /// Unknown mates are an error; a malformed signature simply does not
    /// verify.
    pub fn verify_mate_signature(&self, id: &str, data: &[u8], signature_b64: &str) -> Result<bool> {
        let public_key = {
            let mates = self.mates.read();
            let mate = mates.iter().find(|m| m.id == id).ok_or(Error::MateNotFound)?;
            mate.public_key_bytes()?
        };
        let Ok(signature) = Signature::from_base64(signature_b64) else {
            return Ok(false);
        };
        Ok(verify(&public_key, data, &signature))
    }

    /// Run `change` under the write lock and persist the result.
    ///
    /// On any failure the set is restored to what it was before.
    fn mutate<T>(&self, change: impl FnOnce(&mut Vec<TrustedMate>) -> Result<T>) -> Result<T> {
        let mut mates = self.mates.write();
        let snapshot = mates.clone();

        let out = change(&mut mates)?;

        if let Err(e) = persist(&self.path, &mates) {
            *mates = snapshot;
            tracing::warn!("Trust store save failed, change rolled back: {}", e);
            return Err(e);
        }
        Ok(out)
    }
}

fn persist(path: &Path, mates: &[TrustedMate]) -> Result<()> {
    let json = serde_json::to_vec_pretty(mates)?;
    write_private_file(path, &json)?;
    tracing::debug!("Saved {} trusted mates to {}", mates.len(), path.display());
    Ok(())
}

fn find_mut<'a>(mates: &'a mut [TrustedMate], id: &str) -> Result<&'a mut TrustedMate> {
    mates.iter_mut().find(|m| m.id == id).ok_or(Error::MateNotFound)
}

fn has_public_key(mate: &TrustedMate, public_key: &[u8; PUBLIC_KEY_SIZE]) -> bool {
    mate.public_key_bytes().is_ok_and(|k| &k == public_key)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encode_base64, SigningKeyPair};
    use crate::storage::TRUST_FILE;
    use crate::time::ManualClock;
    use std::fs;

    fn mate(name: &str, secret: Option<[u8; 32]>) -> TrustedMate {
        let key = SigningKeyPair::generate();
        let secret = secret.map(SharedSecret::from_bytes);
        TrustedMate::new(
            name,
            "desktop",
            encode_base64(key.public_bytes()),
            None,
            secret.as_ref(),
            Utc::now(),
        )
    }

    fn store_in(dir: &Path) -> TrustStore {
        TrustStore::load(dir.join(TRUST_FILE)).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.is_empty());
        assert!(!dir.path().join(TRUST_FILE).exists());
    }

    #[test]
    fn test_insert_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let added = store.insert(mate("alpha", Some([3u8; 32]))).unwrap();
        assert_eq!(added.id.len(), 32);

        let reloaded = store_in(dir.path());
        assert_eq!(reloaded.list(), store.list());
        assert_eq!(reloaded.get(&added.id).unwrap().name, "alpha");
    }

    #[test]
    fn test_json_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.insert(mate("alpha", Some([3u8; 32]))).unwrap();

        let raw = fs::read_to_string(dir.path().join(TRUST_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let record = &json[0];
        for field in [
            "id",
            "name",
            "type",
            "public_key",
            "shared_secret",
            "paired_at",
            "last_seen",
            "metadata",
            "model",
            "system_prompt",
            "active_mode",
        ] {
            assert!(record.get(field).is_some(), "missing {field}");
        }
        assert_eq!(record["shared_secret"], encode_base64([3u8; 32]));
    }

    #[test]
    fn test_corrupt_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TRUST_FILE);

        fs::write(&path, "{ not an array").unwrap();
        assert!(matches!(
            TrustStore::load(&path),
            Err(Error::CorruptTrustStore(_))
        ));

        let mut bad = mate("alpha", None);
        bad.public_key = encode_base64([1u8; 31]);
        fs::write(&path, serde_json::to_vec(&vec![bad]).unwrap()).unwrap();
        assert!(matches!(
            TrustStore::load(&path),
            Err(Error::CorruptTrustStore(_))
        ));
    }

    #[test]
    fn test_remove_is_not_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let added = store.insert(mate("alpha", None)).unwrap();

        store.remove(&added.id).unwrap();
        assert!(matches!(store.remove(&added.id), Err(Error::MateNotFound)));
        assert!(store_in(dir.path()).is_empty());
    }

    #[test]
    fn test_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.get("nope").is_none());
        assert!(matches!(store.update_last_seen("nope"), Err(Error::MateNotFound)));
        assert!(matches!(
            store.update_config("nope", MateConfigUpdate::default()),
            Err(Error::MateNotFound)
        ));
        assert!(matches!(
            store.set_metadata("nope", "k", "v"),
            Err(Error::MateNotFound)
        ));
        assert!(matches!(
            store.open_secure_channel("nope"),
            Err(Error::MateNotFound)
        ));
    }

    #[test]
    fn test_update_last_seen_uses_clock() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let store = TrustStore::load_with_clock(dir.path().join(TRUST_FILE), clock.clone()).unwrap();
        let added = store.insert(mate("alpha", None)).unwrap();

        clock.advance(chrono::Duration::hours(2));
        store.update_last_seen(&added.id).unwrap();

        let reloaded = store_in(dir.path());
        assert_eq!(
            reloaded.get(&added.id).unwrap().last_seen,
            start + chrono::Duration::hours(2)
        );
    }

    #[test]
    fn test_update_config_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let added = store.insert(mate("alpha", None)).unwrap();

        store
            .update_config(
                &added.id,
                MateConfigUpdate {
                    model: Some("large".into()),
                    system_prompt: Some("be brief".into()),
                    active_mode: Some("chat".into()),
                },
            )
            .unwrap();
        let updated = store
            .update_config(
                &added.id,
                MateConfigUpdate {
                    active_mode: Some("voice".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.model, "large");
        assert_eq!(updated.system_prompt, "be brief");
        assert_eq!(updated.active_mode, "voice");
        assert_eq!(store_in(dir.path()).get(&added.id).unwrap(), updated);
    }

    #[test]
    fn test_set_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let added = store.insert(mate("alpha", None)).unwrap();

        store.set_metadata(&added.id, "os", "linux").unwrap();
        let reloaded = store_in(dir.path());
        assert_eq!(
            reloaded.get(&added.id).unwrap().metadata.get("os").map(String::as_str),
            Some("linux")
        );
    }

    #[test]
    fn test_find_by_public_key_and_uniqueness() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let first = mate("alpha", None);
        let key = first.public_key_bytes().unwrap();
        store.insert(first.clone()).unwrap();

        assert!(store.contains_public_key(&key));
        assert_eq!(store.find_by_public_key(&key).unwrap().id, first.id);
        assert!(store.find_by_public_key(&[9u8; 32]).is_none());

        let mut again = mate("alpha again", None);
        again.public_key = first.public_key.clone();
        assert!(matches!(
            store.insert_unique(again.clone()),
            Err(Error::DuplicateMate)
        ));
        assert_eq!(store.len(), 1);

        // Plain insert allows re-pairing the same key
        store.insert(again).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_open_secure_channel_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let identity_only = store.insert(mate("no-secret", None)).unwrap();
        assert!(matches!(
            store.open_secure_channel(&identity_only.id),
            Err(Error::NoSharedSecret)
        ));

        let mut short = mate("short", None);
        short.shared_secret = Some(encode_base64([1u8; 16]));
        let short = store.insert(short).unwrap();
        assert!(matches!(
            store.open_secure_channel(&short.id),
            Err(Error::InvalidSharedSecret(_))
        ));

        let good = store.insert(mate("good", Some([7u8; 32]))).unwrap();
        let channel = store.open_secure_channel(&good.id).unwrap();
        let expected = SecureChannel::from_shared_secret(&SharedSecret::from_bytes([7u8; 32])).unwrap();
        let sealed = channel.encrypt(b"ping").unwrap();
        assert_eq!(expected.decrypt(&sealed).unwrap(), b"ping");
    }

    #[test]
    fn test_bad_shared_secret_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let mut short = mate("short", None);
        short.shared_secret = Some("%%%".into());
        let short = store.insert(short).unwrap();

        let reloaded = store_in(dir.path());
        assert!(matches!(
            reloaded.open_secure_channel(&short.id),
            Err(Error::InvalidSharedSecret(_))
        ));
    }

    #[test]
    fn test_verify_mate_signature() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let key = SigningKeyPair::generate();
        let added = store
            .insert(TrustedMate::new(
                "signer",
                "phone",
                encode_base64(key.public_bytes()),
                None,
                None,
                Utc::now(),
            ))
            .unwrap();

        let signature = key.sign(b"status: ok").to_base64();
        assert!(store.verify_mate_signature(&added.id, b"status: ok", &signature).unwrap());
        assert!(!store.verify_mate_signature(&added.id, b"status: bad", &signature).unwrap());
        assert!(!store.verify_mate_signature(&added.id, b"status: ok", "garbage").unwrap());
        assert!(matches!(
            store.verify_mate_signature("nope", b"x", &signature),
            Err(Error::MateNotFound)
        ));
    }

    #[test]
    fn test_persistence_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("state");
        let store = TrustStore::load(parent.join(TRUST_FILE)).unwrap();

        // A regular file where the parent directory should be
        fs::write(&parent, b"blocker").unwrap();

        let err = store.insert(mate("alpha", None)).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(store.is_empty());

        fs::remove_file(&parent).unwrap();
        let added = store.insert(mate("alpha", None)).unwrap();

        fs::remove_dir_all(&parent).unwrap();
        fs::write(&parent, b"blocker").unwrap();
        assert!(store.remove(&added.id).is_err());
        assert_eq!(store.len(), 1);
        assert!(store.get(&added.id).is_some());
    }

    #[test]
    fn test_debug_redacts_shared_secret() {
        let m = mate("alpha", Some([3u8; 32]));
        let debug = format!("{m:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&encode_base64([3u8; 32])));
    }

    #[test]
    fn test_concurrent_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.insert(mate(&format!("mate-{i}"), None)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        assert_eq!(store_in(dir.path()).len(), 8);
    }
}
