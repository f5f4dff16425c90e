//! # Navigator Core
//!
//! Device pairing and end-to-end secure channels between a controlling node
//! (the *navigator*) and the peers it trusts (*mates*).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            NAVIGATOR CORE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                         Navigator (facade)                        │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │          │                      │                        │              │
//! │          ▼                      ▼                        ▼              │
//! │  ┌───────────────┐    ┌────────────────────┐    ┌────────────────┐     │
//! │  │ IdentityStore │◄───│ PairingCoordinator │───►│   TrustStore   │     │
//! │  │               │    │                    │    │                │     │
//! │  │ • Ed25519     │    │ • Pending requests │    │ • TrustedMate  │     │
//! │  │ • X25519      │    │ • Pairing codes    │    │ • JSON on disk │     │
//! │  │               │    │ • Event bus        │    │ • Channels     │     │
//! │  └───────────────┘    └────────────────────┘    └────────────────┘     │
//! │          │                      │                        │              │
//! │          └──────────────────────┼────────────────────────┘              │
//! │                                 ▼                                       │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                          crypto                                   │ │
//! │  │  Ed25519 • X25519 • HKDF-SHA256 • AES-256-GCM • SHA-256 codes     │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                          storage                                  │ │
//! │  │           atomic 0600 writes: navigator_keys.json                 │ │
//! │  │                                  trusted_mates.json               │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use navigator_core::{Navigator, NavigatorConfig};
//!
//! let navigator = Navigator::open(NavigatorConfig::with_data_dir("/var/lib/navigator"))?;
//!
//! let request = navigator.initiate_pairing("Laptop", "desktop", &mate_key, Some(&mate_xkey))?;
//! // show request.pairing_code to the user, then:
//! let mate = navigator.approve(&request.id)?;
//!
//! let channel = navigator.open_secure_channel(&mate.id)?;
//! let ciphertext = channel.encrypt(b"hello")?;
//! ```
//!
//! There is no transport here. Callers deliver key material and ciphertext
//! over whatever channel they already have.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod pairing;
pub mod storage;
pub mod time;
pub mod trust;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::{NavigatorConfig, PairingConfig};
pub use crypto::{SecureChannel, Signature};
pub use error::{Error, Result};
pub use identity::IdentityStore;
pub use pairing::{PairingCoordinator, PairingEvent, PairingRequest, PairingState};
pub use trust::{MateConfigUpdate, TrustStore, TrustedMate};

// ============================================================================
// NAVIGATOR
// ============================================================================

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::time::{Clock, SystemClock};

/// A navigator rooted at one data directory.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Navigator {
    config: NavigatorConfig,
    identity: Arc<IdentityStore>,
    trust: Arc<TrustStore>,
    pairing: PairingCoordinator,
}

impl Navigator {
    /// Load or create the identity and load the trust store
    pub fn open(config: NavigatorConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`Navigator::open`] with an explicit time source
    pub fn with_clock(config: NavigatorConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Opening navigator v{} in {}",
            version(),
            config.data_dir.display()
        );

        let identity = Arc::new(IdentityStore::load_or_create(config.identity_path())?);
        let trust = Arc::new(TrustStore::load_with_clock(config.trust_path(), clock.clone())?);
        let pairing = PairingCoordinator::with_clock(
            identity.clone(),
            trust.clone(),
            config.pairing.clone(),
            clock,
        );

        tracing::info!(
            "Navigator {} ready with {} trusted mates",
            identity.fingerprint(),
            trust.len()
        );

        Ok(Self {
            config,
            identity,
            trust,
            pairing,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// The identity store
    pub fn identity(&self) -> &Arc<IdentityStore> {
        &self.identity
    }

    /// The trust store
    pub fn trust(&self) -> &Arc<TrustStore> {
        &self.trust
    }

    /// The pairing coordinator
    pub fn pairing(&self) -> &PairingCoordinator {
        &self.pairing
    }

    /// Navigator signing public key, base64
    pub fn public_key(&self) -> String {
        self.identity.public_key_b64()
    }

    /// Navigator exchange public key, base64
    pub fn exchange_public_key(&self) -> String {
        self.identity.exchange_public_key_b64()
    }

    /// SHA-256 fingerprint of the signing key
    pub fn fingerprint(&self) -> String {
        self.identity.fingerprint()
    }

    /// See [`PairingCoordinator::initiate_pairing`]
    pub fn initiate_pairing(
        &self,
        mate_name: &str,
        mate_type: &str,
        mate_public_key_b64: &str,
        mate_exchange_key_b64: Option<&str>,
    ) -> Result<PairingRequest> {
        self.pairing
            .initiate_pairing(mate_name, mate_type, mate_public_key_b64, mate_exchange_key_b64)
    }

    /// See [`PairingCoordinator::approve`]
    pub fn approve(&self, request_id: &str) -> Result<TrustedMate> {
        self.pairing.approve(request_id)
    }

    /// See [`PairingCoordinator::reject`]
    pub fn reject(&self, request_id: &str) -> Result<()> {
        self.pairing.reject(request_id)
    }

    /// Unexpired pairing requests
    pub fn list_pending(&self) -> Vec<PairingRequest> {
        self.pairing.list_pending()
    }

    /// Drop expired pairing requests
    pub fn prune_expired(&self) -> usize {
        self.pairing.prune_expired()
    }

    /// Subscribe to pairing events
    pub fn subscribe(&self) -> broadcast::Receiver<PairingEvent> {
        self.pairing.subscribe()
    }

    /// All trusted mates
    pub fn list_trusted(&self) -> Vec<TrustedMate> {
        self.trust.list()
    }

    /// One trusted mate
    pub fn get_trusted(&self, mate_id: &str) -> Option<TrustedMate> {
        self.trust.get(mate_id)
    }

    /// Forget a mate
    pub fn remove(&self, mate_id: &str) -> Result<TrustedMate> {
        self.trust.remove(mate_id)
    }

    /// Record that a mate was just seen
    pub fn touch(&self, mate_id: &str) -> Result<()> {
        self.trust.update_last_seen(mate_id)
    }

    /// Change a mate's model, system prompt or mode
    pub fn update_mate_config(&self, mate_id: &str, update: MateConfigUpdate) -> Result<TrustedMate> {
        self.trust.update_config(mate_id, update)
    }

    /// Sign data with the navigator identity
    pub fn sign(&self, data: &[u8]) -> Signature {
        self.identity.sign(data)
    }

    /// Check data signed by a trusted mate
    pub fn verify_mate_signature(&self, mate_id: &str, data: &[u8], signature_b64: &str) -> Result<bool> {
        self.trust.verify_mate_signature(mate_id, data, signature_b64)
    }

    /// AES-GCM channel to a trusted mate
    pub fn open_secure_channel(&self, mate_id: &str) -> Result<SecureChannel> {
        self.trust.open_secure_channel(mate_id)
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Navigator Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
