//! # Pairing Module
//!
//! The interactive approval flow that turns an unknown mate into a
//! trusted one.
//!
//! ## Pairing Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PAIRING FLOW                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Mate                                Navigator                         │
//! │  ─────────────────────────────────────────────────────────────         │
//! │                                                                         │
//! │  1. Present keys                                                       │
//! │     signing key, exchange key ──────► initiate_pairing()               │
//! │                                       ┌──────────────────────────┐     │
//! │                                       │ validate keys            │     │
//! │                                       │ code = SHA-256(mate||nav)│     │
//! │                                       │ store Pending (5 min)    │     │
//! │                                       │ emit Requested           │     │
//! │                                       └──────────────────────────┘     │
//! │                                                                         │
//! │  2. Both screens show "042917"  ◄── human compares ──►                 │
//! │                                                                         │
//! │  3. User decides                      approve()         reject()       │
//! │                                       ┌──────────────┐  ┌──────────┐   │
//! │                                       │ ECDH secret  │  │ drop     │   │
//! │                                       │ TrustedMate  │  │ request  │   │
//! │                                       │ persist      │  │ emit     │   │
//! │                                       │ emit Approved│  │ Rejected │   │
//! │                                       └──────────────┘  └──────────┘   │
//! │                                                                         │
//! │  4. Mate computes the same ECDH secret from its side                   │
//! │     and both open SecureChannel(HKDF(secret))                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## States
//!
//! `Pending → Approved | Rejected`. A request whose `expires_at` has passed
//! is treated as absent by every read path and evicted the next time it is
//! touched or when [`PairingCoordinator::prune_expired`] runs.
//!
//! ## Locking
//!
//! Each public method takes the pending-map lock once. `approve` holds it
//! across the single trust store insert, so lock order is always
//! pending → trust. Events are published after the lock is released.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::PairingConfig;
use crate::crypto::{
    compute_shared_secret, decode_fixed, derive_pairing_code, fingerprint, generate_random_id,
    PUBLIC_KEY_SIZE,
};
use crate::error::{Error, Result};
use crate::identity::IdentityStore;
use crate::time::{Clock, SystemClock};
use crate::trust::{TrustStore, TrustedMate};

/// Length in bytes of a request id before hex encoding
pub const REQUEST_ID_BYTES: usize = 16;

/// Lifecycle state of a pairing request
///
/// A resolved request leaves the pending map, so every [`PairingRequest`]
/// the coordinator hands out is `Pending`. Approval and rejection are
/// reported through [`PairingEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingState {
    /// Waiting for the user
    Pending,
    /// Approved; a trusted mate was created
    Approved,
    /// Rejected by the user
    Rejected,
}

/// A pairing attempt awaiting a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRequest {
    /// Random 32-character hex id
    pub id: String,
    /// Name the mate presented
    pub mate_name: String,
    /// Kind of mate
    pub mate_type: String,
    /// Mate signing key, base64
    pub mate_public_key: String,
    /// Mate exchange key, base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mate_exchange_key: Option<String>,
    /// Six digits shown on both devices
    pub pairing_code: String,
    /// Current state
    pub state: PairingState,
    /// When the request was made
    pub created_at: DateTime<Utc>,
    /// After this instant the request can no longer be resolved
    pub expires_at: DateTime<Utc>,
}

impl PairingRequest {
    /// Whether the request has expired at `now`.
    ///
    /// The request is still valid at exactly `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Notification published on every pairing transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PairingEvent {
    /// A mate asked to pair
    Requested(PairingRequest),
    /// The user approved; `mate_id` is the new trusted mate
    Approved {
        /// Resolved request
        request_id: String,
        /// New trusted mate id
        mate_id: String,
        /// Mate display name
        mate_name: String,
    },
    /// The user rejected
    Rejected {
        /// Resolved request
        request_id: String,
    },
    /// The request timed out before a decision
    Expired {
        /// Dropped request
        request_id: String,
    },
}

/// Pending request plus the decoded exchange key
#[derive(Debug, Clone)]
struct PendingEntry {
    request: PairingRequest,
    exchange_key: Option<[u8; PUBLIC_KEY_SIZE]>,
}

/// Drives pairing requests from presentation to trust
pub struct PairingCoordinator {
    identity: Arc<IdentityStore>,
    trust: Arc<TrustStore>,
    pending: RwLock<HashMap<String, PendingEntry>>,
    events: broadcast::Sender<PairingEvent>,
    clock: Arc<dyn Clock>,
    config: PairingConfig,
}

impl PairingCoordinator {
    /// Create a coordinator on the system clock
    pub fn new(identity: Arc<IdentityStore>, trust: Arc<TrustStore>, config: PairingConfig) -> Self {
        Self::with_clock(identity, trust, config, Arc::new(SystemClock))
    }

    /// Create a coordinator with an explicit time source
    pub fn with_clock(
        identity: Arc<IdentityStore>,
        trust: Arc<TrustStore>,
        config: PairingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            identity,
            trust,
            pending: RwLock::new(HashMap::new()),
            events,
            clock,
            config,
        }
    }

    /// Subscribe to pairing events
    pub fn subscribe(&self) -> broadcast::Receiver<PairingEvent> {
        self.events.subscribe()
    }

    /// Register a pairing request from a mate.
    ///
    /// The returned request carries the pairing code to show the user.
    pub fn initiate_pairing(
        &self,
        mate_name: &str,
        mate_type: &str,
        mate_public_key_b64: &str,
        mate_exchange_key_b64: Option<&str>,
    ) -> Result<PairingRequest> {
        let mate_key = decode_fixed::<PUBLIC_KEY_SIZE>(mate_public_key_b64)
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;

        let exchange_key = match mate_exchange_key_b64 {
            Some(encoded) => {
                let key = decode_fixed::<PUBLIC_KEY_SIZE>(encoded)
                    .map_err(|e| Error::InvalidExchangeKey(e.to_string()))?;
                // Low-order points are refused now rather than at approval
                compute_shared_secret(self.identity.exchange_keypair(), &key)?;
                Some(key)
            }
            None => None,
        };

        let now = self.clock.now();
        let request = PairingRequest {
            id: generate_random_id(REQUEST_ID_BYTES),
            mate_name: mate_name.to_string(),
            mate_type: mate_type.to_string(),
            mate_public_key: mate_public_key_b64.trim().to_string(),
            mate_exchange_key: mate_exchange_key_b64.map(|k| k.trim().to_string()),
            pairing_code: derive_pairing_code(&mate_key, &self.identity.public_key()),
            state: PairingState::Pending,
            created_at: now,
            expires_at: now + self.config.request_ttl(),
        };

        let expired = {
            let mut pending = self.pending.write();
            let expired = drain_expired(&mut pending, now);
            pending.insert(
                request.id.clone(),
                PendingEntry {
                    request: request.clone(),
                    exchange_key,
                },
            );
            expired
        };

        self.publish_expired(expired);
        tracing::info!(
            "Pairing requested by {} ({}), request {}",
            request.mate_name,
            fingerprint(&mate_key),
            request.id
        );
        self.publish(PairingEvent::Requested(request.clone()));

        Ok(request)
    }

    /// Approve a pending request and trust the mate.
    ///
    /// If the trust store cannot be saved the request stays pending and can
    /// be approved again.
    pub fn approve(&self, request_id: &str) -> Result<TrustedMate> {
        let now = self.clock.now();
        let mut pending = self.pending.write();

        let entry = pending.get(request_id).ok_or(Error::RequestNotFound)?;
        if entry.request.is_expired_at(now) {
            pending.remove(request_id);
            drop(pending);
            tracing::warn!("Approval of expired pairing request {}", request_id);
            self.publish_expired(vec![request_id.to_string()]);
            return Err(Error::RequestExpired);
        }

        let mate = build_mate(entry, &self.identity, now)?;
        let mate = if self.config.reject_duplicate_keys {
            self.trust.insert_unique(mate)?
        } else {
            self.trust.insert(mate)?
        };

        pending.remove(request_id);
        drop(pending);

        tracing::info!(
            "Approved pairing request {}: trusted mate {} ({})",
            request_id,
            mate.name,
            mate.id
        );
        self.publish(PairingEvent::Approved {
            request_id: request_id.to_string(),
            mate_id: mate.id.clone(),
            mate_name: mate.name.clone(),
        });

        Ok(mate)
    }

    /// Reject a pending request
    pub fn reject(&self, request_id: &str) -> Result<()> {
        let now = self.clock.now();
        let entry = self
            .pending
            .write()
            .remove(request_id)
            .ok_or(Error::RequestNotFound)?;

        if entry.request.is_expired_at(now) {
            self.publish_expired(vec![entry.request.id]);
            return Err(Error::RequestExpired);
        }

        tracing::info!("Rejected pairing request {}", request_id);
        self.publish(PairingEvent::Rejected {
            request_id: request_id.to_string(),
        });
        Ok(())
    }

    /// Requests that can still be resolved, oldest first
    pub fn list_pending(&self) -> Vec<PairingRequest> {
        let now = self.clock.now();
        let mut requests: Vec<PairingRequest> = self
            .pending
            .read()
            .values()
            .filter(|e| !e.request.is_expired_at(now))
            .map(|e| e.request.clone())
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        requests
    }

    /// A single unexpired request
    pub fn get_pending(&self, request_id: &str) -> Option<PairingRequest> {
        let now = self.clock.now();
        self.pending
            .read()
            .get(request_id)
            .filter(|e| !e.request.is_expired_at(now))
            .map(|e| e.request.clone())
    }

    /// Evict every expired request, returning how many were dropped
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let expired = drain_expired(&mut self.pending.write(), now);
        let count = expired.len();
        if count > 0 {
            tracing::debug!("Pruned {} expired pairing requests", count);
        }
        self.publish_expired(expired);
        count
    }

    fn publish(&self, event: PairingEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    fn publish_expired(&self, request_ids: Vec<String>) {
        for request_id in request_ids {
            self.publish(PairingEvent::Expired { request_id });
        }
    }
}

fn drain_expired(pending: &mut HashMap<String, PendingEntry>, now: DateTime<Utc>) -> Vec<String> {
    let expired: Vec<String> = pending
        .values()
        .filter(|e| e.request.is_expired_at(now))
        .map(|e| e.request.id.clone())
        .collect();
    for id in &expired {
        pending.remove(id);
    }
    expired
}

fn build_mate(entry: &PendingEntry, identity: &IdentityStore, now: DateTime<Utc>) -> Result<TrustedMate> {
    let shared_secret = entry
        .exchange_key
        .map(|key| compute_shared_secret(identity.exchange_keypair(), &key))
        .transpose()?;

    Ok(TrustedMate::new(
        entry.request.mate_name.clone(),
        entry.request.mate_type.clone(),
        entry.request.mate_public_key.clone(),
        entry.request.mate_exchange_key.clone(),
        shared_secret.as_ref(),
        now,
    ))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encode_base64, ExchangeKeyPair, SecureChannel, SigningKeyPair};
    use crate::storage::{IDENTITY_FILE, TRUST_FILE};
    use crate::time::ManualClock;
    use chrono::Duration;
    use std::path::Path;

    struct Harness {
        _dir: tempfile::TempDir,
        clock: Arc<ManualClock>,
        identity: Arc<IdentityStore>,
        trust: Arc<TrustStore>,
        coordinator: PairingCoordinator,
    }

    fn harness_with(config: PairingConfig, trust_dir: Option<&Path>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let identity = Arc::new(IdentityStore::load_or_create(dir.path().join(IDENTITY_FILE)).unwrap());
        let trust_path = trust_dir.unwrap_or(dir.path()).join(TRUST_FILE);
        let trust = Arc::new(TrustStore::load_with_clock(trust_path, clock.clone()).unwrap());
        let coordinator =
            PairingCoordinator::with_clock(identity.clone(), trust.clone(), config, clock.clone());
        Harness {
            _dir: dir,
            clock,
            identity,
            trust,
            coordinator,
        }
    }

    fn harness() -> Harness {
        harness_with(PairingConfig::default(), None)
    }

    struct Mate {
        signing: SigningKeyPair,
        exchange: ExchangeKeyPair,
    }

    impl Mate {
        fn new() -> Self {
            Self {
                signing: SigningKeyPair::generate(),
                exchange: ExchangeKeyPair::generate(),
            }
        }

        fn public_b64(&self) -> String {
            encode_base64(self.signing.public_bytes())
        }

        fn exchange_b64(&self) -> String {
            encode_base64(self.exchange.public_bytes())
        }
    }

    fn initiate(h: &Harness, mate: &Mate) -> PairingRequest {
        h.coordinator
            .initiate_pairing("Desk", "desktop", &mate.public_b64(), Some(&mate.exchange_b64()))
            .unwrap()
    }

    #[test]
    fn test_initiate_pairing() {
        let h = harness();
        let mate = Mate::new();
        let request = initiate(&h, &mate);

        assert_eq!(request.id.len(), 32);
        assert_eq!(request.state, PairingState::Pending);
        assert_eq!(request.expires_at - request.created_at, Duration::minutes(5));
        assert_eq!(
            request.pairing_code,
            derive_pairing_code(&mate.signing.public_bytes(), &h.identity.public_key())
        );
        assert_eq!(h.coordinator.list_pending(), vec![request.clone()]);
        assert_eq!(h.coordinator.get_pending(&request.id), Some(request));
    }

    #[test]
    fn test_initiate_rejects_bad_keys() {
        let h = harness();
        let mate = Mate::new();

        let short = encode_base64([1u8; 31]);
        let long = encode_base64([1u8; 33]);
        for bad in ["", "!!!", short.as_str(), long.as_str()] {
            assert!(matches!(
                h.coordinator.initiate_pairing("x", "y", bad, None),
                Err(Error::InvalidPublicKey(_))
            ));
        }

        let half = encode_base64([1u8; 16]);
        let low_order = encode_base64([0u8; 32]);
        for bad in ["!!!", half.as_str(), low_order.as_str()] {
            assert!(matches!(
                h.coordinator
                    .initiate_pairing("x", "y", &mate.public_b64(), Some(bad)),
                Err(Error::InvalidExchangeKey(_))
            ));
        }

        assert!(h.coordinator.list_pending().is_empty());
    }

    #[test]
    fn test_approve_with_exchange_key() {
        let h = harness();
        let mate = Mate::new();
        let request = initiate(&h, &mate);

        let trusted = h.coordinator.approve(&request.id).unwrap();
        assert_eq!(trusted.name, "Desk");
        assert_eq!(trusted.mate_type, "desktop");
        assert_eq!(trusted.public_key, mate.public_b64());
        assert_eq!(trusted.paired_at, h.clock.now());

        let mate_side = mate
            .exchange
            .diffie_hellman(&h.identity.exchange_public_key())
            .unwrap();
        assert_eq!(trusted.shared_secret, Some(mate_side.to_base64()));

        assert!(h.coordinator.list_pending().is_empty());
        assert_eq!(h.trust.get(&trusted.id), Some(trusted.clone()));

        let navigator = h.trust.open_secure_channel(&trusted.id).unwrap();
        let mate_channel = SecureChannel::from_shared_secret(&mate_side).unwrap();
        let sealed = navigator.encrypt(b"welcome aboard").unwrap();
        assert_eq!(mate_channel.decrypt(&sealed).unwrap(), b"welcome aboard");
    }

    #[test]
    fn test_approve_identity_only() {
        let h = harness();
        let mate = Mate::new();
        let request = h
            .coordinator
            .initiate_pairing("Watch", "wearable", &mate.public_b64(), None)
            .unwrap();

        let trusted = h.coordinator.approve(&request.id).unwrap();
        assert!(trusted.shared_secret.is_none());
        assert!(trusted.exchange_key.is_none());
        assert!(matches!(
            h.trust.open_secure_channel(&trusted.id),
            Err(Error::NoSharedSecret)
        ));
    }

    #[test]
    fn test_approve_unknown_and_twice() {
        let h = harness();
        assert!(matches!(h.coordinator.approve("missing"), Err(Error::RequestNotFound)));

        let request = initiate(&h, &Mate::new());
        h.coordinator.approve(&request.id).unwrap();
        assert!(matches!(
            h.coordinator.approve(&request.id),
            Err(Error::RequestNotFound)
        ));
        assert_eq!(h.trust.len(), 1);
    }

    #[test]
    fn test_expiry_boundary() {
        let h = harness();
        let request = initiate(&h, &Mate::new());

        // Exactly at expires_at the request is still valid
        h.clock.set(request.expires_at);
        assert_eq!(h.coordinator.list_pending().len(), 1);
        assert!(h.coordinator.get_pending(&request.id).is_some());

        h.clock.advance(Duration::seconds(1));
        assert!(h.coordinator.list_pending().is_empty());
        assert!(h.coordinator.get_pending(&request.id).is_none());
        assert!(matches!(
            h.coordinator.approve(&request.id),
            Err(Error::RequestExpired)
        ));
        // Evicted by the failed approval
        assert!(matches!(
            h.coordinator.approve(&request.id),
            Err(Error::RequestNotFound)
        ));
        assert!(h.trust.is_empty());
    }

    #[test]
    fn test_approve_at_exact_expiry_succeeds() {
        let h = harness();
        let request = initiate(&h, &Mate::new());
        h.clock.set(request.expires_at);
        assert!(h.coordinator.approve(&request.id).is_ok());
    }

    #[test]
    fn test_reject() {
        let h = harness();
        let request = initiate(&h, &Mate::new());

        h.coordinator.reject(&request.id).unwrap();
        assert!(h.coordinator.list_pending().is_empty());
        assert!(matches!(
            h.coordinator.reject(&request.id),
            Err(Error::RequestNotFound)
        ));
        assert!(matches!(
            h.coordinator.approve(&request.id),
            Err(Error::RequestNotFound)
        ));
        assert!(h.trust.is_empty());
    }

    #[test]
    fn test_reject_expired() {
        let h = harness();
        let request = initiate(&h, &Mate::new());
        h.clock.advance(Duration::minutes(6));
        assert!(matches!(
            h.coordinator.reject(&request.id),
            Err(Error::RequestExpired)
        ));
    }

    #[test]
    fn test_prune_expired() {
        let h = harness();
        initiate(&h, &Mate::new());
        initiate(&h, &Mate::new());
        h.clock.advance(Duration::minutes(3));
        let fresh = initiate(&h, &Mate::new());

        h.clock.advance(Duration::minutes(3));
        assert_eq!(h.coordinator.prune_expired(), 2);
        assert_eq!(h.coordinator.prune_expired(), 0);
        assert_eq!(h.coordinator.list_pending(), vec![fresh]);
    }

    #[test]
    fn test_configured_ttl() {
        let config = PairingConfig {
            request_ttl_secs: 30,
            ..PairingConfig::default()
        };
        let h = harness_with(config, None);
        let request = initiate(&h, &Mate::new());
        assert_eq!(request.expires_at - request.created_at, Duration::seconds(30));
    }

    #[test]
    fn test_duplicate_keys_allowed_by_default() {
        let h = harness();
        let mate = Mate::new();
        let first = h.coordinator.approve(&initiate(&h, &mate).id).unwrap();
        let second = h.coordinator.approve(&initiate(&h, &mate).id).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(h.trust.len(), 2);
    }

    #[test]
    fn test_duplicate_keys_rejected_when_configured() {
        let config = PairingConfig {
            reject_duplicate_keys: true,
            ..PairingConfig::default()
        };
        let h = harness_with(config, None);
        let mate = Mate::new();

        h.coordinator.approve(&initiate(&h, &mate).id).unwrap();
        let again = initiate(&h, &mate);
        assert!(matches!(
            h.coordinator.approve(&again.id),
            Err(Error::DuplicateMate)
        ));
        assert_eq!(h.trust.len(), 1);
        // Still pending, so it can be rejected explicitly
        h.coordinator.reject(&again.id).unwrap();
    }

    #[test]
    fn test_failed_save_leaves_request_pending() {
        let state = tempfile::tempdir().unwrap();
        let trust_dir = state.path().join("trust");
        let h = harness_with(PairingConfig::default(), Some(&trust_dir));
        let request = initiate(&h, &Mate::new());

        std::fs::write(&trust_dir, b"blocker").unwrap();
        let err = h.coordinator.approve(&request.id).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(h.trust.is_empty());
        assert_eq!(h.coordinator.list_pending(), vec![request.clone()]);

        std::fs::remove_file(&trust_dir).unwrap();
        let trusted = h.coordinator.approve(&request.id).unwrap();
        assert_eq!(h.trust.get(&trusted.id), Some(trusted));
    }

    #[tokio::test]
    async fn test_events() {
        let h = harness();
        let mut first = h.coordinator.subscribe();
        let mut second = h.coordinator.subscribe();

        let approved = initiate(&h, &Mate::new());
        let mate = h.coordinator.approve(&approved.id).unwrap();
        let rejected = initiate(&h, &Mate::new());
        h.coordinator.reject(&rejected.id).unwrap();
        let expired = initiate(&h, &Mate::new());
        h.clock.advance(Duration::minutes(10));
        h.coordinator.prune_expired();

        let expected = vec![
            PairingEvent::Requested(approved.clone()),
            PairingEvent::Approved {
                request_id: approved.id.clone(),
                mate_id: mate.id.clone(),
                mate_name: mate.name.clone(),
            },
            PairingEvent::Requested(rejected.clone()),
            PairingEvent::Rejected {
                request_id: rejected.id.clone(),
            },
            PairingEvent::Requested(expired.clone()),
            PairingEvent::Expired {
                request_id: expired.id.clone(),
            },
        ];

        for rx in [&mut first, &mut second] {
            for event in &expected {
                assert_eq!(&rx.recv().await.unwrap(), event);
            }
        }
    }

    #[tokio::test]
    async fn test_resolution_reported_by_event_not_state() {
        let h = harness();
        let mut events = h.coordinator.subscribe();
        let first = initiate(&h, &Mate::new());
        let second = initiate(&h, &Mate::new());

        for request in h.coordinator.list_pending() {
            assert_eq!(request.state, PairingState::Pending);
        }
        assert_eq!(
            h.coordinator.get_pending(&first.id).unwrap().state,
            PairingState::Pending
        );

        h.coordinator.approve(&first.id).unwrap();
        h.coordinator.reject(&second.id).unwrap();
        assert!(h.coordinator.get_pending(&first.id).is_none());
        assert!(h.coordinator.get_pending(&second.id).is_none());

        let mut outcomes = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event {
                PairingEvent::Approved { request_id, .. } => outcomes.push(("approved", request_id)),
                PairingEvent::Rejected { request_id } => outcomes.push(("rejected", request_id)),
                _ => {}
            }
        }
        assert_eq!(outcomes, vec![("approved", first.id), ("rejected", second.id)]);
    }

    #[test]
    fn test_no_subscribers_does_not_block() {
        let h = harness();
        for _ in 0..200 {
            let request = initiate(&h, &Mate::new());
            h.coordinator.reject(&request.id).unwrap();
        }
    }

    #[test]
    fn test_concurrent_approvals() {
        let h = harness();
        let requests: Vec<_> = (0..8).map(|_| initiate(&h, &Mate::new())).collect();
        let coordinator = &h.coordinator;

        std::thread::scope(|s| {
            for request in &requests {
                s.spawn(move || coordinator.approve(&request.id).unwrap());
            }
        });

        assert_eq!(h.trust.len(), 8);
        assert!(coordinator.list_pending().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = PairingEvent::Rejected {
            request_id: "abc".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "rejected");
        assert_eq!(json["request_id"], "abc");
    }
}
