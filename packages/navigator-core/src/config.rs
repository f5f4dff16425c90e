//! Navigator configuration.
//!
//! Every field has a default, so an empty or partial TOML file is valid:
//!
//! ```toml
//! data_dir = "/var/lib/navigator"
//!
//! [pairing]
//! request_ttl_secs = 300
//! reject_duplicate_keys = false
//! event_capacity = 64
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{IDENTITY_FILE, TRUST_FILE};

/// Default lifetime of a pending pairing request (5 minutes)
pub const DEFAULT_REQUEST_TTL_SECS: u64 = 5 * 60;

/// Upper bound on the request lifetime (one day)
pub const MAX_REQUEST_TTL_SECS: u64 = 24 * 60 * 60;

/// Default buffer size of the pairing event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Directory holding `navigator_keys.json` and `trusted_mates.json`
    pub data_dir: PathBuf,
    /// Pairing behaviour
    pub pairing: PairingConfig,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            pairing: PairingConfig::default(),
        }
    }
}

/// Pairing coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Seconds a pending request stays approvable
    pub request_ttl_secs: u64,
    /// Refuse to approve a mate whose signing key is already trusted
    pub reject_duplicate_keys: bool,
    /// Events buffered per subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            request_ttl_secs: DEFAULT_REQUEST_TTL_SECS,
            reject_duplicate_keys: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PairingConfig {
    /// Request lifetime as a chrono duration
    pub fn request_ttl(&self) -> chrono::Duration {
        let secs = self.request_ttl_secs.min(MAX_REQUEST_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }
}

impl NavigatorConfig {
    /// Configuration rooted at `data_dir` with default pairing settings
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Parse TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the coordinator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.pairing.request_ttl_secs == 0 || self.pairing.request_ttl_secs > MAX_REQUEST_TTL_SECS {
            return Err(Error::Config(format!(
                "pairing.request_ttl_secs must be between 1 and {}",
                MAX_REQUEST_TTL_SECS
            )));
        }
        if self.pairing.event_capacity == 0 {
            return Err(Error::Config("pairing.event_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Path of the identity file
    pub fn identity_path(&self) -> PathBuf {
        self.data_dir.join(IDENTITY_FILE)
    }

    /// Path of the trust store file
    pub fn trust_path(&self) -> PathBuf {
        self.data_dir.join(TRUST_FILE)
    }
}
