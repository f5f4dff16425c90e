//! # Error Handling
//!
//! Error types for Navigator Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Core Errors                                                       │
//! │  │   └── Config                - Configuration could not be loaded     │
//! │  │                                                                      │
//! │  ├── Identity Errors                                                   │
//! │  │   └── KeyLoad               - Persisted identity is malformed       │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── InvalidPublicKey      - Bad signing key from a mate           │
//! │  │   ├── InvalidExchangeKey    - Bad / low-order X25519 key            │
//! │  │   ├── InvalidSharedSecret   - Stored secret is not 32 bytes         │
//! │  │   ├── NoSharedSecret        - Mate paired without key exchange      │
//! │  │   ├── CiphertextTooShort    - Input shorter than the nonce          │
//! │  │   ├── EncryptionFailed      - AEAD seal failed                      │
//! │  │   ├── DecryptionFailed      - AEAD open failed (no detail)          │
//! │  │   └── KeyDerivationFailed   - HKDF expansion failed                 │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── CorruptTrustStore     - trusted_mates.json is malformed       │
//! │  │   └── Persistence           - Disk write failed                     │
//! │  │                                                                      │
//! │  └── Pairing Errors                                                    │
//! │      ├── RequestNotFound       - No such pending request               │
//! │      ├── RequestExpired        - Request outlived its TTL              │
//! │      ├── MateNotFound          - No such trusted mate                  │
//! │      └── DuplicateMate         - Signing key already trusted           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation and crypto failures are final: retrying a MAC or signature
//! check with the same input cannot succeed. Only [`Error::Persistence`]
//! is reported as recoverable.

use thiserror::Error;

/// Result type alias for Navigator Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Navigator Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Core Errors (100-199)
    // ========================================================================

    /// Configuration file could not be read or parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ========================================================================
    // Identity Errors (200-299)
    // ========================================================================

    /// The persisted navigator identity is malformed.
    ///
    /// Never answered by regenerating keys: a new identity would silently
    /// invalidate every existing pairing.
    #[error("Failed to load navigator identity: {0}")]
    KeyLoad(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Mate signing key is not valid base64 or not 32 bytes
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Exchange key is malformed or produced a low-order shared secret
    #[error("Invalid exchange key: {0}")]
    InvalidExchangeKey(String),

    /// Stored shared secret does not decode to exactly 32 bytes
    #[error("Invalid shared secret: {0}")]
    InvalidSharedSecret(String),

    /// The mate was paired without an exchange key
    #[error("No shared secret established with this mate")]
    NoSharedSecret,

    /// Ciphertext is shorter than the nonce prefix
    #[error("Ciphertext too short")]
    CiphertextTooShort,

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed.
    ///
    /// Deliberately carries no detail so a wrong key, a flipped bit and a
    /// truncated tag all look the same to the caller.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// The trust store file exists but cannot be parsed
    #[error("Trust store is corrupt: {0}")]
    CorruptTrustStore(String),

    /// Writing state to disk failed
    #[error("Failed to persist state: {0}")]
    Persistence(String),

    // ========================================================================
    // Pairing Errors (600-699)
    // ========================================================================

    /// Pairing request not found
    #[error("Pairing request not found.")]
    RequestNotFound,

    /// Pairing request has expired
    #[error("Pairing request has expired.")]
    RequestExpired,

    /// Trusted mate not found
    #[error("Trusted mate not found.")]
    MateNotFound,

    /// A mate with the same signing key is already trusted
    #[error("A mate with this public key is already trusted.")]
    DuplicateMate,

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Core
    /// - 200-299: Identity
    /// - 300-399: Crypto
    /// - 400-499: Storage
    /// - 600-699: Pairing
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Core (100-199)
            Error::Config(_) => 100,

            // Identity (200-299)
            Error::KeyLoad(_) => 200,

            // Crypto (300-399)
            Error::InvalidPublicKey(_) => 300,
            Error::InvalidExchangeKey(_) => 301,
            Error::InvalidSharedSecret(_) => 302,
            Error::NoSharedSecret => 303,
            Error::CiphertextTooShort => 304,
            Error::EncryptionFailed(_) => 305,
            Error::DecryptionFailed => 306,
            Error::KeyDerivationFailed(_) => 307,

            // Storage (400-499)
            Error::CorruptTrustStore(_) => 400,
            Error::Persistence(_) => 401,

            // Pairing (600-699)
            Error::RequestNotFound => 600,
            Error::RequestExpired => 601,
            Error::MateNotFound => 602,
            Error::DuplicateMate => 603,

            // Internal (900-999)
            Error::Serialization(_) => 900,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Only disk failures can succeed on a later attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }

    /// Generic text safe to return over a network boundary.
    ///
    /// Collapses every pairing and channel failure into one denial so a
    /// remote caller cannot tell which validation step rejected it.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::CiphertextTooShort | Error::DecryptionFailed => "decryption failed",
            Error::InvalidPublicKey(_)
            | Error::InvalidExchangeKey(_)
            | Error::RequestNotFound
            | Error::RequestExpired
            | Error::DuplicateMate => "pairing failed",
            Error::MateNotFound | Error::NoSharedSecret | Error::InvalidSharedSecret(_) => {
                "mate not available"
            }
            _ => "internal error",
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
