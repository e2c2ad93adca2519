//! # Error Handling
//!
//! This module provides the error types for Vajra Core.
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
//! │  ├── Identity Errors                                                   │
//! │  │   ├── NoIdentity            - No identity stored or loaded          │
//! │  │   ├── IdentityLocked        - Private key still wrapped             │
//! │  │   ├── InvalidHandle         - Handle rejected before registration   │
//! │  │   └── KeyDerivationFailed   - Bad PBKDF2 parameters                 │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── DecodeError           - Malformed transport text / framing    │
//! │  │   ├── KeyFormatError        - Bad or incompatible key material      │
//! │  │   ├── AuthenticationError   - Wrong password OR corrupted wrapper   │
//! │  │   ├── UnsealError           - Key envelope could not be opened      │
//! │  │   ├── IntegrityError        - File ciphertext failed its tag check  │
//! │  │   ├── EncryptionFailed      - Encryption operation failed           │
//! │  │   └── UnsupportedVersion    - Unknown wire format version           │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── ReadError             - Failed to read local storage          │
//! │  │   ├── WriteError            - Failed to write local storage         │
//! │  │   └── Corrupted             - Stored record is unreadable           │
//! │  │                                                                      │
//! │  └── Relay Errors                                                      │
//! │      ├── RelayUnavailable      - Transport failure talking to relay    │
//! │      ├── HandleTaken           - Handle already registered             │
//! │      ├── NotFound              - Relay has no such record              │
//! │      └── ProtocolError         - Relay answered with something odd     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cryptographic failures are terminal
//!
//! `AuthenticationError`, `UnsealError` and `IntegrityError` end the
//! operation in progress. Nothing partial is returned and nothing is retried:
//! re-running `unwrap` with the same password fails the same way, so only a
//! new password attempt should trigger another call.
//!
//! None of the variants carry secret material. The crypto variants carry no
//! detail at all, so a wrong password and a corrupted wrapper look identical.

use thiserror::Error;

/// Result type alias for Vajra Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Vajra Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Identity Errors (200-299)
    // ========================================================================

    /// No identity has been stored or loaded
    #[error("No identity loaded. Register or log in first.")]
    NoIdentity,

    /// The identity's private key is still wrapped
    #[error("Identity is locked. Unlock it with your password first.")]
    IdentityLocked,

    /// Handle failed validation
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Key derivation parameters were rejected
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// Malformed transport text or binary framing
    #[error("Malformed encoded data: {0}")]
    DecodeError(String),

    /// Key material could not be generated, parsed or is the wrong size
    #[error("Invalid key: {0}")]
    KeyFormatError(String),

    /// Wrapper AEAD check failed
    #[error("Incorrect password or corrupted key")]
    AuthenticationError,

    /// Content-key envelope could not be opened with this private key
    #[error("Could not open the key envelope: wrong key or corrupted package")]
    UnsealError,

    /// File content failed AEAD verification
    #[error("File integrity check failed: the package was altered or does not match its key")]
    IntegrityError,

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Wire format version this build does not understand
    #[error("Unsupported package version: {0}")]
    UnsupportedVersion(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// Failed to read from storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// Stored data could not be interpreted
    #[error("Data corruption detected: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Relay Errors (500-599)
    // ========================================================================

    /// The relay could not be reached or failed mid-request
    #[error("Relay unavailable: {0}")]
    RelayUnavailable(String),

    /// Handle is already registered with the relay
    #[error("Handle already registered: {0}")]
    HandleTaken(String),

    /// Relay has no record for the request
    #[error("Not found: {0}")]
    NotFound(String),

    /// Relay response did not match the protocol
    #[error("Relay protocol error: {0}")]
    ProtocolError(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 200-299: Identity
    /// - 300-399: Crypto
    /// - 400-499: Storage
    /// - 500-599: Relay
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Identity (200-299)
            Error::NoIdentity => 200,
            Error::IdentityLocked => 201,
            Error::InvalidHandle(_) => 202,
            Error::KeyDerivationFailed(_) => 203,

            // Crypto (300-399)
            Error::DecodeError(_) => 300,
            Error::KeyFormatError(_) => 301,
            Error::AuthenticationError => 302,
            Error::UnsealError => 303,
            Error::IntegrityError => 304,
            Error::EncryptionFailed(_) => 305,
            Error::UnsupportedVersion(_) => 306,

            // Storage (400-499)
            Error::StorageReadError(_) => 400,
            Error::StorageWriteError(_) => 401,
            Error::StorageCorrupted(_) => 402,

            // Relay (500-599)
            Error::RelayUnavailable(_) => 500,
            Error::HandleTaken(_) => 501,
            Error::NotFound(_) => 502,
            Error::ProtocolError(_) => 503,

            // Internal (900-999)
            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Only transport failures qualify. Cryptographic failures are
    /// deterministic and retrying them cannot succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RelayUnavailable(_))
    }

    /// Check if this error requires user action
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::NoIdentity
                | Error::IdentityLocked
                | Error::InvalidHandle(_)
                | Error::AuthenticationError
                | Error::HandleTaken(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
