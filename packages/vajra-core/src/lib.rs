//! # Vajra Core
//!
//! Cryptographic identity and hybrid file encryption for VajraShare:
//! confidential file transfer through a relay that only ever sees ciphertext.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          VAJRA CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Service (VajraCore)                         │   │
//! │  │   Request / Response dispatch · register · restore · send ·    │   │
//! │  │   receive                                                       │   │
//! │  └───────┬──────────────────┬──────────────────┬───────────────────┘   │
//! │          │                  │                  │                       │
//! │  ┌───────▼──────┐   ┌───────▼──────┐   ┌───────▼──────┐               │
//! │  │   Identity   │   │   Package    │   │    Relay     │               │
//! │  │              │   │              │   │              │               │
//! │  │ - Vault      │   │ - JSON v1    │   │ - trait      │               │
//! │  │ - Wrapped /  │   │ - Packed     │   │ - MemoryRelay│               │
//! │  │   Unlocked   │   │ - detect     │   │              │               │
//! │  └───────┬──────┘   └───────┬──────┘   └──────────────┘               │
//! │          │                  │                                          │
//! │  ┌───────▼──────────────────▼──────┐   ┌──────────────┐               │
//! │  │             Crypto              │   │   Storage    │               │
//! │  │                                 │   │              │               │
//! │  │ - RSA-OAEP-SHA256 key pairs     │   │ - MemoryStore│               │
//! │  │ - PBKDF2 → AES-256-GCM wrapper  │   │ - FileStore  │               │
//! │  │ - AES-256-GCM file content      │   │              │               │
//! │  │ - Base64 codec                  │   │              │               │
//! │  └─────────────────────────────────┘   └──────────────┘               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Codec, key derivation, key pairs, hybrid cipher, provider
//! - [`identity`] - Password vault and identity state machine
//! - [`package`] - File package wire formats
//! - [`relay`] - Relay interface and in-memory implementation
//! - [`storage`] - Local persistence of the wrapped identity
//! - [`service`] - Async operation dispatch and end-to-end flows
//!
//! ## Security Model
//!
//! | Secret | Where it lives | Protection |
//! |--------|----------------|------------|
//! | Password | caller memory only | never stored, never logged |
//! | Private key | memory while unlocked | stored and transmitted only wrapped |
//! | Content key | memory during one call | sealed to the recipient with RSA-OAEP |
//! | File plaintext | caller memory | AES-256-GCM on the wire and at the relay |
//!
//! The relay is trusted for availability only. It cannot read files, and a
//! relay that tampers with a package is detected on decrypt. It can still
//! hand out a wrong public key or lie about the sender: there is no key
//! pinning and no sender authentication.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod identity;
pub mod package;
pub mod relay;
pub mod service;
pub mod storage;

#[cfg(test)]
mod testing;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{
    CryptoProvider, DecryptedFile, ExportedPublicKey, HybridCipher, KdfParams, KeyPair,
    KeyPairManager, OsCryptoProvider, PrivateKeyHandle, Progress, PublicKeyHandle,
    SeededCryptoProvider,
};
pub use error::{Error, Result};
pub use identity::{Identity, IdentityState, IdentityVault, PasswordWrapper, Registration};
pub use package::{FilePackage, WireFormat};
pub use relay::{FileMetadata, FileSubmission, MemoryRelay, Relay};
pub use service::{CoreConfig, Request, Response, VajraCore};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Vajra Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
