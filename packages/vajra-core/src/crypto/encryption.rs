//! # Symmetric Encryption
//!
//! AES-256-GCM, used in exactly two places:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AES-256-GCM USAGE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  File content                      Private key at rest                  │
//! │  ────────────                      ───────────────────                  │
//! │  key   = ContentKey (random)       key   = WrappingKey (PBKDF2)         │
//! │  nonce = Nonce (random)            nonce = Nonce (random)               │
//! │  msg   = whole file                msg   = PKCS#8 private key           │
//! │  aad   = none                      aad   = none                         │
//! │           ↓                                 ↓                           │
//! │  ciphertext ‖ 16-byte tag          ciphertext ‖ 16-byte tag             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both keys are single-use in practice: a fresh content key per file and a
//! fresh salt (hence a fresh wrapping key) per wrap, each paired with a fresh
//! random nonce.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use super::provider::CryptoProvider;
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// A nonce for AES-GCM encryption
///
/// **Never reuse a nonce with the same key.** Every encryption in this crate
/// draws a fresh one from the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(#[serde(with = "super::codec::base64_array")] pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Draw a random nonce
    pub fn random(provider: &dyn CryptoProvider) -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        provider.fill_random(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Per-file AES-256-GCM content key
///
/// Zeroized when dropped. Only ever leaves the process sealed inside an
/// RSA-OAEP envelope.
#[derive(ZeroizeOnDrop)]
pub struct ContentKey([u8; KEY_SIZE]);

impl ContentKey {
    /// Draw a fresh random key
    pub fn random(provider: &dyn CryptoProvider) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        provider.fill_random(&mut bytes);
        Self(bytes)
    }

    /// Rebuild from recovered envelope bytes; `None` unless exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt `plaintext` in a single AEAD call
    pub fn encrypt(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        aead_seal(&self.0, nonce, plaintext)
    }

    /// Decrypt and verify; any tag failure is [`Error::IntegrityError`]
    pub fn decrypt(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        aead_open(&self.0, nonce, ciphertext).ok_or(Error::IntegrityError)
    }
}

/// Seal with AES-256-GCM, no associated data
pub(crate) fn aead_seal(key: &[u8; KEY_SIZE], nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    cipher
        .encrypt(AesNonce::from_slice(&nonce.0), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("AES-GCM seal failed: {}", e)))
}

/// Open with AES-256-GCM; `None` on any authentication failure
pub(crate) fn aead_open(key: &[u8; KEY_SIZE], nonce: &Nonce, ciphertext: &[u8]) -> Option<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    cipher
        .decrypt(AesNonce::from_slice(&nonce.0), ciphertext)
        .ok()
}

// ============================================================================
// TESTS
// ============================================================================
