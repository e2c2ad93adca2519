//! # Key Derivation
//!
//! Password stretching for the private-key wrapper.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PASSWORD → WRAPPING KEY                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password (UTF-8)          salt (16 random bytes, stored in wrapper)    │
//! │        │                          │                                     │
//! │        └────────────┬─────────────┘                                     │
//! │                     ▼                                                   │
//! │  PBKDF2-HMAC-SHA256(iterations = 100,000 by default)                   │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │  WrappingKey (32 bytes, AES-256-GCM only, zeroized on drop)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Derivation is deterministic in (password, salt, iterations). Because
//! every wrap draws a new salt, two wrappers under the same password yield
//! unrelated keys.
//!
//! The raw key bytes never leave [`WrappingKey`]; it can only seal and open.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use super::encryption::{aead_open, aead_seal, Nonce, KEY_SIZE};
use crate::error::{Error, Result};

/// Default PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Upper bound on accepted iteration counts
///
/// Wrappers come back from the relay, so this also bounds the work an
/// unwrap can be made to do: ten times the default, about a second.
pub const MAX_ITERATIONS: u32 = 1_000_000;

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Tunable key-derivation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// PBKDF2 round count
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Build validated parameters
    pub fn new(iterations: u32) -> Result<Self> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    /// Reject round counts outside `1..=MAX_ITERATIONS`
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 || self.iterations > MAX_ITERATIONS {
            return Err(Error::KeyDerivationFailed(format!(
                "iteration count {} outside 1..={}",
                self.iterations, MAX_ITERATIONS
            )));
        }
        Ok(())
    }

    /// Whether these are the stock parameters
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// AES-256-GCM key derived from a password
#[derive(ZeroizeOnDrop)]
pub struct WrappingKey([u8; KEY_SIZE]);

impl WrappingKey {
    /// Seal `plaintext` under this key
    pub fn seal(&self, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        aead_seal(&self.0, nonce, plaintext)
    }

    /// Open a sealed blob; a failed tag is [`Error::AuthenticationError`]
    pub fn open(&self, nonce: &Nonce, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        aead_open(&self.0, nonce, ciphertext)
            .map(Zeroizing::new)
            .ok_or(Error::AuthenticationError)
    }
}

/// Derive the wrapping key for `password` and `salt`
///
/// Empty passwords are accepted.
pub fn derive_wrapping_key(
    password: &str,
    salt: &[u8; SALT_SIZE],
    params: KdfParams,
) -> Result<WrappingKey> {
    params.validate()?;
    Ok(WrappingKey(derive_bytes(password.as_bytes(), salt, params.iterations)))
}

fn derive_bytes(password: &[u8], salt: &[u8], iterations: u32) -> [u8; KEY_SIZE] {
    let mut out = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    out
}

// ============================================================================
// TESTS
// ============================================================================
