//! # Identity Vault
//!
//! Wraps a private key under a password so it can be stored or backed up on
//! the relay, and unwraps it again at login.
//!
//! ```text
//! wrap(key, password)
//!   salt  = 16 random bytes          (fresh per call)
//!   iv    = 12 random bytes          (fresh per call)
//!   kek   = PBKDF2-SHA256(password, salt, iterations)
//!   data  = AES-256-GCM(kek, iv, PKCS#8(key))
//!   ──► { "salt", "iv", "encryptedData" [, "iterations"] }
//!
//! unwrap(wrapper, password)
//!   kek   = PBKDF2-SHA256(password, wrapper.salt, wrapper.iterations)
//!   PKCS#8 = AES-256-GCM⁻¹(kek, wrapper.iv, wrapper.encryptedData)
//!   ──► PrivateKeyHandle, or AuthenticationError
//! ```
//!
//! A wrong password and a damaged wrapper produce the same
//! [`Error::AuthenticationError`]. There is no unauthenticated fallback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::codec;
use crate::crypto::{
    derive_wrapping_key, CryptoProvider, KdfParams, KeyPairManager, Nonce, PrivateKeyHandle,
    PBKDF2_ITERATIONS, SALT_SIZE,
};
use crate::error::{Error, Result};

/// A password-wrapped private key
///
/// `iterations` is only present when the wrapper was made with non-default
/// KDF parameters; wrappers without it use 100,000 rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordWrapper {
    /// PBKDF2 salt
    #[serde(with = "codec::base64_array")]
    pub salt: [u8; SALT_SIZE],
    /// AES-GCM nonce
    pub iv: Nonce,
    /// Sealed PKCS#8 private key (ciphertext ‖ tag)
    #[serde(with = "codec::base64_bytes")]
    pub encrypted_data: Vec<u8>,
    /// PBKDF2 round count, when not the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

impl PasswordWrapper {
    /// KDF parameters this wrapper was made with
    pub fn kdf_params(&self) -> Result<KdfParams> {
        let Some(n) = self.iterations else {
            return Ok(KdfParams::default());
        };
        let params = KdfParams::new(n)?;
        if n > PBKDF2_ITERATIONS {
            tracing::warn!(iterations = n, "Wrapper asks for more rounds than the default");
        }
        Ok(params)
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON wire form
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::DecodeError(e.to_string()))
    }
}

/// Password wrapping and unwrapping of private keys
#[derive(Clone, Debug)]
pub struct IdentityVault {
    provider: Arc<dyn CryptoProvider>,
    keys: KeyPairManager,
    kdf: KdfParams,
}

impl IdentityVault {
    /// Create a vault that wraps with `kdf`
    pub fn new(provider: Arc<dyn CryptoProvider>, keys: KeyPairManager, kdf: KdfParams) -> Result<Self> {
        kdf.validate()?;
        Ok(Self { provider, keys, kdf })
    }

    /// The key manager used for PKCS#8 export and import
    pub fn keys(&self) -> &KeyPairManager {
        &self.keys
    }

    /// Wrap `key` under `password`
    pub fn wrap(&self, key: &PrivateKeyHandle, password: &str) -> Result<PasswordWrapper> {
        let mut salt = [0u8; SALT_SIZE];
        self.provider.fill_random(&mut salt);
        let iv = Nonce::random(self.provider.as_ref());

        let kek = derive_wrapping_key(password, &salt, self.kdf)?;
        let pkcs8 = self.keys.export_private_raw(key)?;
        let encrypted_data = kek.seal(&iv, &pkcs8)?;

        tracing::debug!(iterations = self.kdf.iterations, "Private key wrapped");
        Ok(PasswordWrapper {
            salt,
            iv,
            encrypted_data,
            iterations: (!self.kdf.is_default()).then_some(self.kdf.iterations),
        })
    }

    /// Recover the private key from `wrapper`
    pub fn unwrap(&self, wrapper: &PasswordWrapper, password: &str) -> Result<PrivateKeyHandle> {
        let params = wrapper
            .kdf_params()
            .map_err(|_| Error::AuthenticationError)?;
        let kek = derive_wrapping_key(password, &wrapper.salt, params)?;
        let pkcs8 = kek.open(&wrapper.iv, &wrapper.encrypted_data)?;

        self.keys.import_private_raw(&pkcs8).map_err(|_| {
            tracing::warn!("Wrapper decrypted but key material did not import");
            Error::AuthenticationError
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
