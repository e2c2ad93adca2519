//! # Identity Module
//!
//! A VajraShare identity is a handle, an RSA public key, and the matching
//! private key wrapped under the user's password.
//!
//! ## Identity States
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          IDENTITY STATES                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   register(handle, password)                                            │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   ┌─────────────────┐   lock()          ┌─────────────────┐            │
//! │   │    Unlocked     │──────────────────►│     Wrapped     │            │
//! │   │                 │                   │                 │            │
//! │   │ wrapper         │◄──────────────────│ wrapper only    │            │
//! │   │ + private key   │ unlock(password)  │                 │            │
//! │   └─────────────────┘                   └─────────────────┘            │
//! │                                                 ▲                       │
//! │                                                 │                       │
//! │                         from_parts(handle, public key, wrapper)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The wrapper is kept in both states, so `lock()` simply drops the
//! in-memory key. Anything that needs the private key while the identity is
//! wrapped fails with [`Error::IdentityLocked`].

mod vault;

pub use vault::{IdentityVault, PasswordWrapper};

use serde::{Deserialize, Serialize};

use crate::crypto::{ExportedPublicKey, KeyPairManager, PrivateKeyHandle, PublicKeyHandle};
use crate::error::{Error, Result};

/// Longest handle accepted
pub const MAX_HANDLE_LEN: usize = 64;

/// What gets sent to the relay when an identity is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Unique user handle
    pub handle: String,
    /// Public key in transport form
    pub public_key: ExportedPublicKey,
    /// Password-wrapped private key backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_encrypted: Option<PasswordWrapper>,
}

/// Whether the private key is currently in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    /// Only the password wrapper is held
    Wrapped,
    /// The private key is available for decryption
    Unlocked,
}

/// A user identity
pub struct Identity {
    handle: String,
    public_key: ExportedPublicKey,
    wrapper: PasswordWrapper,
    private_key: Option<PrivateKeyHandle>,
}

impl Identity {
    /// Create a new identity
    ///
    /// Generates a key pair, wraps the private half under `password`, and
    /// returns the unlocked identity together with the relay registration.
    pub fn register(vault: &IdentityVault, handle: &str, password: &str) -> Result<(Self, Registration)> {
        let handle = validate_handle(handle)?;
        let pair = vault.keys().generate()?;
        let public_key = vault.keys().export_public(&pair.public)?;
        let wrapper = vault.wrap(&pair.private, password)?;

        tracing::info!(handle = %handle, bits = pair.public.modulus_bits(), "Identity created");

        let registration = Registration {
            handle: handle.clone(),
            public_key: public_key.clone(),
            private_key_encrypted: Some(wrapper.clone()),
        };
        let identity = Self {
            handle,
            public_key,
            wrapper,
            private_key: Some(pair.private),
        };
        Ok((identity, registration))
    }

    /// Rebuild a wrapped identity from stored or relay-provided parts
    pub fn from_parts(handle: &str, public_key: ExportedPublicKey, wrapper: PasswordWrapper) -> Result<Self> {
        Ok(Self {
            handle: validate_handle(handle)?,
            public_key,
            wrapper,
            private_key: None,
        })
    }

    /// The user's handle
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The public key in transport form
    pub fn public_key(&self) -> &ExportedPublicKey {
        &self.public_key
    }

    /// The password wrapper
    pub fn wrapper(&self) -> &PasswordWrapper {
        &self.wrapper
    }

    /// Current state
    pub fn state(&self) -> IdentityState {
        if self.private_key.is_some() {
            IdentityState::Unlocked
        } else {
            IdentityState::Wrapped
        }
    }

    /// Shorthand for `state() == Unlocked`
    pub fn is_unlocked(&self) -> bool {
        self.private_key.is_some()
    }

    /// Unwrap the private key into memory
    ///
    /// The recovered key must match this identity's public key; a wrapper
    /// holding some other key is rejected with [`Error::KeyFormatError`].
    pub fn unlock(&mut self, vault: &IdentityVault, password: &str) -> Result<()> {
        if self.is_unlocked() {
            return Ok(());
        }
        let key = vault.unwrap(&self.wrapper, password)?;
        self.adopt_unwrapped(vault.keys(), key)
    }

    /// Finish an unlock with a key unwrapped elsewhere
    pub(crate) fn adopt_unwrapped(&mut self, keys: &KeyPairManager, key: PrivateKeyHandle) -> Result<()> {
        let expected: PublicKeyHandle = keys.import_public(self.public_key.as_str())?;
        if key.public_key() != expected {
            return Err(Error::KeyFormatError(
                "wrapped key does not match the identity's public key".into(),
            ));
        }

        tracing::info!(handle = %self.handle, "Identity unlocked");
        self.private_key = Some(key);
        Ok(())
    }

    /// Drop the in-memory private key
    pub fn lock(&mut self) {
        if self.private_key.take().is_some() {
            tracing::info!(handle = %self.handle, "Identity locked");
        }
    }

    /// The private key, if unlocked
    pub fn private_key(&self) -> Result<&PrivateKeyHandle> {
        self.private_key.as_ref().ok_or(Error::IdentityLocked)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Validate a user handle, returning it trimmed
///
/// Handles are used in relay URL paths, so whitespace and `/` are refused.
pub fn validate_handle(handle: &str) -> Result<String> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(Error::InvalidHandle("handle cannot be empty".into()));
    }
    if handle.chars().count() > MAX_HANDLE_LEN {
        return Err(Error::InvalidHandle(format!(
            "handle longer than {} characters",
            MAX_HANDLE_LEN
        )));
    }
    if handle.chars().any(|c| c.is_whitespace() || c == '/' || c.is_control()) {
        return Err(Error::InvalidHandle(
            "handle cannot contain whitespace or '/'".into(),
        ));
    }
    Ok(handle.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_vault, ALICE};

    #[test]
    fn test_register_returns_unlocked_identity() {
        let vault = fast_vault();
        let (identity, reg) = Identity::register(&vault, "  alice ", "p@ss1").unwrap();

        assert_eq!(identity.handle(), "alice");
        assert_eq!(identity.state(), IdentityState::Unlocked);
        assert_eq!(reg.handle, "alice");
        assert_eq!(&reg.public_key, identity.public_key());
        assert_eq!(reg.private_key_encrypted.as_ref(), Some(identity.wrapper()));
    }

    #[test]
    fn test_registration_json_shape() {
        let vault = fast_vault();
        let (_, reg) = Identity::register(&vault, "alice", "p@ss1").unwrap();
        let value = serde_json::to_value(&reg).unwrap();
        assert!(value["publicKey"].is_string());
        assert!(value["privateKeyEncrypted"]["encryptedData"].is_string());
    }

    #[test]
    fn test_lock_and_unlock() {
        let vault = fast_vault();
        let (mut identity, _) = Identity::register(&vault, "alice", "p@ss1").unwrap();

        identity.lock();
        assert_eq!(identity.state(), IdentityState::Wrapped);
        assert!(matches!(identity.private_key(), Err(Error::IdentityLocked)));

        assert!(matches!(
            identity.unlock(&vault, "wrong"),
            Err(Error::AuthenticationError)
        ));
        assert_eq!(identity.state(), IdentityState::Wrapped);

        identity.unlock(&vault, "p@ss1").unwrap();
        assert!(identity.private_key().is_ok());
    }

    #[test]
    fn test_from_parts_starts_wrapped() {
        let vault = fast_vault();
        let wrapper = vault.wrap(&ALICE.private, "p@ss1").unwrap();
        let public = vault.keys().export_public(&ALICE.public).unwrap();

        let mut identity = Identity::from_parts("alice", public, wrapper).unwrap();
        assert_eq!(identity.state(), IdentityState::Wrapped);
        identity.unlock(&vault, "p@ss1").unwrap();
        assert_eq!(identity.private_key().unwrap().public_key(), ALICE.public);
    }

    #[test]
    fn test_mismatched_wrapper_rejected() {
        let vault = fast_vault();
        let wrapper = vault.wrap(&ALICE.private, "p@ss1").unwrap();
        let other = vault.keys().export_public(&crate::testing::BOB.public).unwrap();

        let mut identity = Identity::from_parts("alice", other, wrapper).unwrap();
        assert!(matches!(
            identity.unlock(&vault, "p@ss1"),
            Err(Error::KeyFormatError(_))
        ));
    }

    #[test]
    fn test_handle_validation() {
        assert_eq!(validate_handle("bob").unwrap(), "bob");
        assert!(matches!(validate_handle("   "), Err(Error::InvalidHandle(_))));
        assert!(matches!(validate_handle("a b"), Err(Error::InvalidHandle(_))));
        assert!(matches!(validate_handle("a/b"), Err(Error::InvalidHandle(_))));
        assert!(validate_handle(&"x".repeat(MAX_HANDLE_LEN + 1)).is_err());
    }
}
