//! Shared fixtures for unit tests.
//!
//! RSA key generation dominates test time, so two 2048-bit key pairs are
//! generated once per test binary and reused everywhere.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::crypto::{CryptoProvider, KdfParams, KeyPair, KeyPairManager, OsCryptoProvider};
use crate::identity::IdentityVault;

pub static ALICE: Lazy<KeyPair> = Lazy::new(|| manager().generate().unwrap());
pub static BOB: Lazy<KeyPair> = Lazy::new(|| manager().generate().unwrap());

pub fn provider() -> Arc<dyn CryptoProvider> {
    OsCryptoProvider::shared()
}

pub fn manager() -> KeyPairManager {
    KeyPairManager::new(provider(), 2048).unwrap()
}

pub fn fast_kdf() -> KdfParams {
    KdfParams::new(1_000).unwrap()
}

pub fn vault_with(kdf: KdfParams) -> IdentityVault {
    IdentityVault::new(provider(), manager(), kdf).unwrap()
}

pub fn fast_vault() -> IdentityVault {
    vault_with(fast_kdf())
}
