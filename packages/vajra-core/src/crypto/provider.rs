//! # Crypto Provider
//!
//! The single seam through which the core touches randomness and RSA.
//! Every component takes an `Arc<dyn CryptoProvider>` at construction, so a
//! test can swap the OS generator for a seeded one and get reproducible keys,
//! salts and IVs without any global state.
//!
//! | Provider | Randomness | Use |
//! |----------|------------|-----|
//! | [`OsCryptoProvider`] | `OsRng` | production |
//! | [`SeededCryptoProvider`] | `StdRng` from a 32-byte seed | tests, demos |

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// Randomness and RSA-OAEP-SHA256 primitives
///
/// OAEP always uses SHA-256 for both the label hash and MGF1, with an empty
/// label. Errors are returned as raw [`rsa::Error`] so callers decide how a
/// failure is classified.
pub trait CryptoProvider: Send + Sync + fmt::Debug {
    /// Fill `buf` with cryptographically secure random bytes
    fn fill_random(&self, buf: &mut [u8]);

    /// Generate an RSA private key with exponent 65537
    fn generate_rsa_key(&self, bits: usize) -> Result<RsaPrivateKey, rsa::Error>;

    /// RSA-OAEP-SHA256 encrypt
    fn rsa_oaep_encrypt(&self, key: &RsaPublicKey, msg: &[u8]) -> Result<Vec<u8>, rsa::Error>;

    /// RSA-OAEP-SHA256 decrypt (blinded)
    fn rsa_oaep_decrypt(&self, key: &RsaPrivateKey, ciphertext: &[u8])
        -> Result<Vec<u8>, rsa::Error>;
}

/// Provider backed by the operating system's CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsCryptoProvider;

impl OsCryptoProvider {
    /// Shared handle, ready to inject
    pub fn shared() -> Arc<dyn CryptoProvider> {
        Arc::new(Self)
    }
}

impl CryptoProvider for OsCryptoProvider {
    fn fill_random(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }

    fn generate_rsa_key(&self, bits: usize) -> Result<RsaPrivateKey, rsa::Error> {
        RsaPrivateKey::new(&mut OsRng, bits)
    }

    fn rsa_oaep_encrypt(&self, key: &RsaPublicKey, msg: &[u8]) -> Result<Vec<u8>, rsa::Error> {
        key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), msg)
    }

    fn rsa_oaep_decrypt(
        &self,
        key: &RsaPrivateKey,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, rsa::Error> {
        key.decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), ciphertext)
    }
}

/// Deterministic provider for tests
///
/// Same seed, same call sequence, same output. Never use outside tests: the
/// seed is the whole secret.
pub struct SeededCryptoProvider {
    rng: Mutex<StdRng>,
}

impl SeededCryptoProvider {
    /// Create from a 32-byte seed
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_seed(seed)),
        }
    }

    /// Create from a small integer seed
    pub fn from_u64(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Shared handle, ready to inject
    pub fn shared(seed: u64) -> Arc<dyn CryptoProvider> {
        Arc::new(Self::from_u64(seed))
    }
}

impl fmt::Debug for SeededCryptoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededCryptoProvider").finish_non_exhaustive()
    }
}

impl CryptoProvider for SeededCryptoProvider {
    fn fill_random(&self, buf: &mut [u8]) {
        self.rng.lock().fill_bytes(buf);
    }

    fn generate_rsa_key(&self, bits: usize) -> Result<RsaPrivateKey, rsa::Error> {
        let mut rng = self.rng.lock();
        RsaPrivateKey::new(&mut *rng, bits)
    }

    fn rsa_oaep_encrypt(&self, key: &RsaPublicKey, msg: &[u8]) -> Result<Vec<u8>, rsa::Error> {
        let mut rng = self.rng.lock();
        key.encrypt(&mut *rng, Oaep::new::<Sha256>(), msg)
    }

    fn rsa_oaep_decrypt(
        &self,
        key: &RsaPrivateKey,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, rsa::Error> {
        let mut rng = self.rng.lock();
        key.decrypt_blinded(&mut *rng, Oaep::new::<Sha256>(), ciphertext)
    }
}

// ============================================================================
// TESTS
// ============================================================================
