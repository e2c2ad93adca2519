//! # Identity Key Pairs
//!
//! RSA key pairs used only for key transport: the public half seals per-file
//! content keys, the private half opens them. Nothing is ever signed.
//!
//! ## Key Parameters
//!
//! | Parameter | Value |
//! |-----------|-------|
//! | Algorithm | RSA-OAEP |
//! | Hash / MGF1 | SHA-256 / MGF1-SHA-256, empty label |
//! | Public exponent | 65537 |
//! | Modulus | 2048, 3072 or 4096 bits (fixed per deployment, default 4096) |
//! | Public export | SPKI DER, base64 text |
//! | Private export | PKCS#8 DER, crate-internal, only ever wrapped |
//!
//! ## Handle Usages
//!
//! ```text
//! PublicKeyHandle   ──► encrypt only (seal a content key)
//! PrivateKeyHandle  ──► decrypt only (open a content key envelope)
//! ```
//!
//! Handles carry no raw-bytes accessors. The only way private key bytes leave
//! a handle is [`KeyPairManager::export_private_raw`], which is visible to
//! the identity vault alone.

use std::fmt;
use std::sync::Arc;

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::codec;
use super::provider::CryptoProvider;
use crate::error::{Error, Result};

/// Modulus sizes a deployment may choose
pub const SUPPORTED_MODULUS_BITS: [usize; 3] = [2048, 3072, 4096];

/// Modulus size for new identities
pub const DEFAULT_MODULUS_BITS: usize = 4096;

/// Public exponent for every generated key
pub const PUBLIC_EXPONENT: u32 = 65537;

/// Encrypt-only handle to a recipient's public key
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyHandle {
    key: RsaPublicKey,
}

impl PublicKeyHandle {
    /// Modulus length in bits
    pub fn modulus_bits(&self) -> usize {
        self.key.size() * 8
    }

    /// Length in bytes of every envelope this key produces
    pub fn envelope_len(&self) -> usize {
        self.key.size()
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

impl fmt::Debug for PublicKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyHandle")
            .field("modulus_bits", &self.modulus_bits())
            .finish()
    }
}

/// Decrypt-only handle to an identity's private key
///
/// Cloning shares the same in-memory key; it is zeroized when the last clone
/// is dropped.
#[derive(Clone)]
pub struct PrivateKeyHandle {
    key: Arc<RsaPrivateKey>,
}

impl PrivateKeyHandle {
    /// Modulus length in bits
    pub fn modulus_bits(&self) -> usize {
        self.key.size() * 8
    }

    /// The matching public key
    pub fn public_key(&self) -> PublicKeyHandle {
        PublicKeyHandle {
            key: self.key.to_public_key(),
        }
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.key
    }
}

impl fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyHandle")
            .field("modulus_bits", &self.modulus_bits())
            .finish_non_exhaustive()
    }
}

/// A freshly generated identity key pair
#[derive(Clone, Debug)]
pub struct KeyPair {
    /// Shareable half
    pub public: PublicKeyHandle,
    /// Secret half, must be wrapped before it is stored anywhere
    pub private: PrivateKeyHandle,
}

/// A public key in transport form (base64 of SPKI DER)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportedPublicKey(String);

impl ExportedPublicKey {
    /// Wrap text received from elsewhere; validated on import
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The transport text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the transport text
    pub fn into_string(self) -> String {
        self.0
    }

    /// Short SHA-256 fingerprint of the SPKI bytes, for display
    ///
    /// Formatted as four colon-separated groups of four hex digits.
    pub fn fingerprint(&self) -> Result<String> {
        let der = codec::decode(&self.0)?;
        let digest = Sha256::digest(&der);
        let hex = hex::encode(&digest[..8]);
        Ok(hex
            .as_bytes()
            .chunks(4)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join(":"))
    }
}

impl fmt::Display for ExportedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates, exports and imports identity key pairs
#[derive(Clone, Debug)]
pub struct KeyPairManager {
    provider: Arc<dyn CryptoProvider>,
    modulus_bits: usize,
}

impl KeyPairManager {
    /// Create a manager generating keys of `modulus_bits`
    pub fn new(provider: Arc<dyn CryptoProvider>, modulus_bits: usize) -> Result<Self> {
        check_modulus(modulus_bits)?;
        Ok(Self {
            provider,
            modulus_bits,
        })
    }

    /// Modulus size used for new keys
    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    /// Generate a new key pair
    pub fn generate(&self) -> Result<KeyPair> {
        tracing::debug!(bits = self.modulus_bits, "Generating RSA key pair");
        let private = self
            .provider
            .generate_rsa_key(self.modulus_bits)
            .map_err(|e| Error::KeyFormatError(format!("key generation failed: {}", e)))?;

        let private = PrivateKeyHandle {
            key: Arc::new(private),
        };
        Ok(KeyPair {
            public: private.public_key(),
            private,
        })
    }

    /// Export a public key as base64 SPKI
    pub fn export_public(&self, key: &PublicKeyHandle) -> Result<ExportedPublicKey> {
        let der = key
            .key
            .to_public_key_der()
            .map_err(|e| Error::KeyFormatError(format!("SPKI encoding failed: {}", e)))?;
        Ok(ExportedPublicKey(codec::encode(der.as_bytes())))
    }

    /// Import a base64 SPKI public key as an encrypt-only handle
    ///
    /// Any supported modulus size is accepted so that identities created
    /// under a different deployment setting remain reachable.
    pub fn import_public(&self, text: &str) -> Result<PublicKeyHandle> {
        let der = codec::decode(text)?;
        let key = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| Error::KeyFormatError(format!("invalid SPKI public key: {}", e)))?;
        check_key(&key)?;
        Ok(PublicKeyHandle { key })
    }

    /// PKCS#8 DER of a private key
    pub(crate) fn export_private_raw(&self, key: &PrivateKeyHandle) -> Result<Zeroizing<Vec<u8>>> {
        let doc = key
            .key
            .to_pkcs8_der()
            .map_err(|e| Error::KeyFormatError(format!("PKCS#8 encoding failed: {}", e)))?;
        Ok(Zeroizing::new(doc.as_bytes().to_vec()))
    }

    /// Import PKCS#8 DER as a decrypt-only handle
    pub(crate) fn import_private_raw(&self, der: &[u8]) -> Result<PrivateKeyHandle> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| Error::KeyFormatError(format!("invalid PKCS#8 private key: {}", e)))?;
        check_key(&key.to_public_key())?;
        Ok(PrivateKeyHandle { key: Arc::new(key) })
    }
}

fn check_modulus(bits: usize) -> Result<()> {
    if SUPPORTED_MODULUS_BITS.contains(&bits) {
        Ok(())
    } else {
        Err(Error::KeyFormatError(format!(
            "unsupported modulus size {} (expected one of {:?})",
            bits, SUPPORTED_MODULUS_BITS
        )))
    }
}

fn check_key(key: &RsaPublicKey) -> Result<()> {
    check_modulus(key.size() * 8)?;
    if *key.e() != BigUint::from(PUBLIC_EXPONENT) {
        return Err(Error::KeyFormatError("unexpected public exponent".into()));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
