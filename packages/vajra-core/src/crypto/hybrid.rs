//! # Hybrid File Encryption
//!
//! Files are encrypted under a one-off AES-256-GCM content key, and that key
//! is sealed to the recipient's RSA public key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ENCRYPT (sender)                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. ContentKey = 32 random bytes, Nonce = 12 random bytes               │
//! │  2. fileData     = AES-256-GCM(ContentKey, Nonce, whole file)           │
//! │  3. encryptedKey = RSA-OAEP-SHA256(recipient public key, ContentKey)    │
//! │  4. FilePackage { fileName, fileType, iv, encryptedKey, fileData }      │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                         DECRYPT (recipient)                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. ContentKey = RSA-OAEP-SHA256⁻¹(private key, encryptedKey)           │
//! │        failure or not 32 bytes ──► UnsealError                         │
//! │  2. file = AES-256-GCM⁻¹(ContentKey, iv, fileData)                      │
//! │        tag mismatch ──► IntegrityError                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The whole file is sealed in one AEAD call, so memory use is roughly twice
//! the file size. Decryption returns either the complete plaintext or an
//! error, never a prefix.

use std::sync::Arc;

use super::encryption::{ContentKey, Nonce};
use super::keys::{PrivateKeyHandle, PublicKeyHandle};
use super::provider::CryptoProvider;
use crate::error::{Error, Result};
use crate::package::{FilePackage, PACKAGE_VERSION};

/// Encryption progress checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Keys drawn, about to encrypt content
    Started,
    /// Content encrypted, sealing the key
    ContentSealed,
    /// Package assembled
    Complete,
}

impl Progress {
    /// Percentage shown to the user
    pub fn percent(self) -> u8 {
        match self {
            Progress::Started => 10,
            Progress::ContentSealed => 90,
            Progress::Complete => 100,
        }
    }
}

/// Plaintext recovered from a [`FilePackage`]
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    /// File contents
    pub data: Vec<u8>,
    /// Declared media type
    pub file_type: String,
    /// Original file name
    pub file_name: String,
}

impl std::fmt::Debug for DecryptedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedFile")
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Encrypts files for a recipient and decrypts received packages
#[derive(Clone, Debug)]
pub struct HybridCipher {
    provider: Arc<dyn CryptoProvider>,
}

impl HybridCipher {
    /// Create a cipher drawing keys and nonces from `provider`
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Encrypt `data` for `recipient`
    pub fn encrypt(
        &self,
        data: &[u8],
        file_name: &str,
        file_type: &str,
        recipient: &PublicKeyHandle,
    ) -> Result<FilePackage> {
        self.encrypt_with_progress(data, file_name, file_type, recipient, |_| {})
    }

    /// Encrypt `data` for `recipient`, reporting checkpoints
    pub fn encrypt_with_progress(
        &self,
        data: &[u8],
        file_name: &str,
        file_type: &str,
        recipient: &PublicKeyHandle,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<FilePackage> {
        let content_key = ContentKey::random(self.provider.as_ref());
        let iv = Nonce::random(self.provider.as_ref());
        on_progress(Progress::Started);

        let file_data = content_key.encrypt(&iv, data)?;
        on_progress(Progress::ContentSealed);

        let encrypted_key = self
            .provider
            .rsa_oaep_encrypt(recipient.as_rsa(), content_key.as_bytes())
            .map_err(|e| Error::EncryptionFailed(format!("RSA-OAEP seal failed: {}", e)))?;

        tracing::debug!(
            file_name,
            plaintext_len = data.len(),
            envelope_len = encrypted_key.len(),
            "File encrypted"
        );
        on_progress(Progress::Complete);

        Ok(FilePackage {
            version: PACKAGE_VERSION,
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            iv,
            encrypted_key,
            file_data,
        })
    }

    /// Decrypt a package with the recipient's private key
    pub fn decrypt(&self, package: &FilePackage, key: &PrivateKeyHandle) -> Result<DecryptedFile> {
        let raw_key = zeroize::Zeroizing::new(
            self.provider
                .rsa_oaep_decrypt(key.as_rsa(), &package.encrypted_key)
                .map_err(|_| Error::UnsealError)?,
        );
        let content_key = ContentKey::from_slice(&raw_key).ok_or(Error::UnsealError)?;

        let data = content_key.decrypt(&package.iv, &package.file_data)?;
        tracing::debug!(file_name = %package.file_name, len = data.len(), "File decrypted");

        Ok(DecryptedFile {
            data,
            file_type: package.file_type.clone(),
            file_name: package.file_name.clone(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
