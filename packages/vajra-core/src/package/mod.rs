//! # File Packages
//!
//! The encrypted form of a file, in two interchangeable wire layouts.
//!
//! ## JSON layout (current)
//!
//! ```text
//! {
//!   "version": 1,
//!   "fileName": "report.pdf",
//!   "fileType": "application/pdf",
//!   "iv": "<base64, 12 bytes>",
//!   "encryptedKey": "<base64, RSA-OAEP envelope>",
//!   "fileData": "<base64, ciphertext ‖ 16-byte tag>"
//! }
//! ```
//!
//! Records without `"version"` (written before the field existed) are read
//! as version 1. Any other version is refused with
//! [`Error::UnsupportedVersion`].
//!
//! ## Packed layout (legacy)
//!
//! ```text
//! ┌────────────────┬──────────────────────┬────────────┬──────────────────┐
//! │ envelope len   │ envelope             │ IV         │ ciphertext ‖ tag │
//! │ u32 LE (4 B)   │ 256 / 384 / 512 B    │ 12 B       │ rest             │
//! └────────────────┴──────────────────────┴────────────┴──────────────────┘
//! ```
//!
//! The packed layout has no room for a name or type; those travel
//! alongside it. See [`WireFormat::detect`] for telling the two apart.

mod packed;

use serde::{Deserialize, Serialize};

use crate::crypto::{codec, Nonce};
use crate::error::{Error, Result};

/// Version written into every JSON package
pub const PACKAGE_VERSION: u8 = 1;

fn default_version() -> u8 {
    PACKAGE_VERSION
}

/// An encrypted file addressed to one recipient
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePackage {
    /// Wire format version
    #[serde(default = "default_version")]
    pub version: u8,
    /// Original file name
    pub file_name: String,
    /// Declared media type, may be empty
    #[serde(default)]
    pub file_type: String,
    /// AES-GCM nonce
    pub iv: Nonce,
    /// Content key sealed with RSA-OAEP
    #[serde(with = "codec::base64_bytes")]
    pub encrypted_key: Vec<u8>,
    /// File ciphertext with tag appended
    #[serde(with = "codec::base64_bytes")]
    pub file_data: Vec<u8>,
}

impl FilePackage {
    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse JSON, checking the version
    ///
    /// The version is checked on the raw record first, so a value that does
    /// not even fit the field (`256`, `-1`, `"1"`) is still reported as
    /// [`Error::UnsupportedVersion`] rather than a decode failure.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let record: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::DecodeError(e.to_string()))?;
        Self::from_record(record)
    }

    /// Build from an already parsed JSON record, checking the version
    pub fn from_record(record: serde_json::Value) -> Result<Self> {
        check_record_version(&record)?;
        serde_json::from_value(record).map_err(|e| Error::DecodeError(e.to_string()))
    }

    /// Refuse any version other than [`PACKAGE_VERSION`]
    pub fn check_version(&self) -> Result<()> {
        if self.version != PACKAGE_VERSION {
            return Err(Error::UnsupportedVersion(self.version.to_string()));
        }
        Ok(())
    }

    /// Parse either layout
    ///
    /// `file_name` and `file_type` are only used for packed input; JSON
    /// carries its own.
    pub fn parse(bytes: &[u8], file_name: &str, file_type: &str) -> Result<Self> {
        match WireFormat::detect(bytes) {
            WireFormat::Json => Self::from_json(bytes),
            WireFormat::Packed => Self::from_packed(bytes, file_name, file_type),
        }
    }

    /// Encode in the requested layout
    pub fn encode(&self, format: WireFormat) -> Result<Vec<u8>> {
        match format {
            WireFormat::Json => Ok(serde_json::to_vec(self)?),
            WireFormat::Packed => self.to_packed(),
        }
    }
}

/// Check the `version` member of a raw package record
///
/// A missing member is version 1. Anything else must be exactly the
/// integer [`PACKAGE_VERSION`].
pub fn check_record_version(record: &serde_json::Value) -> Result<()> {
    match record.get("version") {
        None => Ok(()),
        Some(v) if v.as_u64() == Some(u64::from(PACKAGE_VERSION)) => Ok(()),
        Some(v) => Err(Error::UnsupportedVersion(v.to_string())),
    }
}

impl std::fmt::Debug for FilePackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePackage")
            .field("version", &self.version)
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .field("encrypted_key_len", &self.encrypted_key.len())
            .field("file_data_len", &self.file_data.len())
            .finish()
    }
}

/// Which layout a byte buffer uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// JSON object
    Json,
    /// Length-prefixed binary
    Packed,
}

impl WireFormat {
    /// Sniff the layout of `bytes`
    ///
    /// JSON when the first non-whitespace byte is `{`. A packed buffer
    /// starts with the low byte of its envelope length, which for every
    /// supported modulus is `0x00` or `0x80`, so the two never collide.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => WireFormat::Json,
            _ => WireFormat::Packed,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
