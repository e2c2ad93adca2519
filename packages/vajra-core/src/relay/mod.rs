//! # Relay Interface
//!
//! The relay stores public keys, password-wrapped key backups and encrypted
//! file packages. It never sees a password, a private key or plaintext.
//!
//! ## Operations
//!
//! | Method | HTTP equivalent | Notes |
//! |--------|-----------------|-------|
//! | `register` | `POST /register` | duplicate handle ⇒ `HandleTaken` |
//! | `lookup_public_key` | `GET /key/{handle}` | unknown ⇒ `None` |
//! | `fetch_wrapper` | `GET /login/{handle}` | unknown or no backup ⇒ `None` |
//! | `submit_file` | `POST /upload` | returns the new file id |
//! | `list_inbox` | `GET /inbox/{handle}` | empty when nothing was sent |
//! | `fetch_file` | `GET /file/{id}` | unknown ⇒ `NotFound` |
//!
//! ## Record Shapes
//!
//! ```text
//! upload body / file record        inbox entry
//! {                                {
//!   "sender": "alice",               "id": "6f1c…",
//!   "recipient": "bob",              "sender": "alice",
//!   "version": 1,                    "recipient": "bob",
//!   "fileName": "…",                 "fileName": "…",
//!   "fileType": "…",                 "timestamp": 1718000000000.0
//!   "iv": "…",                     }
//!   "encryptedKey": "…",
//!   "fileData": "…"
//! }
//! ```

mod memory;

pub use memory::MemoryRelay;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::ExportedPublicKey;
use crate::error::{Error, Result};
use crate::identity::{PasswordWrapper, Registration};
use crate::package::{check_record_version, FilePackage};

/// A file package addressed from one handle to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSubmission {
    /// Sender handle, as claimed by the sender
    pub sender: String,
    /// Recipient handle
    pub recipient: String,
    /// The encrypted file
    #[serde(flatten)]
    pub package: FilePackage,
}

impl FileSubmission {
    /// Build from a raw relay file record, checking the package version
    pub fn from_record(record: serde_json::Value) -> Result<Self> {
        check_record_version(&record)?;
        serde_json::from_value(record).map_err(|e| Error::DecodeError(e.to_string()))
    }
}

/// Inbox listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Relay-assigned file id
    pub id: String,
    /// Sender handle
    pub sender: String,
    /// Recipient handle
    pub recipient: String,
    /// Original file name
    pub file_name: String,
    /// Upload time, milliseconds since the Unix epoch
    pub timestamp: f64,
}

impl FileMetadata {
    /// Upload time as a UTC datetime
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp as i64)
    }
}

/// Storage and delivery service for keys and file packages
#[async_trait]
pub trait Relay: Send + Sync {
    /// Publish a new handle with its public key and optional wrapper backup
    async fn register(&self, registration: &Registration) -> Result<()>;

    /// Public key registered for `handle`
    async fn lookup_public_key(&self, handle: &str) -> Result<Option<ExportedPublicKey>>;

    /// Wrapper backup registered for `handle`
    async fn fetch_wrapper(&self, handle: &str) -> Result<Option<PasswordWrapper>>;

    /// Store a file package, returning its id
    async fn submit_file(&self, submission: &FileSubmission) -> Result<String>;

    /// Files waiting for `handle`
    async fn list_inbox(&self, handle: &str) -> Result<Vec<FileMetadata>>;

    /// Fetch a stored file by id
    async fn fetch_file(&self, id: &str) -> Result<FileSubmission>;
}
