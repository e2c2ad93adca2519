//! In-process relay with the same semantics as the HTTP relay.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{FileMetadata, FileSubmission, Relay};
use crate::crypto::ExportedPublicKey;
use crate::error::{Error, Result};
use crate::identity::{validate_handle, PasswordWrapper, Registration};

#[derive(Debug)]
struct UserRecord {
    public_key: ExportedPublicKey,
    wrapper: Option<PasswordWrapper>,
}

#[derive(Debug, Default)]
struct RelayState {
    users: HashMap<String, UserRecord>,
    files: HashMap<String, FileSubmission>,
    /// Recipient handle → metadata, in upload order
    inboxes: HashMap<String, Vec<FileMetadata>>,
}

/// Relay kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRelay {
    state: RwLock<RelayState>,
}

impl MemoryRelay {
    /// Create an empty relay
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files
    pub fn file_count(&self) -> usize {
        self.state.read().files.len()
    }

    /// Overwrite a stored file, for simulating a hostile relay in tests
    pub fn tamper_file(&self, id: &str, f: impl FnOnce(&mut FileSubmission)) -> Result<()> {
        let mut state = self.state.write();
        let file = state
            .files
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("file {}", id)))?;
        f(file);
        Ok(())
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn register(&self, registration: &Registration) -> Result<()> {
        let handle = validate_handle(&registration.handle)?;
        let mut state = self.state.write();
        if state.users.contains_key(&handle) {
            return Err(Error::HandleTaken(handle));
        }
        state.users.insert(
            handle,
            UserRecord {
                public_key: registration.public_key.clone(),
                wrapper: registration.private_key_encrypted.clone(),
            },
        );
        Ok(())
    }

    async fn lookup_public_key(&self, handle: &str) -> Result<Option<ExportedPublicKey>> {
        Ok(self
            .state
            .read()
            .users
            .get(handle)
            .map(|u| u.public_key.clone()))
    }

    async fn fetch_wrapper(&self, handle: &str) -> Result<Option<PasswordWrapper>> {
        Ok(self
            .state
            .read()
            .users
            .get(handle)
            .and_then(|u| u.wrapper.clone()))
    }

    async fn submit_file(&self, submission: &FileSubmission) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let meta = FileMetadata {
            id: id.clone(),
            sender: submission.sender.clone(),
            recipient: submission.recipient.clone(),
            file_name: submission.package.file_name.clone(),
            timestamp: Utc::now().timestamp_millis() as f64,
        };

        let mut state = self.state.write();
        state.files.insert(id.clone(), submission.clone());
        state
            .inboxes
            .entry(submission.recipient.clone())
            .or_default()
            .push(meta);
        Ok(id)
    }

    async fn list_inbox(&self, handle: &str) -> Result<Vec<FileMetadata>> {
        Ok(self
            .state
            .read()
            .inboxes
            .get(handle)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_file(&self, id: &str) -> Result<FileSubmission> {
        self.state
            .read()
            .files
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("file {}", id)))
    }
}
