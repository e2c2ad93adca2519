//! # Core Service
//!
//! [`VajraCore`] bundles the crypto components behind one async surface.
//!
//! ## Operation Set
//!
//! Every primitive operation is a [`Request`] variant, answered by the
//! matching [`Response`] variant. Dispatch is a single exhaustive `match`,
//! run on Tokio's blocking pool because RSA and PBKDF2 are CPU-bound.
//!
//! | Request | Response | Work |
//! |---------|----------|------|
//! | `GenerateKeys` | `KeyPair` | RSA key generation |
//! | `Wrap` | `Wrapped` | PBKDF2 + AES-GCM seal |
//! | `Unwrap` | `Unwrapped` | PBKDF2 + AES-GCM open |
//! | `Encrypt` | `Encrypted` | AES-GCM + RSA-OAEP seal |
//! | `Decrypt` | `Decrypted` | RSA-OAEP + AES-GCM open |
//!
//! ## Flows
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FLOWS                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  register      generate ─► wrap ─► relay.register                      │
//! │  restore       relay.fetch_wrapper + lookup_public_key ─► unwrap       │
//! │  send_file     relay.lookup_public_key ─► encrypt ─► relay.submit_file │
//! │  receive_file  relay.fetch_file ─► decrypt                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::{
    CryptoProvider, DecryptedFile, HybridCipher, KdfParams, KeyPair, KeyPairManager,
    OsCryptoProvider, PrivateKeyHandle, Progress, PublicKeyHandle, DEFAULT_MODULUS_BITS,
};
use crate::error::{Error, Result};
use crate::identity::{validate_handle, Identity, IdentityVault, PasswordWrapper};
use crate::package::FilePackage;
use crate::relay::{FileSubmission, Relay};

/// Configuration for a [`VajraCore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    /// RSA modulus size for new identities
    pub modulus_bits: usize,
    /// Key derivation parameters for new wrappers
    pub kdf: KdfParams,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            modulus_bits: DEFAULT_MODULUS_BITS,
            kdf: KdfParams::default(),
        }
    }
}

impl CoreConfig {
    /// 2048-bit identities, for deployments that must match older clients
    pub fn legacy() -> Self {
        Self {
            modulus_bits: 2048,
            ..Self::default()
        }
    }
}

/// A primitive operation
pub enum Request {
    /// Generate a new key pair
    GenerateKeys,
    /// Wrap a private key under a password
    Wrap {
        /// Key to wrap
        key: PrivateKeyHandle,
        /// Password
        password: Zeroizing<String>,
    },
    /// Recover a private key from its wrapper
    Unwrap {
        /// Stored wrapper
        wrapper: PasswordWrapper,
        /// Password
        password: Zeroizing<String>,
    },
    /// Encrypt a file for a recipient
    Encrypt {
        /// File contents
        data: Vec<u8>,
        /// File name
        file_name: String,
        /// Media type
        file_type: String,
        /// Recipient's public key
        recipient: PublicKeyHandle,
    },
    /// Decrypt a received package
    Decrypt {
        /// The package
        package: FilePackage,
        /// Recipient's private key
        key: PrivateKeyHandle,
    },
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Request::GenerateKeys => "generate_keys",
            Request::Wrap { .. } => "wrap",
            Request::Unwrap { .. } => "unwrap",
            Request::Encrypt { .. } => "encrypt",
            Request::Decrypt { .. } => "decrypt",
        }
    }
}

/// Result of a [`Request`]
#[derive(Debug)]
pub enum Response {
    /// From `GenerateKeys`
    KeyPair(KeyPair),
    /// From `Wrap`
    Wrapped(PasswordWrapper),
    /// From `Unwrap`
    Unwrapped(PrivateKeyHandle),
    /// From `Encrypt`
    Encrypted(FilePackage),
    /// From `Decrypt`
    Decrypted(DecryptedFile),
}

macro_rules! response_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        /// Extract the expected variant
        pub fn $name(self) -> Result<$ty> {
            match self {
                Response::$variant(v) => Ok(v),
                other => Err(Error::Internal(format!(
                    "expected {} response, got {}",
                    stringify!($variant),
                    other.name()
                ))),
            }
        }
    };
}

impl Response {
    fn name(&self) -> &'static str {
        match self {
            Response::KeyPair(_) => "KeyPair",
            Response::Wrapped(_) => "Wrapped",
            Response::Unwrapped(_) => "Unwrapped",
            Response::Encrypted(_) => "Encrypted",
            Response::Decrypted(_) => "Decrypted",
        }
    }

    response_accessor!(into_key_pair, KeyPair, KeyPair);
    response_accessor!(into_wrapper, Wrapped, PasswordWrapper);
    response_accessor!(into_private_key, Unwrapped, PrivateKeyHandle);
    response_accessor!(into_package, Encrypted, FilePackage);
    response_accessor!(into_file, Decrypted, DecryptedFile);
}

/// The crypto core
///
/// Cheap to clone; clones share the same provider.
#[derive(Clone, Debug)]
pub struct VajraCore {
    config: CoreConfig,
    keys: KeyPairManager,
    vault: IdentityVault,
    cipher: HybridCipher,
}

impl VajraCore {
    /// Build a core backed by the OS random number generator
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::with_provider(config, OsCryptoProvider::shared())
    }

    /// Build a core on an explicit provider
    pub fn with_provider(config: CoreConfig, provider: Arc<dyn CryptoProvider>) -> Result<Self> {
        let keys = KeyPairManager::new(provider.clone(), config.modulus_bits)?;
        let vault = IdentityVault::new(provider.clone(), keys.clone(), config.kdf)?;
        let cipher = HybridCipher::new(provider);
        tracing::debug!(
            modulus_bits = config.modulus_bits,
            iterations = config.kdf.iterations,
            "Vajra Core ready"
        );
        Ok(Self {
            config,
            keys,
            vault,
            cipher,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Key pair manager
    pub fn keys(&self) -> &KeyPairManager {
        &self.keys
    }

    /// Identity vault
    pub fn vault(&self) -> &IdentityVault {
        &self.vault
    }

    /// Hybrid cipher
    pub fn cipher(&self) -> &HybridCipher {
        &self.cipher
    }

    /// Run a request synchronously on the current thread
    pub fn execute(&self, request: Request) -> Result<Response> {
        match request {
            Request::GenerateKeys => self.keys.generate().map(Response::KeyPair),
            Request::Wrap { key, password } => {
                self.vault.wrap(&key, &password).map(Response::Wrapped)
            }
            Request::Unwrap { wrapper, password } => self
                .vault
                .unwrap(&wrapper, &password)
                .map(Response::Unwrapped),
            Request::Encrypt {
                data,
                file_name,
                file_type,
                recipient,
            } => self
                .cipher
                .encrypt(&data, &file_name, &file_type, &recipient)
                .map(Response::Encrypted),
            Request::Decrypt { package, key } => {
                package.check_version()?;
                self.cipher.decrypt(&package, &key).map(Response::Decrypted)
            }
        }
    }

    /// Run a request on the blocking pool
    pub async fn dispatch(&self, request: Request) -> Result<Response> {
        let name = request.name();
        let core = self.clone();
        let result = tokio::task::spawn_blocking(move || core.execute(request))
            .await
            .map_err(|e| Error::Internal(format!("{} task failed: {}", name, e)))?;
        if let Err(ref e) = result {
            tracing::debug!(operation = name, code = e.code(), "Operation failed");
        }
        result
    }

    /// Encrypt on the blocking pool, reporting progress checkpoints
    pub async fn encrypt_with_progress<F>(
        &self,
        data: Vec<u8>,
        file_name: String,
        file_type: String,
        recipient: PublicKeyHandle,
        on_progress: F,
    ) -> Result<FilePackage>
    where
        F: FnMut(Progress) + Send + 'static,
    {
        let cipher = self.cipher.clone();
        tokio::task::spawn_blocking(move || {
            cipher.encrypt_with_progress(&data, &file_name, &file_type, &recipient, on_progress)
        })
        .await
        .map_err(|e| Error::Internal(format!("encrypt task failed: {}", e)))?
    }

    // ========================================================================
    // FLOWS
    // ========================================================================

    /// Create an identity and publish it to the relay
    ///
    /// Returns the unlocked identity. Fails with [`Error::HandleTaken`]
    /// before generating keys if the relay already knows the handle.
    pub async fn register(&self, relay: &dyn Relay, handle: &str, password: &str) -> Result<Identity> {
        let handle = validate_handle(handle)?;
        if relay.lookup_public_key(&handle).await?.is_some() {
            return Err(Error::HandleTaken(handle));
        }

        let vault = self.vault.clone();
        let password = Zeroizing::new(password.to_string());
        let (identity, registration) = tokio::task::spawn_blocking(move || {
            Identity::register(&vault, &handle, &password)
        })
        .await
        .map_err(|e| Error::Internal(format!("register task failed: {}", e)))??;

        relay.register(&registration).await?;
        tracing::info!(handle = identity.handle(), "Registered with relay");
        Ok(identity)
    }

    /// Recover an identity from the relay's wrapper backup
    pub async fn restore(&self, relay: &dyn Relay, handle: &str, password: &str) -> Result<Identity> {
        let handle = validate_handle(handle)?;
        let wrapper = relay
            .fetch_wrapper(&handle)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no key backup for {}", handle)))?;
        let public_key = relay
            .lookup_public_key(&handle)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no public key for {}", handle)))?;

        let mut identity = Identity::from_parts(&handle, public_key, wrapper)?;
        self.unlock(&mut identity, password).await?;
        Ok(identity)
    }

    /// Unlock a wrapped identity on the blocking pool
    pub async fn unlock(&self, identity: &mut Identity, password: &str) -> Result<()> {
        if identity.is_unlocked() {
            return Ok(());
        }
        let response = self
            .dispatch(Request::Unwrap {
                wrapper: identity.wrapper().clone(),
                password: Zeroizing::new(password.to_string()),
            })
            .await?;
        identity.adopt_unwrapped(&self.keys, response.into_private_key()?)
    }

    /// Encrypt a file for `recipient` and upload it
    ///
    /// Returns the relay's file id.
    pub async fn send_file(
        &self,
        relay: &dyn Relay,
        sender: &Identity,
        recipient: &str,
        data: Vec<u8>,
        file_name: &str,
        file_type: &str,
    ) -> Result<String> {
        let recipient = validate_handle(recipient)?;
        let public_key = relay
            .lookup_public_key(&recipient)
            .await?
            .ok_or_else(|| Error::NotFound(format!("unknown recipient {}", recipient)))?;
        let recipient_key = self.keys.import_public(public_key.as_str())?;

        let len = data.len();
        let package = self
            .dispatch(Request::Encrypt {
                data,
                file_name: file_name.to_string(),
                file_type: file_type.to_string(),
                recipient: recipient_key,
            })
            .await?
            .into_package()?;

        let id = relay
            .submit_file(&FileSubmission {
                sender: sender.handle().to_string(),
                recipient: recipient.clone(),
                package,
            })
            .await?;
        tracing::info!(
            id = %id,
            sender = sender.handle(),
            recipient = %recipient,
            len,
            "File sent"
        );
        Ok(id)
    }

    /// Download and decrypt a file addressed to `identity`
    pub async fn receive_file(
        &self,
        relay: &dyn Relay,
        identity: &Identity,
        file_id: &str,
    ) -> Result<DecryptedFile> {
        let key = identity.private_key()?.clone();
        let record = relay.fetch_file(file_id).await?;
        if record.recipient != identity.handle() {
            tracing::warn!(
                id = file_id,
                recipient = %record.recipient,
                "File is addressed to a different handle"
            );
        }

        let file = self
            .dispatch(Request::Decrypt {
                package: record.package,
                key,
            })
            .await?
            .into_file()?;
        tracing::info!(id = file_id, sender = %record.sender, len = file.data.len(), "File received");
        Ok(file)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SeededCryptoProvider;
    use crate::relay::MemoryRelay;
    use crate::testing::{fast_kdf, ALICE, BOB};

    fn core() -> VajraCore {
        VajraCore::new(CoreConfig {
            kdf: fast_kdf(),
            ..CoreConfig::legacy()
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.modulus_bits, 4096);
        assert_eq!(config.kdf.iterations, 100_000);
        assert_eq!(CoreConfig::legacy().modulus_bits, 2048);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CoreConfig {
            modulus_bits: 1024,
            ..CoreConfig::default()
        };
        assert!(matches!(VajraCore::new(config), Err(Error::KeyFormatError(_))));
    }

    #[tokio::test]
    async fn test_dispatch_wrap_unwrap() {
        let core = core();
        let wrapper = core
            .dispatch(Request::Wrap {
                key: ALICE.private.clone(),
                password: Zeroizing::new("p@ss1".into()),
            })
            .await
            .unwrap()
            .into_wrapper()
            .unwrap();

        let key = core
            .dispatch(Request::Unwrap {
                wrapper: wrapper.clone(),
                password: Zeroizing::new("p@ss1".into()),
            })
            .await
            .unwrap()
            .into_private_key()
            .unwrap();
        assert_eq!(key.public_key(), ALICE.public);

        let err = core
            .dispatch(Request::Unwrap {
                wrapper,
                password: Zeroizing::new("nope".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationError));
    }

    #[tokio::test]
    async fn test_dispatch_encrypt_decrypt() {
        let core = core();
        let package = core
            .dispatch(Request::Encrypt {
                data: b"hello".to_vec(),
                file_name: "h.txt".into(),
                file_type: "text/plain".into(),
                recipient: BOB.public.clone(),
            })
            .await
            .unwrap()
            .into_package()
            .unwrap();

        let file = core
            .dispatch(Request::Decrypt {
                package: package.clone(),
                key: BOB.private.clone(),
            })
            .await
            .unwrap()
            .into_file()
            .unwrap();
        assert_eq!(file.data, b"hello");

        let mut future = package;
        future.version = 9;
        assert!(matches!(
            core.dispatch(Request::Decrypt {
                package: future,
                key: BOB.private.clone()
            })
            .await,
            Err(Error::UnsupportedVersion(ref v)) if v == "9"
        ));
    }

    #[tokio::test]
    async fn test_wrong_accessor_is_internal_error() {
        let core = core();
        let response = core
            .dispatch(Request::Wrap {
                key: ALICE.private.clone(),
                password: Zeroizing::new(String::new()),
            })
            .await
            .unwrap();
        assert!(matches!(response.into_package(), Err(Error::Internal(_))));
    }

    #[test]
    fn test_seeded_core_is_reproducible() {
        let config = CoreConfig {
            kdf: fast_kdf(),
            ..CoreConfig::legacy()
        };
        let a = VajraCore::with_provider(config, SeededCryptoProvider::shared(42)).unwrap();
        let b = VajraCore::with_provider(config, SeededCryptoProvider::shared(42)).unwrap();

        let ka = a.execute(Request::GenerateKeys).unwrap().into_key_pair().unwrap();
        let kb = b.execute(Request::GenerateKeys).unwrap().into_key_pair().unwrap();
        assert_eq!(ka.public, kb.public);
    }

    #[tokio::test]
    async fn test_register_send_receive() {
        let core = core();
        let relay = MemoryRelay::new();

        let alice = core.register(&relay, "alice", "p@ss1").await.unwrap();
        let bob = core.register(&relay, "bob", "hunter2").await.unwrap();

        let id = core
            .send_file(&relay, &alice, "bob", b"for bob".to_vec(), "b.txt", "text/plain")
            .await
            .unwrap();
        let inbox = relay.list_inbox("bob").await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].sender, "alice");

        let file = core.receive_file(&relay, &bob, &id).await.unwrap();
        assert_eq!(file.data, b"for bob");
        assert_eq!(file.file_name, "b.txt");

        assert!(matches!(
            core.receive_file(&relay, &alice, &id).await,
            Err(Error::UnsealError) | Err(Error::IntegrityError)
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_handle() {
        let core = core();
        let relay = MemoryRelay::new();
        core.register(&relay, "alice", "p@ss1").await.unwrap();
        assert!(matches!(
            core.register(&relay, "alice", "other").await,
            Err(Error::HandleTaken(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_and_locked_receive() {
        let core = core();
        let relay = MemoryRelay::new();
        let alice = core.register(&relay, "alice", "p@ss1").await.unwrap();
        core.register(&relay, "bob", "hunter2").await.unwrap();
        let id = core
            .send_file(&relay, &alice, "bob", b"x".to_vec(), "x", "")
            .await
            .unwrap();

        assert!(matches!(
            core.restore(&relay, "bob", "wrong").await,
            Err(Error::AuthenticationError)
        ));
        assert!(matches!(
            core.restore(&relay, "carol", "x").await,
            Err(Error::NotFound(_))
        ));

        let mut bob = core.restore(&relay, "bob", "hunter2").await.unwrap();
        bob.lock();
        assert!(matches!(
            core.receive_file(&relay, &bob, &id).await,
            Err(Error::IdentityLocked)
        ));
        core.unlock(&mut bob, "hunter2").await.unwrap();
        assert_eq!(core.receive_file(&relay, &bob, &id).await.unwrap().data, b"x");
    }

    #[tokio::test]
    async fn test_send_to_unknown_recipient() {
        let core = core();
        let relay = MemoryRelay::new();
        let alice = core.register(&relay, "alice", "p@ss1").await.unwrap();
        assert!(matches!(
            core.send_file(&relay, &alice, "nobody", vec![], "a", "").await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(relay.file_count(), 0);
    }

    #[tokio::test]
    async fn test_encrypt_with_progress() {
        let core = core();
        let (tx, rx) = std::sync::mpsc::channel();
        let package = core
            .encrypt_with_progress(
                vec![1, 2, 3],
                "p".into(),
                "".into(),
                BOB.public.clone(),
                move |p| {
                    let _ = tx.send(p);
                },
            )
            .await
            .unwrap();
        assert_eq!(package.file_data.len(), 3 + crate::crypto::TAG_SIZE);
        let seen: Vec<Progress> = rx.try_iter().collect();
        assert_eq!(
            seen,
            vec![Progress::Started, Progress::ContentSealed, Progress::Complete]
        );
    }
}
