//! # Cryptography Module
//!
//! All cryptographic primitives used by Vajra Core.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────────┐      ┌──────────────────────────────┐    │
//! │  │  IDENTITY KEY PAIR       │      │  PASSWORD WRAPPER            │    │
//! │  │  RSA-OAEP-SHA256         │      │  PBKDF2-HMAC-SHA256 (100k)   │    │
//! │  │  2048 / 3072 / 4096 bit  │      │   → AES-256-GCM(PKCS#8)      │    │
//! │  └────────────┬─────────────┘      └──────────────────────────────┘    │
//! │               │ seals                                                   │
//! │               ▼                                                         │
//! │  ┌──────────────────────────┐                                          │
//! │  │  PER-FILE CONTENT KEY    │                                          │
//! │  │  AES-256-GCM, 12-byte IV │                                          │
//! │  └──────────────────────────┘                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | RSA-OAEP (SHA-256) | Sealing content keys to a recipient |
//! | AES-256-GCM | File content, private key at rest |
//! | PBKDF2-HMAC-SHA256 | Password → wrapping key |
//! | Base64 (standard) | Transport text for every binary field |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: content keys, wrapping keys and exported private
//!    key bytes are zeroized when dropped
//! 2. **Secure Random**: every salt, nonce and key comes from the injected
//!    [`CryptoProvider`]
//! 3. **No Key Reuse**: fresh content key and nonce per file, fresh salt and
//!    nonce per wrap

pub mod codec;
mod encryption;
mod hybrid;
mod kdf;
mod keys;
mod provider;

pub use encryption::{ContentKey, Nonce, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use hybrid::{DecryptedFile, HybridCipher, Progress};
pub use kdf::{
    derive_wrapping_key, KdfParams, WrappingKey, MAX_ITERATIONS, PBKDF2_ITERATIONS, SALT_SIZE,
};
pub use keys::{
    ExportedPublicKey, KeyPair, KeyPairManager, PrivateKeyHandle, PublicKeyHandle,
    DEFAULT_MODULUS_BITS, PUBLIC_EXPONENT, SUPPORTED_MODULUS_BITS,
};
pub use provider::{CryptoProvider, OsCryptoProvider, SeededCryptoProvider};
