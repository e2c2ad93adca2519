//! # Transport Codec
//!
//! Every binary value that leaves the core (public keys, salts, IVs, sealed
//! key envelopes, ciphertext) travels as base64 text.
//!
//! | Direction | Alphabet | Padding | Whitespace |
//! |-----------|----------|---------|------------|
//! | encode | standard (`+/`) | always `=` padded | none emitted |
//! | decode | standard (`+/`) | optional | ASCII whitespace skipped |
//!
//! Decoding is as lenient as a browser's `atob`, so text produced by web
//! clients round-trips unchanged. Anything outside the alphabet is a
//! [`Error::DecodeError`].

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::error::{Error, Result};

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encode bytes as padded standard base64
pub fn encode(bytes: &[u8]) -> String {
    ENGINE.encode(bytes)
}

/// Decode base64 text, padding optional
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let result = if text.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        ENGINE.decode(compact)
    } else {
        ENGINE.decode(text)
    };
    result.map_err(|e| Error::DecodeError(e.to_string()))
}

/// Decode base64 text that must hold exactly `N` bytes
pub fn decode_array<const N: usize>(text: &str) -> Result<[u8; N]> {
    let bytes = decode(text)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| Error::DecodeError(format!("expected {} bytes, got {}", N, len)))
}

/// Serde helper for `Vec<u8>` fields carried as base64 text
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as base64 text
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(bytes))
    }

    /// Deserialize from base64 text
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for fixed-size arrays carried as base64 text
pub mod base64_array {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as base64 text
    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(bytes))
    }

    /// Deserialize from base64 text of exactly `N` bytes
    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_array::<N>(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for len in [0usize, 1, 2, 3, 4, 31, 32, 33, 1000] {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_round_trip_large() {
        let bytes: Vec<u8> = (0..20 * 1024 * 1024).map(|i: usize| (i % 251) as u8).collect();
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "Zg==");
        assert_eq!(encode(b"fo"), "Zm8=");
        assert_eq!(encode(b"foo"), "Zm9v");
        assert_eq!(encode(&[0xfb, 0xff]), "+/8=");
    }

    #[test]
    fn test_padding_optional() {
        assert_eq!(decode("Zg").unwrap(), b"f");
        assert_eq!(decode("Zg==").unwrap(), b"f");
        assert_eq!(decode("Zm8").unwrap(), b"fo");
    }

    #[test]
    fn test_whitespace_ignored() {
        assert_eq!(decode("Zm9v\nYmFy").unwrap(), b"foobar");
        assert_eq!(decode(" Zm9v ").unwrap(), b"foo");
    }

    #[test]
    fn test_invalid_characters_rejected() {
        assert!(matches!(decode("Zm9v!"), Err(Error::DecodeError(_))));
        assert!(matches!(decode("Zm-_"), Err(Error::DecodeError(_))));
        assert!(matches!(decode("Z"), Err(Error::DecodeError(_))));
    }

    #[test]
    fn test_decode_array_length() {
        let text = encode(&[1u8; 12]);
        assert_eq!(decode_array::<12>(&text).unwrap(), [1u8; 12]);
        assert!(matches!(decode_array::<16>(&text), Err(Error::DecodeError(_))));
    }
}
