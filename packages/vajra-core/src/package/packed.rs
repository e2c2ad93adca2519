//! Legacy length-prefixed binary layout.

use crate::crypto::{Nonce, NONCE_SIZE, SUPPORTED_MODULUS_BITS, TAG_SIZE};
use crate::error::{Error, Result};

use super::{FilePackage, PACKAGE_VERSION};

const LEN_PREFIX: usize = 4;

fn envelope_len_supported(len: usize) -> bool {
    SUPPORTED_MODULUS_BITS.iter().any(|bits| bits / 8 == len)
}

impl FilePackage {
    /// Encode as `[u32 LE len][envelope][IV][ciphertext]`
    pub fn to_packed(&self) -> Result<Vec<u8>> {
        if !envelope_len_supported(self.encrypted_key.len()) {
            return Err(Error::EncryptionFailed(format!(
                "envelope of {} bytes cannot be packed",
                self.encrypted_key.len()
            )));
        }
        // Checked above: at most 512.
        let len = self.encrypted_key.len() as u32;

        let mut out = Vec::with_capacity(
            LEN_PREFIX + self.encrypted_key.len() + NONCE_SIZE + self.file_data.len(),
        );
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&self.encrypted_key);
        out.extend_from_slice(self.iv.as_bytes());
        out.extend_from_slice(&self.file_data);
        Ok(out)
    }

    /// Decode the packed layout
    ///
    /// Fails with [`Error::DecodeError`] when the buffer is truncated or the
    /// length prefix is not a supported envelope size.
    pub fn from_packed(buf: &[u8], file_name: &str, file_type: &str) -> Result<Self> {
        let prefix: [u8; LEN_PREFIX] = buf
            .get(..LEN_PREFIX)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::DecodeError("packed buffer shorter than length prefix".into()))?;
        let envelope_len = u32::from_le_bytes(prefix) as usize;
        if !envelope_len_supported(envelope_len) {
            return Err(Error::DecodeError(format!(
                "unsupported envelope length {}",
                envelope_len
            )));
        }

        let body = &buf[LEN_PREFIX..];
        if body.len() < envelope_len + NONCE_SIZE + TAG_SIZE {
            return Err(Error::DecodeError(format!(
                "packed buffer truncated: {} bytes after prefix",
                body.len()
            )));
        }
        let (encrypted_key, rest) = body.split_at(envelope_len);
        let (iv, file_data) = rest.split_at(NONCE_SIZE);
        let iv: [u8; NONCE_SIZE] = iv
            .try_into()
            .map_err(|_| Error::DecodeError("bad IV length".into()))?;

        Ok(Self {
            version: PACKAGE_VERSION,
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            iv: Nonce::from_bytes(iv),
            encrypted_key: encrypted_key.to_vec(),
            file_data: file_data.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample;
    use super::*;

    #[test]
    fn test_layout() {
        let pkg = sample();
        let buf = pkg.to_packed().unwrap();
        assert_eq!(&buf[..4], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(buf.len(), 4 + 256 + 12 + 40);
        assert_eq!(&buf[260..272], pkg.iv.as_bytes());

        let back = FilePackage::from_packed(&buf, "notes.txt", "text/plain").unwrap();
        assert_eq!(back, pkg);
    }

    #[test]
    fn test_every_supported_envelope_size() {
        for len in [256usize, 384, 512] {
            let mut pkg = sample();
            pkg.encrypted_key = vec![1; len];
            let buf = pkg.to_packed().unwrap();
            assert!(buf[0] == 0x00 || buf[0] == 0x80);
            assert_eq!(FilePackage::from_packed(&buf, "notes.txt", "text/plain").unwrap(), pkg);
        }
    }

    #[test]
    fn test_framing_errors() {
        let buf = sample().to_packed().unwrap();

        assert!(matches!(
            FilePackage::from_packed(&buf[..3], "a", ""),
            Err(Error::DecodeError(_))
        ));
        assert!(matches!(
            FilePackage::from_packed(&buf[..4 + 256 + 12 + 15], "a", ""),
            Err(Error::DecodeError(_))
        ));

        let mut bad_len = buf.clone();
        bad_len[..4].copy_from_slice(&300u32.to_le_bytes());
        assert!(matches!(
            FilePackage::from_packed(&bad_len, "a", ""),
            Err(Error::DecodeError(_))
        ));

        let mut huge = buf;
        huge[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            FilePackage::from_packed(&huge, "a", ""),
            Err(Error::DecodeError(_))
        ));
    }

    #[test]
    fn test_odd_envelope_cannot_be_packed() {
        let mut pkg = sample();
        pkg.encrypted_key = vec![0; 100];
        assert!(pkg.to_packed().is_err());
    }
}
