//! Key types with secure memory handling.
//!
//! Keys zeroize their memory on drop and never print their bytes.

use std::fmt;
use std::path::Path;

use zeroize::{Zeroize, ZeroizeOnDrop};

use ionfs_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Symmetric key used to encrypt object payloads.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CryptoKey {
    key: [u8; KEY_LENGTH],
}

impl CryptoKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Derive a key from a passphrase.
    ///
    /// The first half is `MD5(passphrase)`, the second half is
    /// `MD5(first half || passphrase)`. The passphrase is hashed as ASCII:
    /// every non-ASCII character becomes one `?` byte, so existing keys
    /// derived that way still match.
    ///
    /// # Preconditions
    /// - `passphrase` must be non-empty
    ///
    /// # Errors
    /// - Returns `InvalidInput` if the passphrase is empty
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(Error::InvalidInput(
                "passphrase cannot be empty".to_string(),
            ));
        }

        let mut ascii: Vec<u8> = passphrase
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect();

        let first = md5::compute(&ascii);

        let mut ctx = md5::Context::new();
        ctx.consume(first.0);
        ctx.consume(&ascii);
        let second = ctx.compute();
        ascii.zeroize();

        let mut key = [0u8; KEY_LENGTH];
        key[..16].copy_from_slice(&first.0);
        key[16..].copy_from_slice(&second.0);
        Ok(Self { key })
    }

    /// Parse a hex-encoded key, ignoring surrounding whitespace.
    ///
    /// # Errors
    /// - Returns `Crypto` if the text is not hex or does not decode to
    ///   `KEY_LENGTH` bytes
    pub fn from_hex(text: &str) -> Result<Self> {
        let mut bytes = hex::decode(text.trim())
            .map_err(|e| Error::Crypto(format!("Invalid key encoding: {}", e)))?;

        if bytes.len() != KEY_LENGTH {
            let len = bytes.len();
            bytes.zeroize();
            return Err(Error::Crypto(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LENGTH, len
            )));
        }

        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    /// Read a hex key file.
    pub fn from_key_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut text = std::fs::read_to_string(path.as_ref())?;
        let key = Self::from_hex(&text);
        text.zeroize();
        key
    }

    /// Uppercase hex form, as written to key files.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.key)
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for CryptoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_derivation_vectors() {
        let key = CryptoKey::from_passphrase("x").unwrap();
        assert_eq!(
            key.to_hex(),
            "9DD4E461268C8034F5C8564E155C67A6C655CFB544097EF213C59DB9889488AB"
        );

        let key = CryptoKey::from_passphrase("correct horse").unwrap();
        assert_eq!(
            key.to_hex(),
            "3CB4E732631F47E6EB961F34554B7CDE8ACE33BDAC244269F1A356B6733E4CF5"
        );
    }

    #[test]
    fn test_non_ascii_passphrase_hashed_as_question_marks() {
        let accented = CryptoKey::from_passphrase("pässwörd").unwrap();
        let replaced = CryptoKey::from_passphrase("p?ssw?rd").unwrap();
        assert_eq!(accented.to_hex(), replaced.to_hex());

        let emoji = CryptoKey::from_passphrase("key🔑").unwrap();
        assert_eq!(emoji.to_hex(), CryptoKey::from_passphrase("key?").unwrap().to_hex());

        assert_ne!(
            replaced.to_hex(),
            CryptoKey::from_passphrase("password").unwrap().to_hex()
        );
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(CryptoKey::from_passphrase("").is_err());
    }

    #[test]
    fn test_hex_round_trip() {
        let key = CryptoKey::from_passphrase("x").unwrap();
        let parsed = CryptoKey::from_hex(&format!("  {}\n", key.to_hex())).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());

        let lower = CryptoKey::from_hex(&key.to_hex().to_lowercase()).unwrap();
        assert_eq!(lower.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_hex_wrong_length() {
        assert!(matches!(CryptoKey::from_hex("ABCD"), Err(Error::Crypto(_))));
        assert!(matches!(CryptoKey::from_hex("zz"), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_key_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ionfs.key");
        let key = CryptoKey::from_passphrase("correct horse").unwrap();
        std::fs::write(&path, key.to_hex()).unwrap();

        let loaded = CryptoKey::from_key_file(&path).unwrap();
        assert_eq!(loaded.as_bytes(), key.as_bytes());

        assert!(CryptoKey::from_key_file(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_debug_redacted() {
        let key = CryptoKey::from_passphrase("x").unwrap();
        assert_eq!(format!("{:?}", key), "CryptoKey([REDACTED])");
    }
}
