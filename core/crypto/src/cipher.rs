//! Payload encryption using AES-256-CBC with PKCS#7 padding.
//!
//! CBC gives confidentiality only. Integrity comes from the SHA-256 digest of
//! the plaintext recorded in metadata and checked after decryption.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};

use ionfs_common::{Error, Result};

use crate::keys::CryptoKey;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// IV size for AES-CBC (one block).
pub const IV_LENGTH: usize = 16;

/// Initialization vector.
pub type Iv = [u8; IV_LENGTH];

/// Generate a fresh random IV.
pub fn generate_iv() -> Iv {
    rand::random()
}

/// Base64 form stored in metadata.
pub fn encode_iv(iv: &Iv) -> String {
    STANDARD.encode(iv)
}

/// Parse the base64 IV recorded in metadata.
///
/// # Errors
/// - Returns `Crypto` if the text is not base64 or not `IV_LENGTH` bytes
pub fn decode_iv(text: &str) -> Result<Iv> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| Error::Crypto(format!("Invalid IV encoding: {}", e)))?;

    bytes.as_slice().try_into().map_err(|_| {
        Error::Crypto(format!(
            "Invalid IV length: expected {}, got {}",
            IV_LENGTH,
            bytes.len()
        ))
    })
}

/// Encrypt `plaintext` under `key` and `iv`.
///
/// # Postconditions
/// - Output length is the plaintext length rounded up to the next full
///   block (a whole padding block is added when already aligned)
pub fn encrypt(key: &CryptoKey, iv: &Iv, plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(key.as_bytes().into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt `ciphertext` under `key` and `iv`.
///
/// # Errors
/// - Returns `Crypto` if the padding is invalid, which is what a wrong key
///   usually produces
pub fn decrypt(key: &CryptoKey, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>> {
    Aes256CbcDec::new(key.as_bytes().into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| Error::Crypto(format!("Decryption failed: {}", e)))
}
