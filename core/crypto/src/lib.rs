//! Client-side encryption and integrity for IonFS.
//!
//! This module provides:
//! - Key sourcing from a hex key file or a passphrase
//! - AES-256-CBC encryption with PKCS#7 padding and a fresh IV per object
//! - SHA-256 content digests computed over plaintext
//!
//! # Security Notes
//! - Key material is zeroized on drop and redacted in `Debug`
//! - The passphrase scheme is unsalted and kept for interoperability with
//!   existing encrypted objects

pub mod cipher;
pub mod digest;
pub mod keys;

pub use cipher::{decode_iv, decrypt, encode_iv, encrypt, generate_iv, Iv, IV_LENGTH};
pub use digest::content_hash;
pub use keys::{CryptoKey, KEY_LENGTH};
