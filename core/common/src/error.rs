//! Common error types for IonFS.

use thiserror::Error;

use crate::status::StatusMap;
use crate::types::ObjectMetadata;

/// Top-level error type for IonFS operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A remote reference did not carry the scheme prefix.
    #[error("The remote address '{address}' must include the prefix {prefix}")]
    InvalidAddress {
        address: String,
        prefix: &'static str,
    },

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Metadata, folder or particle not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Folder still has entries.
    #[error("Folder '{0}' must be empty, or use the --recursive option")]
    NotEmpty(String),

    /// Remote metadata or particle service could not be reached.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A reachable backend reported a failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Digest of the downloaded plaintext does not match the recorded one.
    #[error("Checksum mismatch for '{}': expected {expected}, got {actual}", metadata.name)]
    ChecksumMismatch {
        expected: String,
        actual: String,
        metadata: Box<ObjectMetadata>,
    },

    /// Some particle operations of a batch did not succeed.
    #[error("{} of {} particle operations failed", .0.failures().count(), .0.len())]
    PartialFailure(StatusMap),

    /// Operation is deliberately not supported.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Metadata record lists no particles.
    #[error("No objects found in metadata for '{0}'")]
    NoObjects(String),

    /// Encrypted object requested without a key.
    #[error("Decryption key required, provide --key or --passphrase")]
    KeyRequired,

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
