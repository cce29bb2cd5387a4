//! Particle store contract.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use ionfs_common::{Error, Result, Usage, STATUS_OK};

/// Timeout carried by every delete call.
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of a particle read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleResponse {
    pub status: u16,
    /// Payload, present iff `status` is success.
    pub data: Option<Bytes>,
}

impl ParticleResponse {
    pub fn ok(data: Bytes) -> Self {
        Self {
            status: STATUS_OK,
            data: Some(data),
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, data: None }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK && self.data.is_some()
    }
}

/// Blob-store client.
///
/// `Ok(status)` is returned for every answer the store gives, including
/// failures such as 404. `Err` means the call could not be made or answered
/// at all.
#[async_trait]
pub trait ParticleStore: Send + Sync {
    /// Client name (e.g. "memory", "local", "http").
    fn name(&self) -> &str;

    /// Store one particle.
    ///
    /// `usage` selects the general-data or secrets API surface.
    async fn put(
        &self,
        usage: Usage,
        id: Uuid,
        data: Bytes,
        classification: Option<&str>,
    ) -> Result<u16>;

    /// Fetch one particle.
    async fn get(&self, usage: Usage, id: Uuid) -> Result<ParticleResponse>;

    /// Delete one particle.
    async fn delete(&self, usage: Usage, id: Uuid, timeout: Duration) -> Result<u16>;

    /// Store a whole payload under one identifier, split server-side into
    /// parts of `chunk_size`.
    async fn put_manifest(
        &self,
        id: Uuid,
        data: Bytes,
        chunk_size: usize,
        classification: Option<&str>,
    ) -> Result<u16>;

    /// Fetch a manifest payload, reassembled server-side.
    async fn get_manifest(&self, id: Uuid) -> Result<ParticleResponse>;

    async fn delete_manifest(&self, id: Uuid, timeout: Duration) -> Result<u16>;

    /// Classification policies known to the store, by code.
    async fn classifications(&self) -> Result<BTreeMap<i32, String>>;

    /// Check that the store is reachable.
    async fn check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Status code recorded for a call that failed before the store answered.
pub fn status_for_error(e: &Error) -> u16 {
    match e {
        Error::NotFound(_) => 404,
        Error::BackendUnavailable(_) => 503,
        _ => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_error() {
        assert_eq!(status_for_error(&Error::NotFound("x".into())), 404);
        assert_eq!(status_for_error(&Error::BackendUnavailable("x".into())), 503);
        assert_eq!(status_for_error(&Error::Backend("x".into())), 500);
    }

    #[test]
    fn test_response() {
        assert!(ParticleResponse::ok(Bytes::from_static(b"a")).is_ok());
        assert!(!ParticleResponse::status(404).is_ok());
    }
}
