//! In-memory particle store (for testing).

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use ionfs_common::{Error, Result, Usage, STATUS_OK};

use crate::client::{ParticleResponse, ParticleStore};

const NOT_FOUND: u16 = 404;

/// In-memory particle store.
///
/// Data, secrets and manifests live in separate maps. `poison` makes every
/// later call on an identifier answer with a chosen status.
pub struct MemoryParticleStore {
    data: RwLock<HashMap<Uuid, Bytes>>,
    secrets: RwLock<HashMap<Uuid, Bytes>>,
    manifests: RwLock<HashMap<Uuid, Bytes>>,
    poisoned: RwLock<HashMap<Uuid, u16>>,
    classifications: BTreeMap<i32, String>,
}

impl MemoryParticleStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            secrets: RwLock::new(HashMap::new()),
            manifests: RwLock::new(HashMap::new()),
            poisoned: RwLock::new(HashMap::new()),
            classifications: BTreeMap::from([(0, "Unclassified".to_string())]),
        }
    }

    pub fn with_classifications(mut self, classifications: BTreeMap<i32, String>) -> Self {
        self.classifications = classifications;
        self
    }

    /// Make every later call on `id` answer `status`.
    pub fn poison(&self, id: Uuid, status: u16) -> Result<()> {
        let mut poisoned = self.poisoned.write().map_err(|_| Self::lock_error())?;
        poisoned.insert(id, status);
        Ok(())
    }

    pub fn contains(&self, usage: Usage, id: &Uuid) -> Result<bool> {
        let map = self.map(usage).read().map_err(|_| Self::lock_error())?;
        Ok(map.contains_key(id))
    }

    pub fn contains_manifest(&self, id: &Uuid) -> Result<bool> {
        let map = self.manifests.read().map_err(|_| Self::lock_error())?;
        Ok(map.contains_key(id))
    }

    /// Number of stored particles for `usage`.
    pub fn count(&self, usage: Usage) -> Result<usize> {
        let map = self.map(usage).read().map_err(|_| Self::lock_error())?;
        Ok(map.len())
    }

    fn map(&self, usage: Usage) -> &RwLock<HashMap<Uuid, Bytes>> {
        match usage {
            Usage::Data => &self.data,
            Usage::Secrets => &self.secrets,
        }
    }

    fn lock_error() -> Error {
        Error::Backend("memory particle store lock poisoned".to_string())
    }

    fn injected(&self, id: &Uuid) -> Result<Option<u16>> {
        let poisoned = self.poisoned.read().map_err(|_| Self::lock_error())?;
        Ok(poisoned.get(id).copied())
    }

    fn store(map: &RwLock<HashMap<Uuid, Bytes>>, id: Uuid, data: Bytes) -> Result<u16> {
        let mut map = map.write().map_err(|_| Self::lock_error())?;
        map.insert(id, data);
        Ok(STATUS_OK)
    }

    fn fetch(map: &RwLock<HashMap<Uuid, Bytes>>, id: &Uuid) -> Result<ParticleResponse> {
        let map = map.read().map_err(|_| Self::lock_error())?;
        Ok(match map.get(id) {
            Some(data) => ParticleResponse::ok(data.clone()),
            None => ParticleResponse::status(NOT_FOUND),
        })
    }

    fn remove(map: &RwLock<HashMap<Uuid, Bytes>>, id: &Uuid) -> Result<u16> {
        let mut map = map.write().map_err(|_| Self::lock_error())?;
        Ok(if map.remove(id).is_some() {
            STATUS_OK
        } else {
            NOT_FOUND
        })
    }
}

impl Default for MemoryParticleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParticleStore for MemoryParticleStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(
        &self,
        usage: Usage,
        id: Uuid,
        data: Bytes,
        _classification: Option<&str>,
    ) -> Result<u16> {
        if let Some(status) = self.injected(&id)? {
            return Ok(status);
        }
        Self::store(self.map(usage), id, data)
    }

    async fn get(&self, usage: Usage, id: Uuid) -> Result<ParticleResponse> {
        if let Some(status) = self.injected(&id)? {
            return Ok(ParticleResponse::status(status));
        }
        Self::fetch(self.map(usage), &id)
    }

    async fn delete(&self, usage: Usage, id: Uuid, _timeout: Duration) -> Result<u16> {
        if let Some(status) = self.injected(&id)? {
            return Ok(status);
        }
        Self::remove(self.map(usage), &id)
    }

    async fn put_manifest(
        &self,
        id: Uuid,
        data: Bytes,
        _chunk_size: usize,
        _classification: Option<&str>,
    ) -> Result<u16> {
        if let Some(status) = self.injected(&id)? {
            return Ok(status);
        }
        Self::store(&self.manifests, id, data)
    }

    async fn get_manifest(&self, id: Uuid) -> Result<ParticleResponse> {
        if let Some(status) = self.injected(&id)? {
            return Ok(ParticleResponse::status(status));
        }
        Self::fetch(&self.manifests, &id)
    }

    async fn delete_manifest(&self, id: Uuid, _timeout: Duration) -> Result<u16> {
        if let Some(status) = self.injected(&id)? {
            return Ok(status);
        }
        Self::remove(&self.manifests, &id)
    }

    async fn classifications(&self) -> Result<BTreeMap<i32, String>> {
        Ok(self.classifications.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DELETE_TIMEOUT;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryParticleStore::new();
        let id = Uuid::new_v4();

        let status = store
            .put(Usage::Data, id, Bytes::from_static(b"abc"), None)
            .await
            .unwrap();
        assert_eq!(status, STATUS_OK);

        let got = store.get(Usage::Data, id).await.unwrap();
        assert_eq!(got.data.unwrap(), Bytes::from_static(b"abc"));

        assert_eq!(store.delete(Usage::Data, id, DELETE_TIMEOUT).await.unwrap(), STATUS_OK);
        assert_eq!(store.delete(Usage::Data, id, DELETE_TIMEOUT).await.unwrap(), 404);
        assert_eq!(store.get(Usage::Data, id).await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_usage_surfaces_are_separate() {
        let store = MemoryParticleStore::new();
        let id = Uuid::new_v4();
        store
            .put(Usage::Secrets, id, Bytes::from_static(b"s"), None)
            .await
            .unwrap();

        assert!(store.contains(Usage::Secrets, &id).unwrap());
        assert!(!store.contains(Usage::Data, &id).unwrap());
        assert_eq!(store.get(Usage::Data, id).await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_poison() {
        let store = MemoryParticleStore::new();
        let id = Uuid::new_v4();
        store.poison(id, 503).unwrap();

        let status = store
            .put(Usage::Data, id, Bytes::from_static(b"x"), None)
            .await
            .unwrap();
        assert_eq!(status, 503);
        assert!(!store.contains(Usage::Data, &id).unwrap());
    }

    #[tokio::test]
    async fn test_manifest() {
        let store = MemoryParticleStore::new();
        let id = Uuid::new_v4();
        store
            .put_manifest(id, Bytes::from_static(b"big"), 1, None)
            .await
            .unwrap();
        assert!(store.contains_manifest(&id).unwrap());
        assert_eq!(
            store.get_manifest(id).await.unwrap().data.unwrap(),
            Bytes::from_static(b"big")
        );
        assert_eq!(store.delete_manifest(id, DELETE_TIMEOUT).await.unwrap(), STATUS_OK);
        assert!(!store.contains_manifest(&id).unwrap());
    }
}
