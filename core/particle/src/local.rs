//! Local directory particle store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use ionfs_common::{Error, Result, Usage, STATUS_OK};

use crate::client::{ParticleResponse, ParticleStore};

const NOT_FOUND: u16 = 404;

/// Particles as files under a directory.
///
/// Layout: `data/<id>`, `secrets/<id>` and `manifest/<id>/<part>`, where a
/// manifest is split into numbered parts of the requested chunk size.
pub struct LocalParticleStore {
    root: PathBuf,
}

impl LocalParticleStore {
    /// Open a store rooted at `root`.
    ///
    /// # Postconditions
    /// - `data/`, `secrets/` and `manifest/` exist under the root
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in ["data", "secrets", "manifest"] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    fn particle_path(&self, usage: Usage, id: &Uuid) -> PathBuf {
        let dir = match usage {
            Usage::Data => "data",
            Usage::Secrets => "secrets",
        };
        self.root.join(dir).join(id.to_string())
    }

    fn manifest_dir(&self, id: &Uuid) -> PathBuf {
        self.root.join("manifest").join(id.to_string())
    }

    fn status_of(e: std::io::Error) -> Result<u16> {
        if e.kind() == ErrorKind::NotFound {
            Ok(NOT_FOUND)
        } else {
            Err(Error::Io(e))
        }
    }
}

#[async_trait]
impl ParticleStore for LocalParticleStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(
        &self,
        usage: Usage,
        id: Uuid,
        data: Bytes,
        _classification: Option<&str>,
    ) -> Result<u16> {
        fs::write(self.particle_path(usage, &id), &data).await?;
        Ok(STATUS_OK)
    }

    async fn get(&self, usage: Usage, id: Uuid) -> Result<ParticleResponse> {
        match fs::read(self.particle_path(usage, &id)).await {
            Ok(data) => Ok(ParticleResponse::ok(Bytes::from(data))),
            Err(e) => Self::status_of(e).map(ParticleResponse::status),
        }
    }

    async fn delete(&self, usage: Usage, id: Uuid, _timeout: Duration) -> Result<u16> {
        match fs::remove_file(self.particle_path(usage, &id)).await {
            Ok(()) => Ok(STATUS_OK),
            Err(e) => Self::status_of(e),
        }
    }

    async fn put_manifest(
        &self,
        id: Uuid,
        data: Bytes,
        chunk_size: usize,
        _classification: Option<&str>,
    ) -> Result<u16> {
        let dir = self.manifest_dir(&id);
        if fs::metadata(&dir).await.is_ok() {
            fs::remove_dir_all(&dir).await?;
        }
        fs::create_dir_all(&dir).await?;

        let chunk_size = if chunk_size == 0 { data.len().max(1) } else { chunk_size };
        let mut part = 0usize;
        let mut offset = 0usize;
        loop {
            let end = (offset + chunk_size).min(data.len());
            fs::write(dir.join(format!("{:05}", part)), data.slice(offset..end)).await?;
            part += 1;
            offset = end;
            if offset >= data.len() {
                break;
            }
        }

        debug!(id = %id, parts = part, "Stored manifest");
        Ok(STATUS_OK)
    }

    async fn get_manifest(&self, id: Uuid) -> Result<ParticleResponse> {
        let mut entries = match fs::read_dir(self.manifest_dir(&id)).await {
            Ok(entries) => entries,
            Err(e) => return Self::status_of(e).map(ParticleResponse::status),
        };

        let mut parts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            parts.push(entry.path());
        }
        parts.sort();

        let mut data = Vec::new();
        for part in parts {
            data.extend_from_slice(&fs::read(part).await?);
        }
        Ok(ParticleResponse::ok(Bytes::from(data)))
    }

    async fn delete_manifest(&self, id: Uuid, _timeout: Duration) -> Result<u16> {
        match fs::remove_dir_all(self.manifest_dir(&id)).await {
            Ok(()) => Ok(STATUS_OK),
            Err(e) => Self::status_of(e),
        }
    }

    async fn classifications(&self) -> Result<BTreeMap<i32, String>> {
        Ok(BTreeMap::from([(0, "Unclassified".to_string())]))
    }

    async fn check(&self) -> Result<bool> {
        Ok(fs::metadata(&self.root).await.map(|m| m.is_dir()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DELETE_TIMEOUT;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_particle_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = LocalParticleStore::new(temp.path()).unwrap();
        let id = Uuid::new_v4();

        store
            .put(Usage::Data, id, Bytes::from_static(b"particle"), Some("Unclassified"))
            .await
            .unwrap();
        assert!(temp.path().join("data").join(id.to_string()).exists());

        let got = store.get(Usage::Data, id).await.unwrap();
        assert_eq!(got.data.unwrap(), Bytes::from_static(b"particle"));

        assert_eq!(store.delete(Usage::Data, id, DELETE_TIMEOUT).await.unwrap(), STATUS_OK);
        assert_eq!(store.get(Usage::Data, id).await.unwrap().status, 404);
        assert_eq!(store.delete(Usage::Data, id, DELETE_TIMEOUT).await.unwrap(), 404);
    }

    #[tokio::test]
    async fn test_local_manifest_parts() {
        let temp = TempDir::new().unwrap();
        let store = LocalParticleStore::new(temp.path()).unwrap();
        let id = Uuid::new_v4();
        let payload: Vec<u8> = (0..25u8).collect();

        store
            .put_manifest(id, Bytes::from(payload.clone()), 10, None)
            .await
            .unwrap();

        let parts = std::fs::read_dir(temp.path().join("manifest").join(id.to_string()))
            .unwrap()
            .count();
        assert_eq!(parts, 3);

        let got = store.get_manifest(id).await.unwrap();
        assert_eq!(got.data.unwrap().to_vec(), payload);

        assert_eq!(store.delete_manifest(id, DELETE_TIMEOUT).await.unwrap(), STATUS_OK);
        assert_eq!(store.get_manifest(id).await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_local_check() {
        let temp = TempDir::new().unwrap();
        let store = LocalParticleStore::new(temp.path().join("particles")).unwrap();
        assert!(store.check().await.unwrap());
    }
}
