//! Object-storage metadata store.
//!
//! One object per metadata record, keyed by full path. Folder markers are
//! empty objects whose key ends with the delimiter. Listings use prefix and
//! delimiter queries; common prefixes become folder entries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use ionfs_common::{Error, ObjectDescriptor, ObjectMetadata, Result, DELIMITER};

use crate::store::{ancestor_folders, descriptor_from_key, MetadataStore};

/// Result of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Keys directly matched (all keys when no delimiter is given).
    pub keys: Vec<String>,
    /// Prefixes rolled up at the delimiter.
    pub common_prefixes: Vec<String>,
}

/// Minimal bucket operations the store needs.
#[async_trait]
pub trait ObjectBucket: Send + Sync {
    /// Bucket name.
    fn bucket(&self) -> &str;

    /// List keys under `prefix`, rolling up at `delimiter` when given.
    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing>;

    /// Object body, `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    async fn put(&self, key: &str, body: Bytes) -> Result<()>;

    /// Server-side copy within the bucket.
    async fn copy(&self, from: &str, to: &str) -> Result<()>;

    /// Delete an object; deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Metadata store over an object bucket.
pub struct ObjectStorageStore<B> {
    bucket: B,
}

impl<B: ObjectBucket> ObjectStorageStore<B> {
    pub fn new(bucket: B) -> Self {
        Self { bucket }
    }

    pub fn bucket(&self) -> &B {
        &self.bucket
    }
}

#[async_trait]
impl<B: ObjectBucket> MetadataStore for ObjectStorageStore<B> {
    fn name(&self) -> &str {
        "s3"
    }

    fn data_store(&self) -> &str {
        self.bucket.bucket()
    }

    async fn exists(&self, target: &ObjectDescriptor) -> Result<bool> {
        if target.is_root {
            return Ok(true);
        }
        if !target.is_folder {
            return self.bucket.exists(&target.full_name()).await;
        }
        if self.bucket.exists(&target.path).await? {
            return Ok(true);
        }
        let listing = self.bucket.list(&target.path, Some(DELIMITER)).await?;
        Ok(!listing.keys.is_empty() || !listing.common_prefixes.is_empty())
    }

    async fn list(
        &self,
        folder: &ObjectDescriptor,
        recursive: bool,
    ) -> Result<Vec<ObjectDescriptor>> {
        let prefix = folder.path.as_str();
        let mut keys = BTreeSet::new();

        if recursive {
            let listing = self.bucket.list(prefix, None).await?;
            for key in listing.keys {
                keys.extend(
                    ancestor_folders(&key)
                        .into_iter()
                        .filter(|f| f.len() > prefix.len()),
                );
                keys.insert(key);
            }
        } else {
            let listing = self.bucket.list(prefix, Some(DELIMITER)).await?;
            keys.extend(listing.keys);
            keys.extend(listing.common_prefixes);
        }
        keys.remove(prefix);

        debug!(bucket = %self.bucket.bucket(), prefix = %prefix, count = keys.len(), "Listed objects");
        Ok(keys.iter().map(|k| descriptor_from_key(k)).collect())
    }

    async fn make_dir(&self, folder: &ObjectDescriptor) -> Result<()> {
        if self.exists(folder).await? {
            return Err(Error::AlreadyExists(folder.full_name()));
        }
        self.bucket.put(&folder.path, Bytes::new()).await
    }

    async fn move_object(
        &self,
        source: &ObjectDescriptor,
        target: &ObjectDescriptor,
    ) -> Result<()> {
        if source.is_folder || target.is_folder {
            return Err(Error::Unsupported(
                "only file records can be moved".to_string(),
            ));
        }
        if !self.bucket.exists(&source.full_name()).await? {
            return Err(Error::NotFound(source.full_name()));
        }
        if self.bucket.exists(&target.full_name()).await? {
            return Err(Error::AlreadyExists(target.full_name()));
        }

        self.bucket
            .copy(&source.full_name(), &target.full_name())
            .await?;
        self.bucket.delete(&source.full_name()).await
    }

    async fn put_metadata(
        &self,
        metadata: &ObjectMetadata,
        target: &ObjectDescriptor,
    ) -> Result<()> {
        if target.is_folder {
            return Err(Error::InvalidInput(format!(
                "cannot write metadata to folder '{}'",
                target.full_name()
            )));
        }
        self.bucket
            .put(&target.full_name(), Bytes::from(metadata.to_json()?))
            .await
    }

    async fn get_metadata(&self, target: &ObjectDescriptor) -> Result<ObjectMetadata> {
        if target.is_folder {
            return Err(Error::NotFound(target.full_name()));
        }
        let body = self
            .bucket
            .get(&target.full_name())
            .await?
            .ok_or_else(|| Error::NotFound(target.full_name()))?;
        let text = std::str::from_utf8(&body).map_err(|e| Error::Serialization(e.to_string()))?;
        ObjectMetadata::from_json(text)
    }

    async fn del_metadata(&self, target: &ObjectDescriptor) -> Result<()> {
        self.bucket.delete(&target.full_name()).await
    }
}

/// In-memory bucket emulating prefix/delimiter listing.
#[derive(Default)]
pub struct MemoryBucket {
    name: String,
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    fn poisoned() -> Error {
        Error::Backend("memory bucket lock poisoned".to_string())
    }
}

#[async_trait]
impl ObjectBucket for MemoryBucket {
    fn bucket(&self) -> &str {
        &self.name
    }

    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        let mut listing = Listing::default();
        let mut prefixes = BTreeSet::new();

        for key in objects.keys().filter(|k| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d)) {
                Some(idx) => {
                    prefixes.insert(format!("{}{}", prefix, &rest[..=idx]));
                }
                None => listing.keys.push(key.clone()),
            }
        }

        listing.common_prefixes = prefixes.into_iter().collect();
        Ok(listing)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects.get(key).cloned())
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        let body = objects
            .get(from)
            .cloned()
            .ok_or_else(|| Error::NotFound(from.to_string()))?;
        objects.insert(to.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn store() -> ObjectStorageStore<MemoryBucket> {
        ObjectStorageStore::new(MemoryBucket::new("ionfs-metadata"))
    }

    fn metadata() -> ObjectMetadata {
        ObjectMetadata {
            id: vec![Uuid::new_v4()],
            name: "f".to_string(),
            chunk_count: 1,
            max_size: 10,
            size: 1,
            hash: "h".to_string(),
            iv: None,
            is_manifest: true,
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_memory_bucket_delimiter_listing() {
        let bucket = MemoryBucket::new("b");
        for key in ["a/", "a/x", "a/b/y", "a/c/", "z"] {
            bucket.put(key, Bytes::new()).await.unwrap();
        }

        let listing = bucket.list("a/", Some('/')).await.unwrap();
        assert_eq!(listing.keys, vec!["a/", "a/x"]);
        assert_eq!(listing.common_prefixes, vec!["a/b/", "a/c/"]);

        let all = bucket.list("", None).await.unwrap();
        assert_eq!(all.keys.len(), 5);
    }

    #[tokio::test]
    async fn test_object_store_folders_and_files() {
        let store = store();
        let folder = ObjectDescriptor::folder(None, "docs/");
        store.make_dir(&folder).await.unwrap();
        assert!(matches!(store.make_dir(&folder).await, Err(Error::AlreadyExists(_))));

        let file = folder.child_file("f");
        store.put_metadata(&metadata(), &file).await.unwrap();
        store
            .put_metadata(&metadata(), &ObjectDescriptor::file(None, "docs/deep/", "g"))
            .await
            .unwrap();

        let entries: Vec<String> = store
            .list(&folder, false)
            .await
            .unwrap()
            .iter()
            .map(|d| d.full_name())
            .collect();
        assert_eq!(entries, vec!["docs/deep/", "docs/f"]);

        let root: Vec<String> = store
            .list(&ObjectDescriptor::root(), false)
            .await
            .unwrap()
            .iter()
            .map(|d| d.full_name())
            .collect();
        assert_eq!(root, vec!["docs/"]);

        let deep = store.list(&folder, true).await.unwrap();
        assert_eq!(deep.len(), 3);
        assert!(store.exists(&ObjectDescriptor::folder(None, "docs/deep/")).await.unwrap());
    }

    #[tokio::test]
    async fn test_object_store_round_trip_and_move() {
        let store = store();
        let source = ObjectDescriptor::file(None, "", "a");
        let target = ObjectDescriptor::file(None, "", "b");
        let meta = metadata();

        store.put_metadata(&meta, &source).await.unwrap();
        assert_eq!(store.get_metadata(&source).await.unwrap(), meta);

        store.move_object(&source, &target).await.unwrap();
        assert!(!store.exists(&source).await.unwrap());
        assert_eq!(store.get_metadata(&target).await.unwrap(), meta);

        store.del_metadata(&target).await.unwrap();
        store.del_metadata(&target).await.unwrap();
        assert!(matches!(store.get_metadata(&target).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_object_store_search_unsupported() {
        let store = store();
        assert!(!store.supports_search());
        let result = store.search(&ObjectDescriptor::root(), None, None, true).await;
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }
}
