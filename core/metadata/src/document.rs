//! Document-database metadata store.
//!
//! One document per object keyed by its full path, with the metadata record
//! embedded as JSON text. Folder markers are documents keyed by the folder
//! path (trailing delimiter) without metadata. Folders implied by deeper keys
//! are listed even when no marker exists.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ionfs_common::{
    Error, ObjectDescriptor, ObjectMetadata, Result, SearchResult, DELIMITER,
};

use crate::search::{search_by_metadata, TagMatcher};
use crate::store::{ancestor_folders, descriptor_from_key, is_direct_child, MetadataStore};

/// A stored metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: String,
    /// Metadata record as JSON text, absent for folder markers.
    pub metadata: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl Document {
    pub fn new(key: impl Into<String>, metadata: Option<String>) -> Self {
        Self {
            key: key.into(),
            metadata,
            last_modified: Utc::now(),
        }
    }
}

/// A keyed collection of documents.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Document with exactly this key.
    async fn find_one(&self, key: &str) -> Result<Option<Document>>;

    /// Every document whose key starts with `prefix`.
    async fn find_prefix(&self, prefix: &str) -> Result<Vec<Document>>;

    /// Insert or replace the document with the same key.
    async fn upsert(&self, document: Document) -> Result<()>;

    /// Remove a document, returning whether it existed.
    async fn delete_one(&self, key: &str) -> Result<bool>;
}

/// Metadata store over any document collection.
pub struct DocumentStore<C> {
    collection: C,
    class: String,
    data_store: String,
}

impl<C: DocumentCollection> DocumentStore<C> {
    pub fn new(collection: C, class: impl Into<String>, data_store: impl Into<String>) -> Self {
        Self {
            collection,
            class: class.into(),
            data_store: data_store.into(),
        }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    async fn folder_exists(&self, folder: &ObjectDescriptor) -> Result<bool> {
        if folder.is_root {
            return Ok(true);
        }
        if self.collection.find_one(&folder.path).await?.is_some() {
            return Ok(true);
        }
        Ok(!self.collection.find_prefix(&folder.path).await?.is_empty())
    }
}

#[async_trait]
impl<C: DocumentCollection> MetadataStore for DocumentStore<C> {
    fn name(&self) -> &str {
        &self.class
    }

    fn data_store(&self) -> &str {
        &self.data_store
    }

    async fn exists(&self, target: &ObjectDescriptor) -> Result<bool> {
        if target.is_folder {
            return self.folder_exists(target).await;
        }
        Ok(self
            .collection
            .find_one(&target.full_name())
            .await?
            .is_some_and(|doc| doc.metadata.is_some()))
    }

    async fn list(
        &self,
        folder: &ObjectDescriptor,
        recursive: bool,
    ) -> Result<Vec<ObjectDescriptor>> {
        let prefix = folder.path.as_str();
        let mut keys = BTreeSet::new();

        for doc in self.collection.find_prefix(prefix).await? {
            if doc.key == prefix {
                continue;
            }
            if recursive {
                keys.extend(
                    ancestor_folders(&doc.key)
                        .into_iter()
                        .filter(|f| f.len() > prefix.len()),
                );
                keys.insert(doc.key);
            } else if is_direct_child(prefix, &doc.key) {
                keys.insert(doc.key);
            } else if let Some(rest) = doc.key.strip_prefix(prefix) {
                if let Some(idx) = rest.find(DELIMITER) {
                    keys.insert(format!("{}{}", prefix, &rest[..=idx]));
                }
            }
        }

        Ok(keys.iter().map(|k| descriptor_from_key(k)).collect())
    }

    async fn make_dir(&self, folder: &ObjectDescriptor) -> Result<()> {
        if self.folder_exists(folder).await? {
            return Err(Error::AlreadyExists(folder.full_name()));
        }
        self.collection
            .upsert(Document::new(folder.path.clone(), None))
            .await
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
        let doc = self
            .collection
            .find_one(&source.full_name())
            .await?
            .ok_or_else(|| Error::NotFound(source.full_name()))?;
        if self.exists(target).await? {
            return Err(Error::AlreadyExists(target.full_name()));
        }

        self.collection
            .upsert(Document::new(target.full_name(), doc.metadata))
            .await?;
        self.collection.delete_one(&source.full_name()).await?;
        Ok(())
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
        debug!(key = %target.full_name(), "Upserting metadata document");
        self.collection
            .upsert(Document::new(target.full_name(), Some(metadata.to_json()?)))
            .await
    }

    async fn get_metadata(&self, target: &ObjectDescriptor) -> Result<ObjectMetadata> {
        let doc = self.collection.find_one(&target.full_name()).await?;
        match doc.and_then(|d| d.metadata) {
            Some(text) => ObjectMetadata::from_json(&text),
            None => Err(Error::NotFound(target.full_name())),
        }
    }

    async fn del_metadata(&self, target: &ObjectDescriptor) -> Result<()> {
        let removed = self.collection.delete_one(&target.full_name()).await?;
        if !removed {
            debug!(key = %target.full_name(), "No metadata document to delete");
        }
        Ok(())
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search(
        &self,
        folder: &ObjectDescriptor,
        tag: Option<&str>,
        value: Option<&str>,
        recursive: bool,
    ) -> Result<Vec<SearchResult>> {
        let matcher = TagMatcher::new(tag, value)?;
        search_by_metadata(self, folder, &matcher, recursive).await
    }
}

/// In-memory document collection (for testing and scratch repositories).
#[derive(Default)]
pub struct MemoryCollection {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::Backend("memory collection lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find_one(&self, key: &str) -> Result<Option<Document>> {
        let documents = self.documents.read().map_err(|_| Self::poisoned())?;
        Ok(documents.get(key).cloned())
    }

    async fn find_prefix(&self, prefix: &str) -> Result<Vec<Document>> {
        let documents = self.documents.read().map_err(|_| Self::poisoned())?;
        Ok(documents
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, d)| d.clone())
            .collect())
    }

    async fn upsert(&self, document: Document) -> Result<()> {
        let mut documents = self.documents.write().map_err(|_| Self::poisoned())?;
        documents.insert(document.key.clone(), document);
        Ok(())
    }

    async fn delete_one(&self, key: &str) -> Result<bool> {
        let mut documents = self.documents.write().map_err(|_| Self::poisoned())?;
        Ok(documents.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ionfs_common::Tag;
    use uuid::Uuid;

    fn store() -> DocumentStore<MemoryCollection> {
        DocumentStore::new(MemoryCollection::new(), "memory", "test")
    }

    fn metadata(name: &str, tags: Vec<Tag>) -> ObjectMetadata {
        ObjectMetadata {
            id: vec![Uuid::new_v4()],
            name: name.to_string(),
            chunk_count: 1,
            max_size: 1024,
            size: 3,
            hash: "h".to_string(),
            iv: Some("AAAAAAAAAAAAAAAAAAAAAA==".to_string()),
            is_manifest: false,
            tags,
        }
    }

    #[tokio::test]
    async fn test_document_put_get_round_trip() {
        let store = store();
        let file = ObjectDescriptor::file(None, "a/", "x");
        let meta = metadata("x", Vec::new());

        store.put_metadata(&meta, &file).await.unwrap();
        assert!(store.exists(&file).await.unwrap());
        assert_eq!(store.get_metadata(&file).await.unwrap(), meta);
    }

    #[tokio::test]
    async fn test_document_folder_has_no_metadata() {
        let store = store();
        let folder = ObjectDescriptor::folder(None, "a/");
        store.make_dir(&folder).await.unwrap();

        assert!(store.exists(&folder).await.unwrap());
        assert!(matches!(store.get_metadata(&folder).await, Err(Error::NotFound(_))));
        assert!(matches!(store.make_dir(&folder).await, Err(Error::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_document_list_synthesises_folders() {
        let store = store();
        for key in ["a/b/c", "a/d", "e"] {
            let file = descriptor_from_key(key);
            store.put_metadata(&metadata(&file.name, Vec::new()), &file).await.unwrap();
        }

        let root = store.list(&ObjectDescriptor::root(), false).await.unwrap();
        let names: Vec<String> = root.iter().map(|d| d.full_name()).collect();
        assert_eq!(names, vec!["a/", "e"]);

        let a = ObjectDescriptor::folder(None, "a/");
        let names: Vec<String> = store
            .list(&a, false)
            .await
            .unwrap()
            .iter()
            .map(|d| d.full_name())
            .collect();
        assert_eq!(names, vec!["a/b/", "a/d"]);

        let deep = store.list(&a, true).await.unwrap();
        assert_eq!(deep.len(), 3);
        assert!(store.exists(&ObjectDescriptor::folder(None, "a/b/")).await.unwrap());
    }

    #[tokio::test]
    async fn test_document_delete_is_idempotent() {
        let store = store();
        let file = ObjectDescriptor::file(None, "", "x");
        store.put_metadata(&metadata("x", Vec::new()), &file).await.unwrap();

        store.del_metadata(&file).await.unwrap();
        store.del_metadata(&file).await.unwrap();
        assert!(!store.exists(&file).await.unwrap());
    }

    #[tokio::test]
    async fn test_document_move() {
        let store = store();
        let source = ObjectDescriptor::file(None, "", "x");
        let target = ObjectDescriptor::file(None, "b/", "y");
        let meta = metadata("x", Vec::new());
        store.put_metadata(&meta, &source).await.unwrap();

        store.move_object(&source, &target).await.unwrap();
        assert!(!store.exists(&source).await.unwrap());
        assert_eq!(store.get_metadata(&target).await.unwrap(), meta);

        store.put_metadata(&meta, &source).await.unwrap();
        assert!(matches!(
            store.move_object(&source, &target).await,
            Err(Error::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_document_search() {
        let store = store();
        let file = ObjectDescriptor::file(None, "docs/", "report");
        store
            .put_metadata(&metadata("report", vec![Tag::new("owner", "ops")]), &file)
            .await
            .unwrap();

        let hits = store
            .search(&ObjectDescriptor::root(), Some("owner"), None, true)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, "ops");

        let shallow = store
            .search(&ObjectDescriptor::root(), Some("owner"), None, false)
            .await
            .unwrap();
        assert!(shallow.is_empty());
    }
}
