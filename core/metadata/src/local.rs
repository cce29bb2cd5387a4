//! Local filesystem metadata store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use ionfs_common::{
    Error, ObjectDescriptor, ObjectMetadata, Result, SearchResult, DELIMITER,
};

use crate::search::{search_by_metadata, TagMatcher};
use crate::store::MetadataStore;

/// Local filesystem metadata store.
///
/// Folders are directories under the root and each object's metadata is one
/// JSON file at `<root>/<path><name>`.
pub struct LocalFsStore {
    root: PathBuf,
    data_store: String,
}

impl LocalFsStore {
    /// Open a store rooted at `root`.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self {
            data_store: root.display().to_string(),
            root,
        })
    }

    /// Map a descriptor to its path under the root.
    ///
    /// # Errors
    /// - `InvalidInput` for `.` or `..` segments, which would leave the root
    fn to_fs_path(&self, target: &ObjectDescriptor) -> Result<PathBuf> {
        let mut fs_path = self.root.clone();
        for segment in target.full_name().split(DELIMITER).filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(Error::InvalidInput(format!(
                    "'{}' contains a relative path segment",
                    target.full_name()
                )));
            }
            fs_path.push(segment);
        }
        Ok(fs_path)
    }

    fn not_found(target: &ObjectDescriptor, e: std::io::Error) -> Error {
        if e.kind() == ErrorKind::NotFound {
            Error::NotFound(target.full_name())
        } else {
            Error::Io(e)
        }
    }

    async fn is_dir(path: &Path) -> bool {
        fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
    }

    async fn is_file(path: &Path) -> bool {
        fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
    }
}

#[async_trait]
impl MetadataStore for LocalFsStore {
    fn name(&self) -> &str {
        "localfs"
    }

    fn data_store(&self) -> &str {
        &self.data_store
    }

    async fn exists(&self, target: &ObjectDescriptor) -> Result<bool> {
        if target.is_root {
            return Ok(true);
        }
        let fs_path = self.to_fs_path(target)?;
        if target.is_folder {
            Ok(Self::is_dir(&fs_path).await)
        } else {
            Ok(Self::is_file(&fs_path).await)
        }
    }

    async fn list(
        &self,
        folder: &ObjectDescriptor,
        recursive: bool,
    ) -> Result<Vec<ObjectDescriptor>> {
        let dir = self.to_fs_path(folder)?;
        if !Self::is_dir(&dir).await {
            return Err(Error::NotFound(folder.full_name()));
        }

        let mut items = Vec::new();
        let mut pending = vec![(dir, folder.path.clone())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                if entry.file_type().await?.is_dir() {
                    let path = format!("{}{}{}", prefix, name, DELIMITER);
                    items.push(ObjectDescriptor::folder(None, path.clone()));
                    if recursive {
                        pending.push((entry.path(), path));
                    }
                } else {
                    items.push(ObjectDescriptor::file(None, prefix.clone(), name));
                }
            }
        }

        debug!(folder = %folder.full_name(), count = items.len(), "Listed local metadata");
        Ok(items)
    }

    async fn make_dir(&self, folder: &ObjectDescriptor) -> Result<()> {
        if self.exists(folder).await? {
            return Err(Error::AlreadyExists(folder.full_name()));
        }
        fs::create_dir_all(self.to_fs_path(folder)?).await?;
        Ok(())
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
        if !self.exists(source).await? {
            return Err(Error::NotFound(source.full_name()));
        }
        if self.exists(target).await? {
            return Err(Error::AlreadyExists(target.full_name()));
        }

        let to = self.to_fs_path(target)?;
        if let Some(parent) = to.parent() {
            if !Self::is_dir(parent).await {
                return Err(Error::NotFound(target.parent().full_name()));
            }
        }

        fs::rename(self.to_fs_path(source)?, to).await?;
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

        let fs_path = self.to_fs_path(target)?;

        // Check parent exists
        if let Some(parent) = fs_path.parent() {
            if !Self::is_dir(parent).await {
                return Err(Error::NotFound(target.parent().full_name()));
            }
        }

        fs::write(&fs_path, metadata.to_json()?).await?;
        debug!(object = %target.full_name(), "Wrote local metadata");
        Ok(())
    }

    async fn get_metadata(&self, target: &ObjectDescriptor) -> Result<ObjectMetadata> {
        if target.is_folder {
            return Err(Error::NotFound(target.full_name()));
        }
        let text = fs::read_to_string(self.to_fs_path(target)?)
            .await
            .map_err(|e| Self::not_found(target, e))?;
        ObjectMetadata::from_json(&text)
    }

    async fn del_metadata(&self, target: &ObjectDescriptor) -> Result<()> {
        if target.is_root {
            return Err(Error::InvalidInput("cannot remove the root folder".to_string()));
        }
        let fs_path = self.to_fs_path(target)?;
        let removed = if target.is_folder {
            fs::remove_dir(&fs_path).await
        } else {
            fs::remove_file(&fs_path).await
        };
        removed.map_err(|e| Self::not_found(target, e))
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
