//! Metadata store trait definition.

use async_trait::async_trait;

use ionfs_common::{
    Error, ObjectDescriptor, ObjectMetadata, Result, SearchResult, DELIMITER,
};

/// Metadata store trait for the different backends.
///
/// Descriptors handed to a store are already bound to its repository; the
/// store only looks at `path`, `name` and the folder flag. Descriptors it
/// returns carry no repository, the caller tags them.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Backend class name (e.g. "localfs", "document", "s3").
    fn name(&self) -> &str;

    /// Backend locator this store was opened on (directory, database, bucket).
    fn data_store(&self) -> &str;

    /// Check whether a file record or folder exists.
    ///
    /// # Postconditions
    /// - Always true for the root folder
    async fn exists(&self, target: &ObjectDescriptor) -> Result<bool>;

    /// List entries of a folder.
    ///
    /// Returns direct children, or the whole subtree when `recursive` is set.
    /// Ordering is unspecified.
    ///
    /// # Errors
    /// - Folder not found (backends with real directories)
    async fn list(&self, folder: &ObjectDescriptor, recursive: bool)
        -> Result<Vec<ObjectDescriptor>>;

    /// Check whether a folder has no entries.
    async fn is_empty(&self, folder: &ObjectDescriptor) -> Result<bool> {
        Ok(self.list(folder, false).await?.is_empty())
    }

    /// Create a folder.
    ///
    /// # Errors
    /// - `AlreadyExists` if the folder exists
    async fn make_dir(&self, folder: &ObjectDescriptor) -> Result<()>;

    /// Move a file record within this store.
    ///
    /// # Preconditions
    /// - `target` names a file; the caller fills in the name when the user
    ///   gave a folder
    ///
    /// # Errors
    /// - `NotFound` if the source does not exist
    /// - `AlreadyExists` if the target exists
    async fn move_object(&self, source: &ObjectDescriptor, target: &ObjectDescriptor)
        -> Result<()>;

    /// Write the record for `target`, replacing any existing one.
    async fn put_metadata(&self, metadata: &ObjectMetadata, target: &ObjectDescriptor)
        -> Result<()>;

    /// Read the record for a file.
    ///
    /// # Errors
    /// - `NotFound` if no record matches; folders never have one
    async fn get_metadata(&self, target: &ObjectDescriptor) -> Result<ObjectMetadata>;

    /// Delete a file record or an empty folder.
    async fn del_metadata(&self, target: &ObjectDescriptor) -> Result<()>;

    /// Whether `search` is implemented.
    fn supports_search(&self) -> bool {
        false
    }

    /// Find files whose tags match the given patterns.
    ///
    /// Patterns are regular expressions matched against the whole tag name
    /// and value; `None` matches anything.
    async fn search(
        &self,
        _folder: &ObjectDescriptor,
        _tag: Option<&str>,
        _value: Option<&str>,
        _recursive: bool,
    ) -> Result<Vec<SearchResult>> {
        Err(Error::Unsupported(format!(
            "search is not supported by the {} metadata store",
            self.name()
        )))
    }
}

/// Build a remote descriptor from a store key such as `a/b/` or `a/b/c`.
pub fn descriptor_from_key(key: &str) -> ObjectDescriptor {
    if key.is_empty() || key.ends_with(DELIMITER) {
        return ObjectDescriptor::folder(None, key);
    }
    match key.rfind(DELIMITER) {
        Some(idx) => ObjectDescriptor::file(None, &key[..=idx], &key[idx + 1..]),
        None => ObjectDescriptor::file(None, "", key),
    }
}

/// True if `key` sits directly inside the folder at `folder_path`.
pub fn is_direct_child(folder_path: &str, key: &str) -> bool {
    match key.strip_prefix(folder_path) {
        Some(rest) if !rest.is_empty() => !rest
            .trim_end_matches(DELIMITER)
            .contains(DELIMITER),
        _ => false,
    }
}

/// Every folder path implied by `key`, outermost first, excluding the root.
///
/// `a/b/c` yields `a/` and `a/b/`.
pub fn ancestor_folders(key: &str) -> Vec<String> {
    key.char_indices()
        .filter(|(_, c)| *c == DELIMITER)
        .map(|(idx, _)| key[..=idx].to_string())
        .filter(|folder| folder != key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_key() {
        let file = descriptor_from_key("a/b/c.txt");
        assert_eq!(file.path, "a/b/");
        assert_eq!(file.name, "c.txt");
        assert!(!file.is_folder);
        assert!(file.is_remote);

        let folder = descriptor_from_key("a/b/");
        assert!(folder.is_folder);
        assert_eq!(folder.path, "a/b/");

        let top = descriptor_from_key("top");
        assert_eq!(top.path, "");
        assert_eq!(top.name, "top");
    }

    #[test]
    fn test_is_direct_child() {
        assert!(is_direct_child("", "a"));
        assert!(is_direct_child("", "a/"));
        assert!(!is_direct_child("", "a/b"));
        assert!(is_direct_child("a/", "a/b"));
        assert!(is_direct_child("a/", "a/b/"));
        assert!(!is_direct_child("a/", "a/"));
        assert!(!is_direct_child("a/", "a/b/c"));
        assert!(!is_direct_child("a/", "ab/c"));
    }

    #[test]
    fn test_ancestor_folders() {
        assert_eq!(ancestor_folders("a/b/c"), vec!["a/", "a/b/"]);
        assert_eq!(ancestor_folders("a/b/"), vec!["a/"]);
        assert!(ancestor_folders("c").is_empty());
    }
}
