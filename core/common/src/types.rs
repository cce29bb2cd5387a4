//! Common types used throughout IonFS.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Scheme prefix of every remote address.
pub const SCHEME: &str = "ion://";

/// Segment delimiter of virtual paths.
pub const DELIMITER: char = '/';

/// Which blob-store API surface a repository routes its particles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Usage {
    #[default]
    Data,
    Secrets,
}

impl FromStr for Usage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "data" => Ok(Usage::Data),
            "secret" | "secrets" => Ok(Usage::Secrets),
            other => Err(Error::InvalidInput(format!("unknown usage '{}'", other))),
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Usage::Data => write!(f, "Data"),
            Usage::Secrets => write!(f, "Secrets"),
        }
    }
}

/// The resolved identity of a filesystem entry.
///
/// `path` is a delimiter-terminated string such as `"a/b/"` (empty for the
/// root), `name` is the leaf name and is empty for folders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub repository: Option<String>,
    pub path: String,
    pub name: String,
    pub is_folder: bool,
    pub is_root: bool,
    pub is_remote: bool,
    pub is_secret: bool,
}

impl ObjectDescriptor {
    /// The canonical remote root.
    pub fn root() -> Self {
        Self {
            is_folder: true,
            is_root: true,
            is_remote: true,
            ..Default::default()
        }
    }

    /// A remote folder at `path`.
    ///
    /// # Preconditions
    /// - `path` is empty or ends with the delimiter
    pub fn folder(repository: Option<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            repository,
            is_root: path.is_empty(),
            path,
            is_folder: true,
            is_remote: true,
            ..Default::default()
        }
    }

    /// A remote file `name` inside folder `path`.
    pub fn file(
        repository: Option<String>,
        path: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            path: path.into(),
            name: name.into(),
            is_remote: true,
            ..Default::default()
        }
    }

    /// A local filesystem entry.
    pub fn local(path: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: path.into(),
            is_folder: name.is_empty(),
            name,
            ..Default::default()
        }
    }

    pub fn has_repository(&self) -> bool {
        self.repository.is_some()
    }

    /// Repository name, empty when none is attached.
    pub fn repository_name(&self) -> &str {
        self.repository.as_deref().unwrap_or_default()
    }

    /// Path plus leaf name, without scheme or repository.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.path, self.name)
    }

    /// Full remote address including scheme and repository.
    pub fn full_address(&self) -> String {
        match &self.repository {
            Some(repo) => format!("{}{}{}{}{}", SCHEME, repo, DELIMITER, self.path, self.name),
            None => format!("{}{}{}", SCHEME, self.path, self.name),
        }
    }

    /// The folder containing this entry.
    ///
    /// For a folder this is its parent; the root is its own parent.
    pub fn parent(&self) -> Self {
        let mut folder = if self.is_folder {
            let trimmed = self.path.trim_end_matches(DELIMITER);
            let parent = match trimmed.rfind(DELIMITER) {
                Some(idx) => &trimmed[..=idx],
                None => "",
            };
            Self::folder(self.repository.clone(), parent)
        } else {
            Self::folder(self.repository.clone(), self.path.clone())
        };
        folder.is_remote = self.is_remote;
        folder.is_secret = self.is_secret;
        folder
    }

    /// A file named `name` in this folder.
    pub fn child_file(&self, name: impl Into<String>) -> Self {
        let mut file = Self::file(self.repository.clone(), self.path.clone(), name);
        file.is_remote = self.is_remote;
        file.is_secret = self.is_secret;
        file
    }

    /// Last folder segment, or the leaf name for files.
    pub fn display_name(&self) -> &str {
        if self.is_folder {
            let trimmed = self.path.trim_end_matches(DELIMITER);
            match trimmed.rfind(DELIMITER) {
                Some(idx) => &trimmed[idx + 1..],
                None => trimmed,
            }
        } else {
            &self.name
        }
    }
}

impl PartialEq for ObjectDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.name == other.name && self.is_folder == other.is_folder
    }
}

impl Eq for ObjectDescriptor {}

impl Hash for ObjectDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.name.hash(state);
        self.is_folder.hash(state);
    }
}

impl Ord for ObjectDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full_name()
            .cmp(&other.full_name())
            .then_with(|| other.is_folder.cmp(&self.is_folder))
    }
}

impl PartialOrd for ObjectDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_remote {
            write!(f, "{}", self.full_address())
        } else {
            write!(f, "{}", self.full_name())
        }
    }
}

/// A user-defined name/value pair attached to an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse `tag=value[:tag=value]...`.
    ///
    /// # Errors
    /// - Returns `InvalidInput` if a pair has no `=` or an empty tag name
    pub fn parse_list(raw: &str) -> Result<Vec<Tag>> {
        raw.split(':')
            .filter(|pair| !pair.trim().is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((name, value)) if !name.trim().is_empty() => {
                    Ok(Tag::new(name.trim(), value.trim()))
                }
                _ => Err(Error::InvalidInput(format!(
                    "tag '{}' must have the form tag=value",
                    pair
                ))),
            })
            .collect()
    }
}

/// Persisted record describing one uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectMetadata {
    /// Particle identifiers in reassembly order.
    pub id: Vec<Uuid>,
    pub name: String,
    pub chunk_count: usize,
    pub max_size: usize,
    /// Plaintext size in bytes.
    pub size: u64,
    /// Base64 SHA-256 of the plaintext.
    pub hash: String,
    /// Base64 IV, present iff the payload is encrypted.
    #[serde(rename = "IV", default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default)]
    pub is_manifest: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl ObjectMetadata {
    pub fn is_encrypted(&self) -> bool {
        self.iv.is_some()
    }

    /// Serialize to the JSON text stored by the metadata backends.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// A tag match produced by backends that support search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub name: String,
    pub tag: String,
    pub value: String,
    pub descriptor: ObjectDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> ObjectMetadata {
        ObjectMetadata {
            id: vec![Uuid::new_v4(), Uuid::new_v4()],
            name: "a.bin".to_string(),
            chunk_count: 2,
            max_size: 1024,
            size: 1500,
            hash: "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=".to_string(),
            iv: None,
            is_manifest: false,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_root_descriptor() {
        let root = ObjectDescriptor::root();
        assert!(root.is_root);
        assert!(root.is_folder);
        assert_eq!(root.full_name(), "");
        assert_eq!(root.full_address(), "ion://");
    }

    #[test]
    fn test_full_address_with_repository() {
        let file = ObjectDescriptor::file(Some("repo".to_string()), "a/b/", "c.txt");
        assert_eq!(file.full_name(), "a/b/c.txt");
        assert_eq!(file.full_address(), "ion://repo/a/b/c.txt");
    }

    #[test]
    fn test_equality_ignores_repository() {
        let a = ObjectDescriptor::file(Some("one".to_string()), "x/", "f");
        let b = ObjectDescriptor::file(Some("two".to_string()), "x/", "f");
        assert_eq!(a, b);

        let folder = ObjectDescriptor::folder(None, "x/f/");
        assert_ne!(a, folder);
    }

    #[test]
    fn test_sort_by_full_name() {
        let mut entries = vec![
            ObjectDescriptor::file(None, "", "b"),
            ObjectDescriptor::file(None, "", "a"),
            ObjectDescriptor::folder(None, "a/"),
        ];
        entries.sort();
        assert_eq!(entries[0].full_name(), "a");
        assert_eq!(entries[1].full_name(), "a/");
        assert_eq!(entries[2].full_name(), "b");
    }

    #[test]
    fn test_parent() {
        let folder = ObjectDescriptor::folder(None, "a/b/");
        assert_eq!(folder.parent().path, "a/");
        assert_eq!(folder.parent().parent().path, "");
        assert!(folder.parent().parent().is_root);

        let file = ObjectDescriptor::file(None, "a/", "f");
        assert_eq!(file.parent().path, "a/");
        assert_eq!(folder.display_name(), "b");
    }

    #[test]
    fn test_metadata_serialization_shape() {
        let mut meta = sample_metadata();
        let json = meta.to_json().unwrap();
        assert!(json.contains("\"ChunkCount\""));
        assert!(json.contains("\"IsManifest\""));
        assert!(!json.contains("\"IV\""));
        assert!(!json.contains("\"Tags\""));

        meta.iv = Some("AAAAAAAAAAAAAAAAAAAAAA==".to_string());
        let json = meta.to_json().unwrap();
        assert!(json.contains("\"IV\""));
        let back = ObjectMetadata::from_json(&json).unwrap();
        assert_eq!(back, meta);
        assert!(back.is_encrypted());
    }

    #[test]
    fn test_metadata_accepts_null_iv_and_missing_flags() {
        let json = r#"{"Id":[],"Name":"n","ChunkCount":0,"MaxSize":10,"Size":0,"Hash":"","IV":null}"#;
        let meta = ObjectMetadata::from_json(json).unwrap();
        assert!(!meta.is_encrypted());
        assert!(!meta.is_manifest);
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn test_parse_tags() {
        let tags = Tag::parse_list("owner=ops:env=prod").unwrap();
        assert_eq!(tags, vec![Tag::new("owner", "ops"), Tag::new("env", "prod")]);
        assert!(Tag::parse_list("novalue").is_err());
        assert!(Tag::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_usage_parse() {
        assert_eq!("Secrets".parse::<Usage>().unwrap(), Usage::Secrets);
        assert_eq!("data".parse::<Usage>().unwrap(), Usage::Data);
        assert!("other".parse::<Usage>().is_err());
    }
}
