//! Address resolution.
//!
//! Remote addresses look like `ion://[repository/]a/b/[name]`. A trailing
//! delimiter denotes a folder. Anything without the scheme is a local path.

use ionfs_common::{Error, ObjectDescriptor, Result, DELIMITER, SCHEME};

use crate::repository::RepositoryRegistry;

/// Parses address strings into descriptors.
///
/// The first path segment is taken as the repository only when the registry
/// knows that name; otherwise it stays part of the path and no repository is
/// attached.
pub struct AddressResolver<'a> {
    repositories: &'a RepositoryRegistry,
}

impl<'a> AddressResolver<'a> {
    pub fn new(repositories: &'a RepositoryRegistry) -> Self {
        Self { repositories }
    }

    /// Resolve a remote folder.
    ///
    /// With `auto_suffix` a missing trailing delimiter is appended. An empty
    /// string or the bare scheme is the root.
    ///
    /// # Errors
    /// - `InvalidAddress` if the scheme prefix is missing or a segment is `.`
    ///   or `..`
    /// - `InvalidInput` if the address does not end with the delimiter
    pub fn resolve_folder(&self, raw: &str, auto_suffix: bool) -> Result<ObjectDescriptor> {
        if raw.is_empty() || raw == SCHEME {
            return Ok(ObjectDescriptor::root());
        }

        let mut normalized = raw.to_string();
        if auto_suffix && !normalized.ends_with(DELIMITER) {
            normalized.push(DELIMITER);
        }

        let rest = normalized
            .strip_prefix(SCHEME)
            .ok_or_else(|| Error::InvalidAddress {
                address: raw.to_string(),
                prefix: SCHEME,
            })?;
        if !rest.is_empty() && !rest.ends_with(DELIMITER) {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a folder address",
                raw
            )));
        }
        let rest = rest.trim_start_matches(DELIMITER);
        Self::check_segments(raw, rest)?;

        if let Some((first, remainder)) = rest.split_once(DELIMITER) {
            if self.repositories.contains(first) {
                return Ok(ObjectDescriptor::folder(Some(first.to_string()), remainder));
            }
        }
        Ok(ObjectDescriptor::folder(None, rest))
    }

    /// Resolve a remote file.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty string or an address with no file name
    /// - `InvalidAddress` if the scheme prefix is missing or a segment is `.`
    ///   or `..`
    pub fn resolve_file(&self, raw: &str) -> Result<ObjectDescriptor> {
        if raw.is_empty() {
            return Err(Error::InvalidInput("file address cannot be empty".to_string()));
        }
        if !raw.starts_with(SCHEME) {
            return Err(Error::InvalidAddress {
                address: raw.to_string(),
                prefix: SCHEME,
            });
        }

        let split = raw.rfind(DELIMITER).map_or(0, |idx| idx + 1);
        let (folder, name) = raw.split_at(split);
        if name.is_empty() {
            return Err(Error::InvalidInput(format!("'{}' does not name a file", raw)));
        }
        Self::check_segments(raw, name)?;

        Ok(self.resolve_folder(folder, false)?.child_file(name))
    }

    /// Remote paths are virtual, so `.` and `..` have no meaning in them.
    fn check_segments(raw: &str, path: &str) -> Result<()> {
        if path.split(DELIMITER).any(|s| s == "." || s == "..") {
            return Err(Error::InvalidAddress {
                address: raw.to_string(),
                prefix: SCHEME,
            });
        }
        Ok(())
    }

    /// Resolve either a remote address or a local path.
    pub fn resolve_any(&self, raw: &str) -> Result<ObjectDescriptor> {
        if raw.starts_with(SCHEME) {
            if raw.ends_with(DELIMITER) {
                self.resolve_folder(raw, false)
            } else {
                self.resolve_file(raw)
            }
        } else {
            Ok(self.resolve_local(raw))
        }
    }

    /// Resolve a local path.
    ///
    /// The descriptor's `path` keeps everything up to the last delimiter, so
    /// `full_name()` is the original path.
    pub fn resolve_local(&self, raw: &str) -> ObjectDescriptor {
        match raw.rfind(DELIMITER) {
            Some(idx) => ObjectDescriptor::local(&raw[..=idx], &raw[idx + 1..]),
            None => ObjectDescriptor::local("", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use ionfs_common::Usage;
    use ionfs_metadata::{DocumentStore, MemoryCollection};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn registry() -> RepositoryRegistry {
        let repo = |name: &str| {
            Repository::new(
                name,
                Usage::Data,
                Arc::new(DocumentStore::new(MemoryCollection::new(), "memory", name)),
            )
        };
        RepositoryRegistry::new(vec![repo("repo"), repo("other")], None).unwrap()
    }

    #[test]
    fn test_root() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);
        for raw in ["", "ion://"] {
            let root = resolver.resolve_folder(raw, true).unwrap();
            assert!(root.is_root);
            assert!(root.is_folder);
            assert!(root.is_remote);
            assert!(root.path.is_empty());
            assert!(root.name.is_empty());
        }
    }

    #[test]
    fn test_folder_with_repository() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);

        let folder = resolver.resolve_folder("ion://repo/a/b", true).unwrap();
        assert_eq!(folder.repository.as_deref(), Some("repo"));
        assert_eq!(folder.path, "a/b/");
        assert!(folder.is_folder);
        assert!(!folder.is_root);

        let repo_root = resolver.resolve_folder("ion://repo/", false).unwrap();
        assert_eq!(repo_root.repository.as_deref(), Some("repo"));
        assert!(repo_root.is_root);
    }

    #[test]
    fn test_folder_without_repository() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);

        let folder = resolver.resolve_folder("ion://unknown/a/", false).unwrap();
        assert!(folder.repository.is_none());
        assert_eq!(folder.path, "unknown/a/");
    }

    #[test]
    fn test_missing_scheme() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);

        match resolver.resolve_folder("repo/a/", true) {
            Err(Error::InvalidAddress { address, prefix }) => {
                assert_eq!(address, "repo/a/");
                assert_eq!(prefix, SCHEME);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            resolver.resolve_file("repo/a.txt"),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_folder_without_suffix_rejected() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);
        assert!(matches!(
            resolver.resolve_folder("ion://repo/a", false),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_relative_segments_rejected() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);

        for raw in ["ion://repo/../x", "ion://repo/a/./x", "ion://..", "ion://repo/a/.."] {
            assert!(
                matches!(resolver.resolve_file(raw), Err(Error::InvalidAddress { .. })),
                "{} accepted",
                raw
            );
        }
        assert!(matches!(
            resolver.resolve_folder("ion://repo/../", false),
            Err(Error::InvalidAddress { .. })
        ));
        assert!(matches!(
            resolver.resolve_any("ion://../etc/"),
            Err(Error::InvalidAddress { .. })
        ));

        let dotted = resolver.resolve_file("ion://repo/a/.hidden").unwrap();
        assert_eq!(dotted.name, ".hidden");
    }

    #[test]
    fn test_file() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);

        let file = resolver.resolve_file("ion://repo/a/b/c.txt").unwrap();
        assert_eq!(file.repository.as_deref(), Some("repo"));
        assert_eq!(file.path, "a/b/");
        assert_eq!(file.name, "c.txt");
        assert!(!file.is_folder);
        assert!(file.is_remote);

        let top = resolver.resolve_file("ion://c.txt").unwrap();
        assert!(top.repository.is_none());
        assert_eq!(top.path, "");
        assert_eq!(top.name, "c.txt");

        assert!(matches!(resolver.resolve_file(""), Err(Error::InvalidInput(_))));
        assert!(matches!(
            resolver.resolve_file("ion://repo/a/"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_any_and_local() {
        let registry = registry();
        let resolver = AddressResolver::new(&registry);

        let folder = resolver.resolve_any("ion://repo/a/").unwrap();
        assert!(folder.is_folder && folder.is_remote);

        let file = resolver.resolve_any("ion://repo/a/x").unwrap();
        assert!(!file.is_folder && file.is_remote);

        let local = resolver.resolve_any("/tmp/data/x.bin").unwrap();
        assert!(!local.is_remote);
        assert_eq!(local.path, "/tmp/data/");
        assert_eq!(local.name, "x.bin");
        assert_eq!(local.full_name(), "/tmp/data/x.bin");

        let bare = resolver.resolve_local("x.bin");
        assert_eq!(bare.path, "");
        assert_eq!(bare.full_name(), "x.bin");

        let dir = resolver.resolve_local("out/");
        assert!(dir.is_folder);
    }

    proptest! {
        #[test]
        fn prop_folder_then_file_round_trip(
            with_repo in any::<bool>(),
            segments in proptest::collection::vec("[a-z0-9]{1,8}", 0..4),
            name in "[a-z0-9._-]{1,12}",
        ) {
            prop_assume!(name != "." && name != "..");
            let registry = registry();
            let resolver = AddressResolver::new(&registry);

            let mut raw = SCHEME.to_string();
            if with_repo {
                raw.push_str("repo/");
            }
            for segment in &segments {
                raw.push_str(segment);
                raw.push(DELIMITER);
            }

            let folder = resolver.resolve_folder(&raw, true).unwrap();
            let file = resolver
                .resolve_file(&format!("{}{}", folder.full_address(), name))
                .unwrap();

            prop_assert_eq!(&file.path, &folder.path);
            prop_assert_eq!(&file.name, &name);
            prop_assert_eq!(&file.repository, &folder.repository);
        }
    }
}
