//! Tag search shared by the backends that can read records back cheaply.

use regex::Regex;

use ionfs_common::{Error, ObjectDescriptor, ObjectMetadata, Result, SearchResult};

use crate::store::MetadataStore;

/// Anchored tag and value patterns.
#[derive(Debug, Clone)]
pub struct TagMatcher {
    tag: Regex,
    value: Regex,
}

impl TagMatcher {
    /// Compile the patterns, `None` meaning `.*`.
    ///
    /// # Errors
    /// - `InvalidInput` if a pattern is not a valid regular expression
    pub fn new(tag: Option<&str>, value: Option<&str>) -> Result<Self> {
        Ok(Self {
            tag: Self::compile(tag)?,
            value: Self::compile(value)?,
        })
    }

    fn compile(pattern: Option<&str>) -> Result<Regex> {
        let pattern = pattern.filter(|p| !p.is_empty()).unwrap_or(".*");
        Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| Error::InvalidInput(format!("invalid pattern '{}': {}", pattern, e)))
    }

    /// Results for every tag of `metadata` that matches.
    pub fn matches(
        &self,
        descriptor: &ObjectDescriptor,
        metadata: &ObjectMetadata,
    ) -> Vec<SearchResult> {
        metadata
            .tags
            .iter()
            .filter(|t| self.tag.is_match(&t.name) && self.value.is_match(&t.value))
            .map(|t| SearchResult {
                name: descriptor.full_name(),
                tag: t.name.clone(),
                value: t.value.clone(),
                descriptor: descriptor.clone(),
            })
            .collect()
    }
}

/// Search by listing a folder and reading each file record.
///
/// Records that vanish between list and read are skipped.
pub async fn search_by_metadata<S>(
    store: &S,
    folder: &ObjectDescriptor,
    matcher: &TagMatcher,
    recursive: bool,
) -> Result<Vec<SearchResult>>
where
    S: MetadataStore + ?Sized,
{
    let mut results = Vec::new();
    for entry in store.list(folder, recursive).await? {
        if entry.is_folder {
            continue;
        }
        match store.get_metadata(&entry).await {
            Ok(metadata) => results.extend(matcher.matches(&entry, &metadata)),
            Err(Error::NotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(results)
}
