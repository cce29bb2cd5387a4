//! Repository registry.
//!
//! A repository pairs a metadata store with a usage class. The registry is
//! built once from settings and only read afterwards, so it is shared freely
//! between concurrent verbs.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use ionfs_common::{Error, ObjectDescriptor, Result, Usage};
use ionfs_metadata::{MetadataStore, StoreConfig, StoreRegistry};

use crate::config::Settings;

/// A named metadata store with its usage class.
#[derive(Clone)]
pub struct Repository {
    name: String,
    class: String,
    usage: Usage,
    is_default: bool,
    store: Arc<dyn MetadataStore>,
}

impl Repository {
    pub fn new(name: impl Into<String>, usage: Usage, store: Arc<dyn MetadataStore>) -> Self {
        Self {
            name: name.into(),
            class: store.name().to_string(),
            usage,
            is_default: false,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured backend class.
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn data_store(&self) -> &str {
        self.store.data_store()
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn is_secret(&self) -> bool {
        self.usage == Usage::Secrets
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("data_store", &self.data_store())
            .field("usage", &self.usage)
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Repositories by name, with exactly one default.
#[derive(Debug)]
pub struct RepositoryRegistry {
    repositories: Vec<Repository>,
    index: HashMap<String, usize>,
    default: usize,
}

impl RepositoryRegistry {
    /// Build a registry.
    ///
    /// The default is `default` when given, otherwise the first repository.
    ///
    /// # Errors
    /// - No repositories
    /// - Duplicate repository name
    /// - `default` names an unknown repository
    pub fn new(repositories: Vec<Repository>, default: Option<&str>) -> Result<Self> {
        if repositories.is_empty() {
            return Err(Error::InvalidInput(
                "at least one repository must be configured".to_string(),
            ));
        }

        let mut index = HashMap::new();
        for (i, repo) in repositories.iter().enumerate() {
            if index.insert(repo.name.clone(), i).is_some() {
                return Err(Error::AlreadyExists(format!(
                    "repository '{}' is configured twice",
                    repo.name
                )));
            }
        }

        let default = match default {
            Some(name) => *index.get(name).ok_or_else(|| {
                Error::NotFound(format!("default repository '{}' is not configured", name))
            })?,
            None => 0,
        };

        let mut repositories = repositories;
        for (i, repo) in repositories.iter_mut().enumerate() {
            repo.is_default = i == default;
        }

        Ok(Self {
            repositories,
            index,
            default,
        })
    }

    /// Build the registry from settings, resolving each backend class.
    ///
    /// `DefaultRepository` wins over a repository's own `Default` flag.
    pub fn from_settings(settings: &Settings, stores: &StoreRegistry) -> Result<Self> {
        let mut repositories = Vec::with_capacity(settings.repositories.len());
        for entry in &settings.repositories {
            let store = stores.resolve(
                &entry.class,
                StoreConfig {
                    repository: entry.name.clone(),
                    data_store: entry.data_store.clone(),
                    options: entry.options.clone(),
                },
            )?;
            let mut repo = Repository::new(&entry.name, entry.usage.parse()?, store);
            repo.class = entry.class.clone();
            debug!(repository = %repo.name, class = %repo.class, usage = %repo.usage, "Registered repository");
            repositories.push(repo);
        }

        let flagged = settings
            .repositories
            .iter()
            .find(|r| r.default)
            .map(|r| r.name.as_str());
        let default = settings.default_repository.as_deref().or(flagged);

        let registry = Self::new(repositories, default)?;
        info!(
            count = registry.repositories.len(),
            default = %registry.default_repository().name,
            "Repositories loaded"
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.index.get(name).map(|&i| &self.repositories[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn default_repository(&self) -> &Repository {
        &self.repositories[self.default]
    }

    /// Repositories in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.iter()
    }

    /// Attach a descriptor to its repository.
    ///
    /// An absent or unknown repository name becomes the default repository.
    /// The secret flag follows the repository's usage.
    pub fn bind(&self, descriptor: &ObjectDescriptor) -> (ObjectDescriptor, &Repository) {
        let repo = descriptor
            .repository
            .as_deref()
            .and_then(|name| self.get(name))
            .unwrap_or_else(|| self.default_repository());

        let mut bound = descriptor.clone();
        bound.repository = Some(repo.name.clone());
        bound.is_secret = repo.is_secret();
        (bound, repo)
    }
}
