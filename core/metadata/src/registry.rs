//! Backend registry for resolving metadata stores from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use ionfs_common::{Error, Result};

use crate::document::{DocumentStore, MemoryCollection};
use crate::local::LocalFsStore;
use crate::object::ObjectStorageStore;
use crate::s3::S3Bucket;
use crate::sqlite::SqliteCollection;
use crate::store::MetadataStore;

/// What a factory receives for one configured repository.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Repository name, for diagnostics.
    pub repository: String,
    /// Backend locator: directory, database file or bucket name.
    pub data_store: String,
    /// Backend-specific options (`Region`, `Endpoint`, ...).
    pub options: Value,
}

impl StoreConfig {
    fn option(&self, key: &str) -> Option<String> {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn require_data_store(&self, class: &str) -> Result<&str> {
        if self.data_store.is_empty() {
            return Err(Error::InvalidInput(format!(
                "repository '{}' ({}) requires a DataStore",
                self.repository, class
            )));
        }
        Ok(&self.data_store)
    }
}

/// Factory function type for creating metadata stores.
pub type StoreFactory =
    Box<dyn Fn(StoreConfig) -> Result<Arc<dyn MetadataStore>> + Send + Sync>;

/// Registry of metadata store factories keyed by class name.
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a store factory.
    ///
    /// # Preconditions
    /// - `class` must be unique within the registry
    ///
    /// # Errors
    /// - Returns error if the class is already registered
    pub fn register(&mut self, class: impl Into<String>, factory: StoreFactory) -> Result<()> {
        let class = class.into();
        if self.factories.contains_key(&class) {
            return Err(Error::AlreadyExists(format!(
                "Metadata class '{}' is already registered",
                class
            )));
        }
        self.factories.insert(class, factory);
        Ok(())
    }

    /// Resolve a store by class name and configuration.
    ///
    /// # Errors
    /// - Class not registered
    /// - Configuration invalid for the class
    pub fn resolve(&self, class: &str, config: StoreConfig) -> Result<Arc<dyn MetadataStore>> {
        let factory = self.factories.get(class).ok_or_else(|| {
            Error::NotFound(format!("Metadata class '{}' is not registered", class))
        })?;
        factory(config)
    }

    /// Get list of registered class names.
    pub fn classes(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a class is registered.
    pub fn has_class(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn local_factory() -> StoreFactory {
    Box::new(|config| {
        let root = config.require_data_store("localfs")?;
        Ok(Arc::new(LocalFsStore::new(root)?))
    })
}

fn document_factory() -> StoreFactory {
    Box::new(|config| {
        let db = config.require_data_store("document")?;
        let collection = SqliteCollection::open(db)?;
        Ok(Arc::new(DocumentStore::new(collection, "document", db)))
    })
}

fn s3_factory() -> StoreFactory {
    Box::new(|config| {
        let bucket = config.require_data_store("s3")?;
        Ok(Arc::new(ObjectStorageStore::new(S3Bucket::new(
            bucket,
            config.option("Region"),
            config.option("Endpoint"),
        ))))
    })
}

/// Create a registry with the built-in backends.
///
/// Legacy fully-qualified class names from older settings files resolve to
/// the matching backend.
pub fn create_default_registry() -> Result<StoreRegistry> {
    let mut registry = StoreRegistry::new();

    registry.register("localfs", local_factory())?;
    registry.register("Ionburst.Apps.IonFS.Repo.LocalFS.MetadataLocalFS", local_factory())?;

    registry.register("document", document_factory())?;
    registry.register("Ionburst.Apps.IonFS.Repo.MongoDB.MetadataMongoDB", document_factory())?;

    registry.register("s3", s3_factory())?;
    registry.register("Ionburst.Apps.IonFS.Repo.S3.MetadataS3", s3_factory())?;

    // In-memory documents (for testing)
    registry.register(
        "memory",
        Box::new(|config| {
            Ok(Arc::new(DocumentStore::new(
                MemoryCollection::new(),
                "memory",
                config.data_store,
            )))
        }),
    )?;

    Ok(registry)
}
