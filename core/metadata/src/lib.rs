//! Metadata store abstraction for IonFS.
//!
//! A metadata store persists one record per uploaded object and the existence
//! of folders. The particle store holds no hierarchy, so every path-shaped
//! operation (list, move, mkdir) is answered here.
//!
//! Backends are selected per repository through a factory registry keyed by
//! a configuration class name:
//! - `localfs`: one JSON file per object under a local directory
//! - `document`: one document per object in a SQLite table
//! - `memory`: the document layout held in process memory
//! - `s3`: one object per record in an S3 bucket

pub mod document;
pub mod local;
pub mod object;
pub mod registry;
pub mod s3;
pub mod search;
pub mod sqlite;
pub mod store;

pub use document::{Document, DocumentCollection, DocumentStore, MemoryCollection};
pub use local::LocalFsStore;
pub use object::{Listing, MemoryBucket, ObjectBucket, ObjectStorageStore};
pub use registry::{create_default_registry, StoreConfig, StoreFactory, StoreRegistry};
pub use s3::S3Bucket;
pub use search::{search_by_metadata, TagMatcher};
pub use sqlite::SqliteCollection;
pub use store::MetadataStore;
