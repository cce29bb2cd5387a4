//! Common utilities and types shared across IonFS modules.
//!
//! This module provides the descriptor and metadata types every layer speaks,
//! the status map produced by batched particle operations, and the shared
//! error taxonomy.

pub mod error;
pub mod status;
pub mod types;

pub use error::{Error, Result};
pub use status::{StatusMap, STATUS_OK};
pub use types::{ObjectDescriptor, ObjectMetadata, SearchResult, Tag, Usage, DELIMITER, SCHEME};
