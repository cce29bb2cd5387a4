//! SQLite-backed document collection.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use ionfs_common::{Error, Result};

use crate::document::{Document, DocumentCollection};

/// Document collection stored in a single SQLite table.
pub struct SqliteCollection {
    conn: Mutex<Connection>,
}

impl SqliteCollection {
    /// Create or open a collection database.
    ///
    /// # Errors
    /// - Database creation or migration failure
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(Self::backend)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ionfs_metadata (
                key TEXT PRIMARY KEY,
                metadata TEXT,
                last_modified TEXT NOT NULL
            );
            "#,
        )
        .map_err(Self::backend)?;

        info!("Metadata database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory collection (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn backend(e: rusqlite::Error) -> Error {
        Error::Backend(format!("SQLite error: {}", e))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Backend("metadata database lock poisoned".to_string()))
    }

    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, Option<String>, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }

    fn into_document((key, metadata, modified): (String, Option<String>, String)) -> Document {
        let last_modified = DateTime::parse_from_rfc3339(&modified)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Document {
            key,
            metadata,
            last_modified,
        }
    }
}

#[async_trait]
impl DocumentCollection for SqliteCollection {
    async fn find_one(&self, key: &str) -> Result<Option<Document>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT key, metadata, last_modified FROM ionfs_metadata WHERE key = ?1",
                [key],
                Self::row_to_document,
            )
            .optional()
            .map_err(Self::backend)?;
        Ok(row.map(Self::into_document))
    }

    async fn find_prefix(&self, prefix: &str) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT key, metadata, last_modified FROM ionfs_metadata
                WHERE substr(key, 1, length(?1)) = ?1
                ORDER BY key
                "#,
            )
            .map_err(Self::backend)?;

        let rows = stmt
            .query_map([prefix], Self::row_to_document)
            .map_err(Self::backend)?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(Self::into_document(row.map_err(Self::backend)?));
        }
        Ok(documents)
    }

    async fn upsert(&self, document: Document) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO ionfs_metadata (key, metadata, last_modified)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                document.key,
                document.metadata,
                document.last_modified.to_rfc3339(),
            ],
        )
        .map_err(Self::backend)?;
        Ok(())
    }

    async fn delete_one(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM ionfs_metadata WHERE key = ?1", [key])
            .map_err(Self::backend)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentStore;
    use crate::store::MetadataStore;
    use ionfs_common::{ObjectDescriptor, ObjectMetadata};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sqlite_crud() {
        let collection = SqliteCollection::in_memory().unwrap();

        collection
            .upsert(Document::new("a/x", Some("{}".to_string())))
            .await
            .unwrap();
        collection.upsert(Document::new("a/", None)).await.unwrap();
        collection.upsert(Document::new("ab", None)).await.unwrap();

        let doc = collection.find_one("a/x").await.unwrap().unwrap();
        assert_eq!(doc.metadata.as_deref(), Some("{}"));

        let keys: Vec<String> = collection
            .find_prefix("a/")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(keys, vec!["a/", "a/x"]);

        assert!(collection.delete_one("a/x").await.unwrap());
        assert!(!collection.delete_one("a/x").await.unwrap());
        assert!(collection.find_one("a/x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_prefix_is_literal() {
        let collection = SqliteCollection::in_memory().unwrap();
        collection.upsert(Document::new("a_b", None)).await.unwrap();
        collection.upsert(Document::new("axb", None)).await.unwrap();

        let docs = collection.find_prefix("a_").await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_store_persists() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("ionfs.db");
        let file = ObjectDescriptor::file(None, "", "persisted");
        let meta = ObjectMetadata {
            id: Vec::new(),
            name: "persisted".to_string(),
            chunk_count: 0,
            max_size: 1,
            size: 0,
            hash: String::new(),
            iv: None,
            is_manifest: false,
            tags: Vec::new(),
        };

        {
            let store = DocumentStore::new(SqliteCollection::open(&db).unwrap(), "document", "db");
            store.put_metadata(&meta, &file).await.unwrap();
        }

        let store = DocumentStore::new(SqliteCollection::open(&db).unwrap(), "document", "db");
        assert_eq!(store.get_metadata(&file).await.unwrap(), meta);
    }
}
