//! Store schema and initialization

use crate::error::{LoreError, Result};
use rusqlite::{params, Connection};
use std::path::Path;

/// Main vector store handle
pub struct VectorStore {
    pub(crate) conn: Connection,
}

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- Collection registry; dimensions are learned from the first write
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    space TEXT NOT NULL DEFAULT 'cosine',
    dimensions INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Chunks with embeddings stored as little-endian f32 BLOBs
CREATE TABLE IF NOT EXISTS chunks (
    collection TEXT NOT NULL REFERENCES collections(name),
    chunk_id TEXT NOT NULL,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (collection, chunk_id)
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection);
"#;

impl VectorStore {
    /// Open store at path, creating if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            LoreError::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self { conn })
    }

    /// Open in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LoreError::StoreUnavailable(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Initialize store schema
    pub fn initialize(&self) -> Result<()> {
        // Set PRAGMAs for performance
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        self.conn.execute_batch(CREATE_TABLES)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let store = VectorStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.sqlite");
        let store = VectorStore::open(&path).unwrap();
        store.initialize().unwrap();
        assert!(path.exists());
    }
}
