//! Collection operations

use super::VectorStore;
use crate::error::{LoreError, Result};
use chrono::Utc;
use rusqlite::params;

/// Collection info
#[derive(Debug, Clone, serde::Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub space: String,
    pub dimensions: Option<usize>,
    pub chunk_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl VectorStore {
    /// Get a collection, creating it if absent. Idempotent.
    pub fn get_or_create(&self, name: &str) -> Result<CollectionInfo> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO collections (name, space, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![name, crate::SIMILARITY_SPACE, now],
        )?;

        self.get_collection(name)?
            .ok_or_else(|| LoreError::CollectionNotFound(name.to_string()))
    }

    /// Get collection by name
    pub fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let result = self.conn.query_row(
            "SELECT c.name, c.space, c.dimensions, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM chunks ch WHERE ch.collection = c.name)
             FROM collections c WHERE c.name = ?1",
            params![name],
            |row| {
                Ok(CollectionInfo {
                    name: row.get(0)?,
                    space: row.get(1)?,
                    dimensions: row.get::<_, Option<i64>>(2)?.map(|d| d as usize),
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    chunk_count: row.get::<_, i64>(5)? as usize,
                })
            },
        );
        match result {
            Ok(info) => Ok(Some(info)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List all collections with chunk counts
    pub fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.name, c.space, c.dimensions, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM chunks ch WHERE ch.collection = c.name)
             FROM collections c
             ORDER BY c.name",
        )?;

        let results = stmt
            .query_map([], |row| {
                Ok(CollectionInfo {
                    name: row.get(0)?,
                    space: row.get(1)?,
                    dimensions: row.get::<_, Option<i64>>(2)?.map(|d| d as usize),
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    chunk_count: row.get::<_, i64>(5)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Whether a collection exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_collection(name)?.is_some())
    }

    /// Number of chunks in a collection
    pub fn count(&self, name: &str) -> Result<usize> {
        let info = self
            .get_collection(name)?
            .ok_or_else(|| LoreError::CollectionNotFound(name.to_string()))?;
        Ok(info.chunk_count)
    }

    /// Remove a collection and its chunks
    pub fn delete_collection(&self, name: &str) -> Result<bool> {
        self.conn.execute(
            "DELETE FROM chunks WHERE collection = ?1",
            params![name],
        )?;
        let rows = self
            .conn
            .execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }

    /// Delete all chunks in a collection, in batches of `batch_size`.
    /// Returns the total number deleted. Dimensions are kept so a reload
    /// with the same model passes the compatibility check.
    pub fn truncate(&self, name: &str, batch_size: usize) -> Result<usize> {
        if !self.exists(name)? {
            return Err(LoreError::CollectionNotFound(name.to_string()));
        }
        let batch_size = batch_size.max(1);
        let mut total = 0usize;

        loop {
            let deleted = self.conn.execute(
                "DELETE FROM chunks WHERE rowid IN
                 (SELECT rowid FROM chunks WHERE collection = ?1 LIMIT ?2)",
                params![name, batch_size as i64],
            )?;
            if deleted == 0 {
                break;
            }
            total += deleted;
            tracing::info!("truncate {}: deleted batch of {} ({} total)", name, deleted, total);
        }

        self.touch_collection(name)?;
        Ok(total)
    }

    /// Update collection's updated_at timestamp
    pub fn touch_collection(&self, name: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE collections SET updated_at = ?2 WHERE name = ?1",
            params![name, now],
        )?;
        Ok(())
    }

    /// Record embedding dimensions for a collection
    pub(crate) fn set_dimensions(&self, name: &str, dimensions: usize) -> Result<()> {
        self.conn.execute(
            "UPDATE collections SET dimensions = ?2 WHERE name = ?1",
            params![name, dimensions as i64],
        )?;
        Ok(())
    }
}
