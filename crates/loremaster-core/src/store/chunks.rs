//! Chunk write and query operations
//!
//! Embeddings are stored as little-endian f32 BLOBs; cosine distance is
//! computed in Rust at query time.

use super::{
    ChunkMetadata, QueryResponse, VectorStore, MAX_ID_BYTES, MAX_METADATA_VALUE_BYTES,
    MAX_WRITE_BATCH,
};
use crate::error::{LoreError, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

impl VectorStore {
    /// Write chunks in contiguous batches of at most `write_batch_size`.
    ///
    /// Writes are sequential. Metadata values whose serialized form exceeds
    /// the backend's per-value limit are dropped with a warning rather than
    /// failing the write. Returns the number of entries written.
    pub fn add(
        &self,
        name: &str,
        ids: &[String],
        embeddings: &[Vec<f32>],
        texts: &[String],
        metadatas: &[ChunkMetadata],
        write_batch_size: usize,
    ) -> Result<usize> {
        if !self.exists(name)? {
            return Err(LoreError::CollectionNotFound(name.to_string()));
        }
        if ids.len() != embeddings.len() || ids.len() != texts.len() || ids.len() != metadatas.len()
        {
            return Err(LoreError::InvalidInput(format!(
                "parallel arrays disagree: {} ids, {} embeddings, {} texts, {} metadatas",
                ids.len(),
                embeddings.len(),
                texts.len(),
                metadatas.len()
            )));
        }
        if write_batch_size == 0 || write_batch_size > MAX_WRITE_BATCH {
            return Err(LoreError::QuotaExceeded(format!(
                "write batch size {} outside backend limit 1..={}",
                write_batch_size, MAX_WRITE_BATCH
            )));
        }
        if ids.is_empty() {
            return Ok(0);
        }

        for id in ids {
            if id.len() > MAX_ID_BYTES {
                return Err(LoreError::InvalidInput(format!(
                    "chunk id exceeds {} bytes: {}",
                    MAX_ID_BYTES, id
                )));
            }
        }

        let dims = embeddings[0].len();
        if dims == 0 {
            return Err(LoreError::InvalidInput("empty embedding".to_string()));
        }
        if let Some(e) = embeddings.iter().find(|e| e.len() != dims) {
            return Err(LoreError::InvalidInput(format!(
                "inconsistent embedding dimensions: {} vs {}",
                e.len(),
                dims
            )));
        }
        let info = self
            .get_collection(name)?
            .ok_or_else(|| LoreError::CollectionNotFound(name.to_string()))?;
        match info.dimensions {
            Some(existing) if existing != dims => {
                return Err(LoreError::Config(format!(
                    "collection {} holds {}-dimensional embeddings, write has {}",
                    name, existing, dims
                )));
            }
            Some(_) => {}
            None => self.set_dimensions(name, dims)?,
        }

        let total = ids.len();
        let batches = total.div_ceil(write_batch_size);
        let now = Utc::now().to_rfc3339();
        let mut written = 0usize;

        for (batch_idx, start) in (0..total).step_by(write_batch_size).enumerate() {
            let end = (start + write_batch_size).min(total);

            self.conn.execute("BEGIN IMMEDIATE", [])?;
            let result: Result<()> = (|| {
                for i in start..end {
                    let metadata_json = sanitize_metadata(&ids[i], &metadatas[i])?;
                    self.conn.execute(
                        "INSERT INTO chunks (collection, chunk_id, text, metadata, embedding, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            name,
                            ids[i],
                            texts[i],
                            metadata_json,
                            embedding_to_bytes(&embeddings[i]),
                            now
                        ],
                    )?;
                }
                Ok(())
            })();

            if result.is_ok() {
                self.conn.execute("COMMIT", [])?;
            } else {
                let _ = self.conn.execute("ROLLBACK", []);
                result?;
            }

            written += end - start;
            tracing::info!(
                "add {}: wrote batch {}/{} ({} entries)",
                name,
                batch_idx + 1,
                batches,
                end - start
            );
        }

        self.touch_collection(name)?;
        Ok(written)
    }

    /// Nearest neighbors by cosine distance, ascending.
    ///
    /// Ids in `exclude_ids` are filtered out in the store via a NOT IN
    /// clause before scoring. Returns parallel arrays.
    pub fn query(
        &self,
        name: &str,
        query_embedding: &[f32],
        n_results: usize,
        exclude_ids: Option<&HashSet<String>>,
    ) -> Result<QueryResponse> {
        let info = self
            .get_collection(name)?
            .ok_or_else(|| LoreError::CollectionNotFound(name.to_string()))?;

        match info.dimensions {
            Some(dims) if dims != query_embedding.len() => {
                return Err(LoreError::Config(format!(
                    "query embedding has {} dimensions, collection {} holds {}",
                    query_embedding.len(),
                    name,
                    dims
                )));
            }
            Some(_) => {}
            // Empty collection; nothing to score.
            None => return Ok(QueryResponse::default()),
        }

        let excluded: Vec<String> = exclude_ids
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        let mut sql = String::from(
            "SELECT chunk_id, text, metadata, embedding FROM chunks WHERE collection = ?1",
        );
        if !excluded.is_empty() {
            let placeholders: Vec<String> = (0..excluded.len())
                .map(|i| format!("?{}", i + 2))
                .collect();
            sql.push_str(&format!(
                " AND chunk_id NOT IN ({})",
                placeholders.join(", ")
            ));
        }

        let mut bound: Vec<String> = Vec::with_capacity(1 + excluded.len());
        bound.push(name.to_string());
        bound.extend(excluded);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut scored: Vec<(String, String, String, f32)> = stmt
            .query_map(params_from_iter(bound.iter()), |row| {
                let chunk_id: String = row.get(0)?;
                let text: String = row.get(1)?;
                let metadata: String = row.get(2)?;
                let embedding_bytes: Vec<u8> = row.get(3)?;
                Ok((chunk_id, text, metadata, embedding_bytes))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(chunk_id, text, metadata, bytes)| {
                let embedding = bytes_to_embedding(&bytes);
                let distance = cosine_distance(query_embedding, &embedding);
                (chunk_id, text, metadata, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.3.partial_cmp(&b.3).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        let mut response = QueryResponse::default();
        for (chunk_id, text, metadata_json, distance) in scored {
            let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)?;
            response.ids.push(chunk_id);
            response.documents.push(text);
            response.metadatas.push(metadata);
            response.distances.push(distance);
        }

        Ok(response)
    }

    /// Fetch a single chunk's text and metadata by id
    pub fn get_chunk(&self, name: &str, chunk_id: &str) -> Result<Option<(String, ChunkMetadata)>> {
        let result = self.conn.query_row(
            "SELECT text, metadata FROM chunks WHERE collection = ?1 AND chunk_id = ?2",
            params![name, chunk_id],
            |row| {
                let text: String = row.get(0)?;
                let metadata: String = row.get(1)?;
                Ok((text, metadata))
            },
        );
        match result {
            Ok((text, metadata_json)) => {
                let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)?;
                Ok(Some((text, metadata)))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serialize metadata, dropping values over the backend's per-value limit
fn sanitize_metadata(chunk_id: &str, metadata: &ChunkMetadata) -> Result<String> {
    let mut map = serde_json::Map::new();
    for (key, value) in metadata {
        let serialized = serde_json::to_value(value)?;
        let size = serialized.to_string().len();
        if size > MAX_METADATA_VALUE_BYTES {
            tracing::warn!(
                "dropping oversized metadata value '{}' on chunk {} ({} bytes)",
                key,
                chunk_id,
                size
            );
            continue;
        }
        map.insert(key.clone(), serialized);
    }
    Ok(serde_json::Value::Object(map).to_string())
}

/// Shorten an id derived from a long hierarchical path.
///
/// Ids at or under 120 bytes pass through; longer ones are truncated and
/// suffixed with a SHA-256 fragment so distinct paths stay distinct.
pub fn shorten_id(id: &str) -> String {
    const MAX_LEN: usize = 120;
    if id.len() <= MAX_LEN {
        return id.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let suffix = &digest[..12];

    let budget = MAX_LEN - suffix.len() - 1;
    let mut cut = budget;
    while !id.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}-{}", &id[..cut], suffix)
}

/// Pack an embedding into the BLOB form the store keeps: each component as
/// four little-endian bytes, concatenated in order.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for component in embedding {
        bytes.extend_from_slice(&component.to_le_bytes());
    }
    bytes
}

/// Unpack a stored BLOB back into an embedding. Trailing bytes that do not
/// fill a whole component are ignored.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for word in bytes.chunks_exact(4) {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(word);
        embedding.push(f32::from_le_bytes(buf));
    }
    embedding
}

/// Cosine distance (1 - cosine similarity), clamped to [0, 2].
///
/// Dot product and both squared norms accumulate in one pass. Degenerate
/// inputs (length mismatch, empty or zero-magnitude vector) score 1.0, the
/// same as an orthogonal pair, never NaN.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let scale = (norm_a * norm_b).sqrt();
    if scale == 0.0 {
        return 1.0;
    }

    (1.0 - dot / scale).clamp(0.0, 2.0)
}
