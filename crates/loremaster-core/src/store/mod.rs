//! Vector store gateway
//!
//! Single pathway to the vector database:
//! - collection lifecycle (create/list/delete/truncate)
//! - batched writes honoring the backend's size quotas
//! - cosine similarity queries with id exclusion

mod chunks;
mod collections;
mod schema;

pub use chunks::{bytes_to_embedding, cosine_distance, embedding_to_bytes, shorten_id};
pub use collections::CollectionInfo;
pub use schema::VectorStore;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Maximum id length accepted by the store, in bytes
pub const MAX_ID_BYTES: usize = 128;

/// Maximum serialized size of a single metadata value, in bytes
pub const MAX_METADATA_VALUE_BYTES: usize = 4096;

/// Hard per-batch write limit of the backend
pub const MAX_WRITE_BATCH: usize = 300;

/// Flat metadata value; the store cannot hold nested structures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    /// Borrow the value as text, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Int(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// Flat chunk metadata map
pub type ChunkMetadata = HashMap<String, MetadataValue>;

/// One chunk as produced by the preprocessing pipeline (JSONL record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Globally unique id within the collection
    pub id: String,
    /// Content to embed and show the LLM
    pub text: String,
    /// Flat metadata map
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Query result as parallel arrays, sorted ascending by distance
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
}

impl QueryResponse {
    /// Number of results
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the response is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl VectorStore {
    /// Get the default store path
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::DATA_DIR_NAME)
            .join("store.sqlite")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_value_untagged_roundtrip() {
        let json = r#"{"title":"OWLBEAR","chunk_part":2,"weight":0.5,"split":true}"#;
        let meta: ChunkMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta["title"], MetadataValue::Text("OWLBEAR".into()));
        assert_eq!(meta["chunk_part"], MetadataValue::Int(2));
        assert_eq!(meta["weight"], MetadataValue::Float(0.5));
        assert_eq!(meta["split"], MetadataValue::Bool(true));
    }

    #[test]
    fn chunk_record_metadata_defaults_empty() {
        let record: ChunkRecord =
            serde_json::from_str(r#"{"id":"a","text":"hello"}"#).unwrap();
        assert!(record.metadata.is_empty());
    }
}
