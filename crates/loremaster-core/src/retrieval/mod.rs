//! Retrieval pipeline
//!
//! Stages, in order: query embedding, vector search with entity-aware
//! expansion, chunk-level `query_must` filtering with iterative backfill,
//! adaptive gap-based truncation, prompt assembly, answer generation.

mod engine;
mod entity;
mod filter;
mod prompt;
mod retriever;
mod truncate;

pub use engine::{QueryMeta, RagEngine, RagOutput};
pub use entity::EntityDetector;
pub use filter::{parse_query_must, satisfies, ContainRange, QueryMust};
pub use prompt::{build_messages, NO_CONTEXT_ANSWER};
pub use retriever::{IterativeRetriever, RetrievalOutcome};
pub use truncate::adaptive_truncate;

use crate::store::ChunkMetadata;

/// One retrieved chunk with its cosine distance (smaller is more similar)
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

impl RetrievedChunk {
    /// Human-readable chunk title, when present
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|v| v.as_str())
    }
}
