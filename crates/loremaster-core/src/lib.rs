//! Loremaster Core Library
//!
//! Retrieval-augmented question answering over the AD&D 1st-edition
//! rulebooks.
//!
//! # Features
//! - SQLite-backed vector store with cosine similarity and batched writes
//! - Query embedding via external OpenAI-compatible services
//! - Chunk-level `query_must` filtering with iterative backfill retrieval
//! - Entity-aware expansion for comparison queries ("X vs Y")
//! - Adaptive gap-based result truncation and grounded prompt assembly

pub mod config;
pub mod error;
pub mod llm;
pub mod retrieval;
pub mod store;

pub use config::{Config, LlmServiceConfig, RetrievalConfig, StoreConfig, TruncateConfig};
pub use error::{Error, LoreError, Result};
pub use llm::{
    ChatMessage, Completion, Embedder, HttpEmbedder, LlmClient, OpenAiClient, TokenUsage,
};
pub use retrieval::{
    satisfies, EntityDetector, QueryMust, RagEngine, RagOutput, RetrievedChunk,
};
pub use store::{ChunkRecord, CollectionInfo, MetadataValue, QueryResponse, VectorStore};

/// Similarity space recorded in collection metadata
pub const SIMILARITY_SPACE: &str = "cosine";

/// Default data directory name
pub const DATA_DIR_NAME: &str = "loremaster";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "loremaster";
