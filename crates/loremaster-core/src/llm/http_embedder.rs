//! HTTP-based query embedder using an external inference service

use super::{Embedder, LlmClient, OpenAiClient};
use crate::config::LlmServiceConfig;
use crate::error::{LoreError, Result};
use crate::store::VectorStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Embedder that uses an external HTTP service (OpenAI, vLLM, etc.)
pub struct HttpEmbedder {
    client: Arc<dyn LlmClient>,
}

impl HttpEmbedder {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Create from configuration
    pub fn from_config(config: LlmServiceConfig) -> Result<Self> {
        let client = OpenAiClient::new(config)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let client = OpenAiClient::from_env()?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.client.embedding_dimensions()
    }

    fn model_name(&self) -> &str {
        self.client.embedding_model_name()
    }
}

/// Fail fast when the embedder's dimensionality disagrees with the target
/// collection. A populated collection records its dimensions at first write;
/// an empty one accepts any model.
pub fn verify_collection_dimensions(
    embedder: &dyn Embedder,
    store: &VectorStore,
    collection: &str,
) -> Result<()> {
    let info = store
        .get_collection(collection)?
        .ok_or_else(|| LoreError::CollectionNotFound(collection.to_string()))?;

    if let Some(dims) = info.dimensions {
        if dims != embedder.dimensions() {
            return Err(LoreError::Config(format!(
                "embedding model {} produces {}-dimensional vectors, collection {} holds {}",
                embedder.model_name(),
                embedder.dimensions(),
                collection,
                dims
            )));
        }
    }
    Ok(())
}
