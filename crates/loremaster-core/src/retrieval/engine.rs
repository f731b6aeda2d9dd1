//! End-to-end RAG engine
//!
//! Wires the embedder, store, retriever, truncator, and prompt assembler to
//! the completion service and assembles the caller-facing output.

use super::prompt::{build_messages, NO_CONTEXT_ANSWER};
use super::retriever::IterativeRetriever;
use super::truncate::adaptive_truncate;
use crate::config::Config;
use crate::error::Result;
use crate::llm::{Embedder, LlmClient, TokenUsage};
use crate::store::VectorStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Diagnostics attached to every answer
#[derive(Debug, Clone, Serialize)]
pub struct QueryMeta {
    pub collection: String,
    pub model: String,
    pub k: usize,
    pub comparison: bool,
    /// Candidates surviving the filter loop, before truncation
    pub candidates: usize,
    /// Chunks actually shown to the LLM
    pub context_chunks: usize,
    /// Backfill iterations consumed
    pub iterations: usize,
    pub elapsed_ms: u64,
}

/// Container returned by a query
#[derive(Debug, Clone, Serialize)]
pub struct RagOutput {
    /// Grounded answer; None when the LLM call failed
    pub answer: Option<String>,
    /// Soft issues observed along the way
    pub diagnostics: Vec<String>,
    /// Failures that nulled the answer
    pub errors: Vec<String>,
    /// Token usage self-reported by the completion service
    pub usage: TokenUsage,
    pub meta: QueryMeta,
}

/// Retrieval-augmented answering over one vector store
pub struct RagEngine {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LlmClient>,
    config: Config,
}

impl RagEngine {
    pub fn new(
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmClient>,
        config: Config,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            config,
        }
    }

    /// Borrow the underlying store
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Answer a question from `collection`.
    ///
    /// Unrecoverable failures (store, embedding, configuration) surface as
    /// errors. An LLM failure does not: the output carries a null answer
    /// and the message in `errors`, alongside whatever diagnostics were
    /// gathered first.
    pub async fn query(
        &self,
        question: &str,
        collection: &str,
        k: Option<usize>,
        debug: bool,
    ) -> Result<RagOutput> {
        let start = Instant::now();
        let k = k.unwrap_or(self.config.retrieval.k_default);
        let mut diagnostics = Vec::new();

        let retriever =
            IterativeRetriever::new(&self.store, self.embedder.as_ref(), &self.config.retrieval);
        let outcome = retriever
            .retrieve(question, collection, k, &mut diagnostics)
            .await?;

        let candidates = outcome.chunks.len();
        let context = adaptive_truncate(
            outcome.chunks,
            &self.config.truncate,
            self.config.retrieval.min_results,
            k,
        );

        if debug {
            let distances: Vec<String> = context
                .iter()
                .map(|c| format!("{}={:.4}", c.id, c.distance))
                .collect();
            diagnostics.push(format!(
                "kept {} of {} candidates: [{}]",
                context.len(),
                candidates,
                distances.join(", ")
            ));
        }

        let mut errors = Vec::new();
        let (answer, usage) = if context.is_empty() {
            diagnostics.push("no context retrieved; skipping LLM call".to_string());
            (Some(NO_CONTEXT_ANSWER.to_string()), TokenUsage::default())
        } else {
            let messages = build_messages(question, &context);
            match self.llm.chat_completion(messages).await {
                Ok(completion) => {
                    let usage = match completion.usage {
                        Some(usage) => usage,
                        None => {
                            diagnostics
                                .push("LLM response missing token usage; recorded as zero".to_string());
                            TokenUsage::default()
                        }
                    };
                    (Some(completion.content), usage)
                }
                Err(e) => {
                    tracing::warn!("LLM completion failed: {}", e);
                    errors.push(e.to_string());
                    (None, TokenUsage::default())
                }
            }
        };

        Ok(RagOutput {
            answer,
            diagnostics,
            errors,
            usage,
            meta: QueryMeta {
                collection: collection.to_string(),
                model: self.llm.model_name().to_string(),
                k,
                comparison: outcome.comparison,
                candidates,
                context_chunks: context.len(),
                iterations: outcome.iterations,
                elapsed_ms: start.elapsed().as_millis() as u64,
            },
        })
    }
}
