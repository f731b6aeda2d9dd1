//! Iterative retrieval with filtering and backfill
//!
//! Filtering alone shrinks the result set whenever noisy chunks crowd the
//! top, so every iteration re-queries the store with the filtered ids
//! excluded, replenishing the pool until the target count is met, the store
//! runs dry, or an iteration passes with no new exclusions.

use super::entity::EntityDetector;
use super::filter::{parse_query_must, satisfies};
use super::RetrievedChunk;
use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::llm::{verify_collection_dimensions, Embedder};
use crate::store::VectorStore;
use std::collections::HashSet;

/// Result of one retrieval pass
#[derive(Debug)]
pub struct RetrievalOutcome {
    /// Surviving chunks, entity-promoted for comparison queries, otherwise
    /// in ascending distance order
    pub chunks: Vec<RetrievedChunk>,
    /// Whether the query was treated as a comparison
    pub comparison: bool,
    /// Backfill iterations consumed (0 when the first query sufficed)
    pub iterations: usize,
}

/// Orchestrates embed -> query -> filter -> re-query until `k` chunks pass
pub struct IterativeRetriever<'a> {
    store: &'a VectorStore,
    embedder: &'a dyn Embedder,
    config: &'a RetrievalConfig,
}

impl<'a> IterativeRetriever<'a> {
    pub fn new(
        store: &'a VectorStore,
        embedder: &'a dyn Embedder,
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve up to `k` chunks for `query` from `collection`.
    ///
    /// The query is embedded exactly once; the store is queried at most
    /// `max_iterations + 1` times. Store and embedding failures propagate;
    /// malformed `query_must` payloads fail open with a diagnostic.
    pub async fn retrieve(
        &self,
        query: &str,
        collection: &str,
        k: usize,
        diagnostics: &mut Vec<String>,
    ) -> Result<RetrievalOutcome> {
        verify_collection_dimensions(self.embedder, self.store, collection)?;

        let embedding = self.embedder.embed(query).await?;

        let detector = EntityDetector::new(self.config);
        let comparison = detector.is_comparison(query);
        let entities = if comparison {
            detector.extract_entities(query)
        } else {
            Vec::new()
        };
        let initial_n = detector.expand_k(k, comparison);

        if comparison {
            tracing::debug!(
                "comparison query, entities {:?}, widened n_results to {}",
                entities,
                initial_n
            );
        }

        let mut kept: Vec<RetrievedChunk> = Vec::new();
        let mut kept_ids: HashSet<String> = HashSet::new();
        let mut excluded: HashSet<String> = HashSet::new();
        let mut iteration = 0usize;

        while kept.len() < k && iteration < self.config.max_iterations {
            let exclude = if excluded.is_empty() {
                None
            } else {
                Some(&excluded)
            };
            let response = self.store.query(collection, &embedding, initial_n, exclude)?;
            if response.is_empty() {
                break;
            }

            let mut new_exclusions = 0usize;
            for i in 0..response.len() {
                let id = &response.ids[i];
                if kept_ids.contains(id) {
                    continue;
                }

                if let Some(raw) = response.metadatas[i]
                    .get("query_must")
                    .and_then(|v| v.as_str())
                {
                    match parse_query_must(raw) {
                        Ok(predicate) => {
                            if !satisfies(query, &predicate) {
                                excluded.insert(id.clone());
                                new_exclusions += 1;
                                diagnostics
                                    .push(format!("filtered {}: query_must not satisfied", id));
                                tracing::debug!("filtered {}: query_must not satisfied", id);
                                continue;
                            }
                        }
                        Err(e) => {
                            // Malformed predicates never drop a chunk.
                            diagnostics.push(format!(
                                "malformed query_must on {}: {}; chunk included",
                                id, e
                            ));
                            tracing::warn!("malformed query_must on {}: {}", id, e);
                        }
                    }
                }

                kept_ids.insert(id.clone());
                kept.push(RetrievedChunk {
                    id: id.clone(),
                    text: response.documents[i].clone(),
                    metadata: response.metadatas[i].clone(),
                    distance: response.distances[i],
                });
            }

            if new_exclusions == 0 {
                break;
            }
            iteration += 1;
        }

        kept.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if comparison {
            kept = EntityDetector::reorder(kept, &entities, k);
        } else {
            kept.truncate(k);
        }

        tracing::debug!(
            "retrieved {} chunks after {} backfill iterations ({} excluded)",
            kept.len(),
            iteration,
            excluded.len()
        );

        Ok(RetrievalOutcome {
            chunks: kept,
            comparison,
            iterations: iteration,
        })
    }
}
