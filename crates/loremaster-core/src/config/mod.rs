//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Retrieval tuning knobs
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Adaptive truncation knobs
    #[serde(default)]
    pub truncate: TruncateConfig,

    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LlmServiceConfig,

    /// Vector store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Result count when the caller does not override k
    #[serde(default = "default_k")]
    pub k_default: usize,

    /// Cap on filter-backfill iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Floor after adaptive truncation
    #[serde(default = "default_min_results")]
    pub min_results: usize,

    /// Breadth multiplier for comparison queries
    #[serde(default = "default_expand_factor")]
    pub entity_expand_factor: usize,

    /// Upper bound on expanded breadth
    #[serde(default = "default_expand_cap")]
    pub entity_expand_cap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_default: default_k(),
            max_iterations: default_max_iterations(),
            min_results: default_min_results(),
            entity_expand_factor: default_expand_factor(),
            entity_expand_cap: default_expand_cap(),
        }
    }
}

/// Adaptive truncation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncateConfig {
    /// Minimum distance jump that counts as a semantic cliff
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f32,

    /// Fallback cutoff above the best distance when no cliff exists
    #[serde(default = "default_distance_offset")]
    pub distance_offset: f32,
}

impl Default for TruncateConfig {
    fn default() -> Self {
        Self {
            gap_threshold: default_gap_threshold(),
            distance_offset: default_distance_offset(),
        }
    }
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmServiceConfig {
    /// Base URL of the LLM service for chat/completions
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// Model name for answer generation
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions; checked against the collection at query time
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Chat completion timeout in seconds
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Embedding request timeout in seconds
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,

    /// Sampling temperature; kept at zero so answers are deterministic
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LlmServiceConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_chat_model(),
            embedding_url: std::env::var("LOREMASTER_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("LOREMASTER_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("LOREMASTER_API_KEY").ok(),
            timeout_secs: default_chat_timeout(),
            embed_timeout_secs: default_embed_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite store file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Maximum entries per write batch
    #[serde(default = "default_write_batch")]
    pub write_batch_size: usize,

    /// Delete batch size used by truncate
    #[serde(default = "default_truncate_batch")]
    pub truncate_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            write_batch_size: default_write_batch(),
            truncate_batch_size: default_truncate_batch(),
        }
    }
}

fn default_k() -> usize {
    15
}

fn default_max_iterations() -> usize {
    3
}

fn default_min_results() -> usize {
    2
}

fn default_expand_factor() -> usize {
    3
}

fn default_expand_cap() -> usize {
    45
}

fn default_gap_threshold() -> f32 {
    0.10
}

fn default_distance_offset() -> f32 {
    0.40
}

fn default_llm_url() -> String {
    std::env::var("LOREMASTER_LLM_URL")
        .unwrap_or_else(|_| "https://api.openai.com".to_string())
}

fn default_chat_model() -> String {
    std::env::var("LOREMASTER_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("LOREMASTER_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "text-embedding-3-small".to_string())
}

fn default_chat_timeout() -> u64 {
    30
}

fn default_embed_timeout() -> u64 {
    5
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_write_batch() -> usize {
    300
}

fn default_truncate_batch() -> usize {
    500
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::DATA_DIR_NAME)
        .join("store.sqlite")
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_knobs() {
        let config = Config::default();
        assert_eq!(config.retrieval.k_default, 15);
        assert_eq!(config.retrieval.max_iterations, 3);
        assert_eq!(config.retrieval.min_results, 2);
        assert_eq!(config.retrieval.entity_expand_factor, 3);
        assert_eq!(config.retrieval.entity_expand_cap, 45);
        assert!((config.truncate.gap_threshold - 0.10).abs() < f32::EPSILON);
        assert!((config.truncate.distance_offset - 0.40).abs() < f32::EPSILON);
        assert_eq!(config.llm_service.temperature, 0.0);
        assert_eq!(config.store.write_batch_size, 300);
        assert_eq!(config.store.truncate_batch_size, 500);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "retrieval:\n  max_iterations: 5\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.retrieval.max_iterations, 5);
        assert_eq!(config.retrieval.k_default, 15);
        assert_eq!(config.store.write_batch_size, 300);
    }

    #[test]
    fn partial_llm_service_block_falls_back_to_url_default() {
        let yaml = "llm_service:\n  model: gpt-4o\n  timeout_secs: 60\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm_service.model, "gpt-4o");
        assert_eq!(config.llm_service.timeout_secs, 60);
        assert_eq!(config.llm_service.url, LlmServiceConfig::default().url);
        assert_eq!(
            config.llm_service.embedding_model,
            LlmServiceConfig::default().embedding_model
        );
    }
}
