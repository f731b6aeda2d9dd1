//! Load preprocessed chunks into a collection
//!
//! Reads the JSONL chunk file produced by the preprocessing pipeline,
//! embeds the texts through the configured embedding service, and writes
//! everything through the gateway's batched add.

use crate::app::LoadArgs;
use anyhow::{Context, Result};
use loremaster_core::store::shorten_id;
use loremaster_core::{ChunkRecord, Config, Embedder, HttpEmbedder, VectorStore};
use std::fs::File;
use std::io::{BufRead, BufReader};

pub async fn run(args: LoadArgs, store: &VectorStore, config: &Config) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("cannot open {}", args.file.display()))?;

    let mut records: Vec<ChunkRecord> = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ChunkRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: bad chunk record", args.file.display(), line_no + 1))?;
        records.push(record);
    }

    if records.is_empty() {
        println!("Nothing to load");
        return Ok(());
    }

    store.get_or_create(&args.collection)?;
    if args.truncate_first {
        let deleted = store.truncate(&args.collection, config.store.truncate_batch_size)?;
        println!("Truncated '{}' ({} chunks)", args.collection, deleted);
    }

    let embedder = HttpEmbedder::from_config(config.llm_service.clone())?;

    let ids: Vec<String> = records.iter().map(|r| shorten_id(&r.id)).collect();
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let metadatas: Vec<_> = records.into_iter().map(|r| r.metadata).collect();

    let embed_batch = args.embed_batch.max(1);
    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for (batch_idx, batch) in texts.chunks(embed_batch).enumerate() {
        let vectors = embedder.embed_batch(batch).await?;
        embeddings.extend(vectors);
        tracing::info!(
            "embedded batch {} ({}/{} texts)",
            batch_idx + 1,
            embeddings.len(),
            texts.len()
        );
    }

    let written = store.add(
        &args.collection,
        &ids,
        &embeddings,
        &texts,
        &metadatas,
        config.store.write_batch_size,
    )?;

    println!("Loaded {} chunks into '{}'", written, args.collection);
    Ok(())
}
