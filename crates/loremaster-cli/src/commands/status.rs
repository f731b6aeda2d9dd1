//! Status command

use crate::app::OutputFormat;
use anyhow::Result;
use loremaster_core::VectorStore;

pub async fn run(store: &VectorStore, format: OutputFormat) -> Result<()> {
    let collections = store.list_collections()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&collections)?);
        }
        OutputFormat::Cli => {
            let total: usize = collections.iter().map(|c| c.chunk_count).sum();
            println!("Collections: {}", collections.len());
            println!("Chunks:      {}", total);
            for coll in collections {
                println!(
                    "  {}: {} chunks (updated {})",
                    coll.name, coll.chunk_count, coll.updated_at
                );
            }
        }
    }
    Ok(())
}
