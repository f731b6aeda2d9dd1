//! Collection management commands

use crate::app::{CollectionAction, CollectionArgs};
use anyhow::Result;
use loremaster_core::{Config, VectorStore};

pub async fn run(args: CollectionArgs, store: &VectorStore, config: &Config) -> Result<()> {
    match args.action {
        CollectionAction::List => {
            let collections = store.list_collections()?;
            if collections.is_empty() {
                println!("No collections");
            } else {
                for coll in collections {
                    let dims = coll
                        .dimensions
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}: {} chunks [space: {}, dims: {}]",
                        coll.name, coll.chunk_count, coll.space, dims
                    );
                }
            }
        }
        CollectionAction::Remove { name } => {
            if store.delete_collection(&name)? {
                println!("Removed collection '{}'", name);
            } else {
                println!("No such collection '{}'", name);
            }
        }
        CollectionAction::Truncate { name, batch_size } => {
            let batch_size = if batch_size == 0 {
                config.store.truncate_batch_size
            } else {
                batch_size
            };
            let deleted = store.truncate(&name, batch_size)?;
            println!("Deleted {} chunks from '{}'", deleted, name);
        }
        CollectionAction::Count { name } => {
            println!("{}", store.count(&name)?);
        }
    }
    Ok(())
}
