//! Loremaster CLI
//!
//! Grounded question answering over the AD&D 1st-edition rulebooks.

use anyhow::Result;
use clap::Parser;
use loremaster_core::{Config, LoreError, VectorStore};

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        let code = e
            .downcast_ref::<LoreError>()
            .map(LoreError::exit_code)
            .unwrap_or(loremaster_core::error::exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    // Open vector store
    let store = VectorStore::open(&config.store.path)?;
    store.initialize()?;

    match cli.command {
        Commands::Collection(args) => commands::collection::run(args, &store, &config).await,
        Commands::Load(args) => commands::load::run(args, &store, &config).await,
        Commands::Ask(args) => commands::ask::run(args, store, config, cli.format).await,
        Commands::Status => commands::status::run(&store, cli.format).await,
    }
}
