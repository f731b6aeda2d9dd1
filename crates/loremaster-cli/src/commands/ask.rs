//! Ask command

use crate::app::{AskArgs, OutputFormat};
use anyhow::Result;
use loremaster_core::{Config, HttpEmbedder, OpenAiClient, RagEngine, VectorStore};
use std::sync::Arc;

pub async fn run(
    args: AskArgs,
    store: VectorStore,
    config: Config,
    format: OutputFormat,
) -> Result<()> {
    let question = args.question.join(" ");
    if question.trim().is_empty() {
        anyhow::bail!("empty question");
    }

    let client = Arc::new(OpenAiClient::new(config.llm_service.clone())?);
    let embedder = Arc::new(HttpEmbedder::new(client.clone()));
    let engine = RagEngine::new(store, embedder, client, config);

    let output = engine
        .query(&question, &args.collection, args.k, args.debug)
        .await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Cli => {
            match &output.answer {
                Some(answer) => println!("{}", answer),
                None => println!("(no answer)"),
            }
            for error in &output.errors {
                eprintln!("error: {}", error);
            }
            if args.debug {
                for diagnostic in &output.diagnostics {
                    eprintln!("note: {}", diagnostic);
                }
            }
            eprintln!(
                "[{} chunks, {} tokens ({} prompt / {} completion), {} ms]",
                output.meta.context_chunks,
                output.usage.total_tokens,
                output.usage.prompt_tokens,
                output.usage.completion_tokens,
                output.meta.elapsed_ms
            );
        }
    }

    Ok(())
}
