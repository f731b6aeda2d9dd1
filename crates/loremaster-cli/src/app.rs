//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loremaster")]
#[command(
    author,
    version,
    about = "Ask the AD&D 1st-edition rulebooks grounded questions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage collections
    Collection(CollectionArgs),

    /// Load a chunk file into a collection
    Load(LoadArgs),

    /// Ask a question against a collection
    Ask(AskArgs),

    /// Show store status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}

#[derive(Args)]
pub struct CollectionArgs {
    #[command(subcommand)]
    pub action: CollectionAction,
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// List all collections
    List,
    /// Remove a collection
    #[command(alias = "rm")]
    Remove { name: String },
    /// Delete all chunks in a collection
    Truncate {
        name: String,
        /// Delete batch size (pass 100 for strict-quota backends)
        #[arg(long, default_value = "500")]
        batch_size: usize,
    },
    /// Count chunks in a collection
    Count { name: String },
}

#[derive(Args)]
pub struct LoadArgs {
    /// Target collection (created if absent)
    pub collection: String,

    /// JSONL chunk file produced by the preprocessing pipeline
    pub file: PathBuf,

    /// Empty the collection before loading
    #[arg(long)]
    pub truncate_first: bool,

    /// Texts per embedding request
    #[arg(long, default_value = "64")]
    pub embed_batch: usize,
}

#[derive(Args)]
pub struct AskArgs {
    /// Collection to search
    pub collection: String,

    /// The question
    pub question: Vec<String>,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub k: Option<usize>,

    /// Include retrieval diagnostics in the output
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_parses_question_words_and_k() {
        let cli = Cli::try_parse_from([
            "loremaster", "ask", "rulebooks", "owlbear", "hit", "dice", "-k", "5", "--debug",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.collection, "rulebooks");
                assert_eq!(args.question.join(" "), "owlbear hit dice");
                assert_eq!(args.k, Some(5));
                assert!(args.debug);
            }
            _ => panic!("expected ask subcommand"),
        }
    }

    #[test]
    fn collection_truncate_defaults_batch_size() {
        let cli =
            Cli::try_parse_from(["loremaster", "collection", "truncate", "rulebooks"]).unwrap();
        match cli.command {
            Commands::Collection(CollectionArgs {
                action: CollectionAction::Truncate { name, batch_size },
            }) => {
                assert_eq!(name, "rulebooks");
                assert_eq!(batch_size, 500);
            }
            _ => panic!("expected collection truncate"),
        }
    }
}
