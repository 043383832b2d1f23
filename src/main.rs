//! # ragline CLI
//!
//! ## Usage
//!
//! ```bash
//! ragline --config ./config/ragline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragline prepare` | Discover, chunk, embed, and index the corpus |
//! | `ragline query "<question>"` | Retrieve context and generate an answer |
//! | `ragline status` | Show what the corpus store holds |
//!
//! ## Examples
//!
//! ```bash
//! # Build (or rebuild) the corpus
//! ragline prepare --config ./config/ragline.toml
//!
//! # Ask a question and list the chunks the answer was grounded on
//! ragline query "How are chunks persisted?" --sources
//!
//! # Retrieval only, no completion call
//! ragline query "chunk overlap" --top-k 10 --no-answer
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ragline::{config, logging, prepare, query, status};

/// ragline: ask questions over a directory of documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ragline.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ragline",
    about = "ragline: chunk, embed, and index a directory of documents, then ask questions about it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ragline.toml`. Relative paths inside it resolve
    /// against the file's own directory.
    #[arg(long, global = true, default_value = "./config/ragline.toml")]
    config: PathBuf,

    /// Log progress at info level (overridden by RAGLINE_LOG / RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the corpus: discover, chunk, embed, index, persist.
    ///
    /// Replaces any previous corpus only after the new one is fully built.
    Prepare,

    /// Answer a question from the corpus.
    Query {
        /// The question to ask.
        question: String,

        /// Number of chunks to retrieve (default: `[retrieval] top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Also print the retrieved chunks with their distances.
        #[arg(long)]
        sources: bool,

        /// Print the retrieved chunks only; skip answer generation.
        #[arg(long)]
        no_answer: bool,
    },

    /// Show corpus store location, size, model, and build time.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Prepare => {
            prepare::run_prepare(&cfg).await?;
        }
        Commands::Query {
            question,
            top_k,
            sources,
            no_answer,
        } => {
            query::run_query(&cfg, &question, top_k, sources, no_answer).await?;
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
    }

    Ok(())
}
