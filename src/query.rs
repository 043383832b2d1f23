//! Query pipeline (`ragline query`).
//!
//! Loads the persisted corpus, checks that it was embedded with the model the
//! config names, retrieves the top-K chunks, and hands their text to the
//! synthesizer. The store is loaded before any provider is constructed so a
//! missing or corrupt corpus fails fast.

use anyhow::Result;
use tracing::info;

use ragline_core::corpus::Corpus;
use ragline_core::embedding::EmbeddingProvider;
use ragline_core::models::RetrievedChunk;
use ragline_core::search::retrieve;

use crate::config::{Config, EmbeddingConfig};
use crate::embedding::{configured_model, create_provider};
use crate::error::RaglineError;
use crate::store::CorpusStore;
use crate::synth::synthesize;

/// Run `ragline query`.
pub async fn run_query(
    config: &Config,
    question: &str,
    top_k: Option<usize>,
    show_sources: bool,
    no_answer: bool,
) -> Result<()> {
    let k = top_k.unwrap_or(config.retrieval.top_k);
    if k == 0 {
        return Err(RaglineError::config("--top-k must be >= 1").into());
    }

    let corpus = CorpusStore::new(&config.corpus.store_dir).load()?;
    check_model(&corpus, &config.embedding)?;
    let provider = create_provider(&config.embedding)?;

    let results = query_corpus(&corpus, provider.as_ref(), question, k).await?;
    info!(results = results.len(), k, "retrieved context");

    if !no_answer {
        let context: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        let answer = synthesize(&config.synthesis, question, &context).await;
        println!("{}", answer);
    }

    if show_sources || no_answer {
        if !no_answer {
            println!();
        }
        print_sources(&results);
    }
    Ok(())
}

/// Retrieve the `k` chunks of `corpus` closest to `question`.
///
/// # Errors
///
/// [`RaglineError::ModelMismatch`] if `provider` is not the model the corpus
/// was built with; otherwise propagates embedding failures.
pub async fn query_corpus(
    corpus: &Corpus,
    provider: &dyn EmbeddingProvider,
    question: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    if provider.model_name() != corpus.model() || provider.dims() != corpus.index().dims() {
        return Err(RaglineError::ModelMismatch {
            stored: describe(corpus.model(), corpus.index().dims()),
            configured: describe(provider.model_name(), provider.dims()),
        }
        .into());
    }
    retrieve(corpus, provider, question, k).await
}

/// Compare the stored model with the configured one without building a
/// provider.
pub fn check_model(corpus: &Corpus, embedding: &EmbeddingConfig) -> Result<(), RaglineError> {
    let (model, dims) = configured_model(embedding);
    let dims_differ = dims.is_some_and(|d| d != corpus.index().dims());
    if model != corpus.model() || dims_differ {
        return Err(RaglineError::ModelMismatch {
            stored: describe(corpus.model(), corpus.index().dims()),
            configured: describe(&model, dims.unwrap_or(corpus.index().dims())),
        });
    }
    Ok(())
}

fn describe(model: &str, dims: usize) -> String {
    format!("{} ({} dims)", model, dims)
}

fn print_sources(results: &[RetrievedChunk]) {
    if results.is_empty() {
        println!("No matching chunks.");
        return;
    }
    println!("Sources:");
    for (rank, r) in results.iter().enumerate() {
        println!(
            "  {}. {} #{}  (distance {:.4})",
            rank + 1,
            r.chunk.source_path,
            r.chunk.chunk_index,
            r.distance
        );
    }
}
