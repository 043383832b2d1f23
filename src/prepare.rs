//! Corpus build pipeline (`ragline prepare`).
//!
//! ```text
//! discover ──▶ chunk ──▶ embed (batched) ──▶ FlatIndex ──▶ CorpusStore
//! ```
//!
//! The build is all-or-nothing: every chunk is embedded before anything is
//! written, and the store replaces the previous pair only once both new
//! artifacts are staged. A failed build leaves the previous corpus in place.

use anyhow::Result;
use tracing::info;

use ragline_core::chunk::chunk_document;
use ragline_core::corpus::Corpus;
use ragline_core::embedding::{embed_in_batches, EmbeddingProvider};
use ragline_core::models::{Chunk, Document};

use crate::config::Config;
use crate::discover::discover_corpus;
use crate::embedding::create_provider;
use crate::error::RaglineError;
use crate::store::CorpusStore;

/// Run `ragline prepare`: build the corpus and persist it.
pub async fn run_prepare(config: &Config) -> Result<()> {
    // Discovery first, so an empty corpus fails before any provider setup.
    let documents = collect_documents(config)?;
    let provider = create_provider(&config.embedding)?;

    let corpus = index_documents(config, provider.as_ref(), &documents).await?;
    let store = CorpusStore::new(&config.corpus.store_dir);
    store.persist(&corpus)?;

    println!("prepare");
    println!("  documents: {}", documents.len());
    println!("  chunks: {}", corpus.len());
    println!(
        "  model: {} ({} dims)",
        corpus.model(),
        corpus.index().dims()
    );
    println!("  store: {}", store.dir().display());
    println!("ok");
    Ok(())
}

/// Discover documents for the configured corpus.
///
/// # Errors
///
/// [`RaglineError::NoDocuments`] if discovery yields nothing.
pub fn collect_documents(config: &Config) -> Result<Vec<Document>> {
    let documents = discover_corpus(&config.corpus)?;
    if documents.is_empty() {
        return Err(RaglineError::NoDocuments {
            root: config.corpus.root.clone(),
        }
        .into());
    }
    info!(count = documents.len(), "documents discovered");
    Ok(documents)
}

/// Chunk every document, preserving document order and window order.
pub fn chunk_documents(config: &Config, documents: &[Document]) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for doc in documents {
        chunks.extend(chunk_document(
            doc,
            config.chunking.size,
            config.chunking.overlap,
        )?);
    }
    Ok(chunks)
}

/// Chunk and embed `documents` into an in-memory [`Corpus`].
pub async fn index_documents(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    documents: &[Document],
) -> Result<Corpus> {
    let chunks = chunk_documents(config, documents)?;
    if chunks.is_empty() {
        return Err(RaglineError::NoDocuments {
            root: config.corpus.root.clone(),
        }
        .into());
    }
    info!(
        chunks = chunks.len(),
        model = provider.model_name(),
        batch_size = config.embedding.batch_size,
        "embedding chunks"
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_in_batches(provider, &texts, config.embedding.batch_size).await?;

    Corpus::from_vectors(chunks, &vectors, provider.model_name())
}

/// Discover, chunk, and embed the configured corpus without persisting it.
pub async fn build_corpus(config: &Config, provider: &dyn EmbeddingProvider) -> Result<Corpus> {
    let documents = collect_documents(config)?;
    index_documents(config, provider, &documents).await
}
