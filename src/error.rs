//! Typed errors for the build and query pipelines.
//!
//! Command plumbing propagates these through `anyhow`, so callers (and tests)
//! that care about the kind of failure can `downcast_ref::<RaglineError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaglineError {
    /// Missing or invalid configuration, including missing credentials.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Discovery found nothing to index.
    #[error("no documents found under {} (check [corpus] root and extensions)", root.display())]
    NoDocuments { root: PathBuf },

    /// One or both corpus store artifacts are absent.
    #[error("corpus not built: no index found in {}. Run `ragline prepare` first.", dir.display())]
    CorpusNotBuilt { dir: PathBuf },

    /// The corpus store artifacts exist but disagree with each other.
    #[error("corpus store is corrupt: {0}. Run `ragline prepare` to rebuild it.")]
    CorpusCorruption(String),

    /// The corpus was embedded with a different model than the one configured.
    #[error(
        "corpus was built with embedding model '{stored}' but '{configured}' is configured. \
         Run `ragline prepare` to rebuild it."
    )]
    ModelMismatch { stored: String, configured: String },

    /// A single file could not be read as text. Logged and skipped.
    #[error("could not read {}: {reason}", path.display())]
    DocumentRead { path: PathBuf, reason: String },

    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    #[error("answer generation failed: {0}")]
    SynthesisService(String),
}

impl RaglineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
