//! The corpus: chunks plus the index built over their embeddings.
//!
//! A [`Corpus`] is produced by one build and consumed read-only by any number
//! of queries. Row `i` of the index is always the embedding of `chunks[i]`.
//! The only way to change a corpus is to build a new one, so this positional
//! correspondence is checked once, in [`Corpus::new`], and never again.

use anyhow::{bail, Result};

use crate::index::FlatIndex;
use crate::models::Chunk;

#[derive(Debug, Clone)]
pub struct Corpus {
    index: FlatIndex,
    chunks: Vec<Chunk>,
    model: String,
}

impl Corpus {
    /// Pair an index with its chunks, embedded with `model`.
    ///
    /// # Errors
    ///
    /// Fails if the index row count differs from the number of chunks.
    pub fn new(index: FlatIndex, chunks: Vec<Chunk>, model: impl Into<String>) -> Result<Self> {
        if index.len() != chunks.len() {
            bail!(
                "index has {} rows but there are {} chunks",
                index.len(),
                chunks.len()
            );
        }
        Ok(Self {
            index,
            chunks,
            model: model.into(),
        })
    }

    /// Embed-free constructor for callers that already hold one vector per
    /// chunk, in chunk order.
    pub fn from_vectors(
        chunks: Vec<Chunk>,
        vectors: &[Vec<f32>],
        model: impl Into<String>,
    ) -> Result<Self> {
        if vectors.len() != chunks.len() {
            bail!(
                "got {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            );
        }
        Self::new(FlatIndex::build(vectors)?, chunks, model)
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Identifier of the embedding model the corpus was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct source documents.
    pub fn source_count(&self) -> usize {
        let mut sources: Vec<&str> = self.chunks.iter().map(|c| c.source_path.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }
}
