//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the batching helpers the build and query pipelines call, and
//! pure helpers for vector encoding and distance.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the `ragline`
//! app crate.
//!
//! The same provider (same model, same dimensionality) must be used to embed
//! the corpus and the queries against it. Distances between vectors from two
//! different models are meaningless, and the index cannot detect this on its
//! own.

use anyhow::{bail, Result};
use async_trait::async_trait;

/// Trait for embedding providers.
///
/// `embed` maps a batch of texts to one vector per text, in input order.
/// Implementations should treat it as a pure function: no side effects,
/// deterministic up to the model's own floating-point reproducibility.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed `texts` in bounded batches of at most `batch_size`.
///
/// Batches run one after another and the output preserves input order, so
/// `result[i]` is always the embedding of `texts[i]`.
///
/// # Errors
///
/// Fails if `batch_size` is zero, if the provider fails, or if a batch comes
/// back with the wrong number of vectors, a vector of the wrong dimension, or
/// a non-finite component.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    if batch_size == 0 {
        bail!("embedding batch size must be > 0");
    }

    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size) {
        let embedded = provider.embed(batch).await?;
        check_batch(provider, batch.len(), &embedded)?;
        vectors.extend(embedded);
    }
    Ok(vectors)
}

/// Embed a single query text (a one-item batch).
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let results = embed_in_batches(provider, &[text.to_string()], 1).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

fn check_batch(provider: &dyn EmbeddingProvider, expected: usize, got: &[Vec<f32>]) -> Result<()> {
    if got.len() != expected {
        bail!(
            "embedding provider '{}' returned {} vectors for {} inputs",
            provider.model_name(),
            got.len(),
            expected
        );
    }
    if let Some(bad) = got.iter().find(|v| v.len() != provider.dims()) {
        bail!(
            "embedding provider '{}' returned a {}-dimensional vector, expected {}",
            provider.model_name(),
            bad.len(),
            provider.dims()
        );
    }
    if got.iter().flatten().any(|x| !x.is_finite()) {
        bail!(
            "embedding provider '{}' returned a non-finite value",
            provider.model_name()
        );
    }
    Ok(())
}

/// Encode a float vector as little-endian f32 bytes.
///
/// # Example
///
/// ```rust
/// use ragline_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not form a whole `f32`
/// are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Squared Euclidean distance between two vectors of equal length.
///
/// ```text
/// d(a, b) = Σ (aᵢ - bᵢ)²
/// ```
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
