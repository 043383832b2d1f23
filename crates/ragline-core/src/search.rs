//! Top-K retrieval over a [`Corpus`].
//!
//! The retriever embeds the query with the same provider that built the
//! corpus, searches the flat index, and maps row ids back to chunks. Results
//! come back in ascending distance order.
//!
//! # Algorithm
//!
//! 1. Embed the query as a single-item batch.
//! 2. Search the index for the `k` nearest rows (squared L2).
//! 3. Map each row to `corpus.chunks()[row]`.
//!
//! There is no re-ranking, deduplication, or source filtering. With
//! overlapping windows, near-duplicate neighbors of the same region can fill
//! several of the `k` slots for short queries.

use anyhow::Result;

use crate::corpus::Corpus;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::models::RetrievedChunk;

/// Default number of chunks returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Embed `query` and return the `k` closest chunks in `corpus`.
///
/// A blank query returns no results without calling the provider.
///
/// # Errors
///
/// Propagates embedding failures; there is no partial retrieval without a
/// query vector.
pub async fn retrieve(
    corpus: &Corpus,
    provider: &dyn EmbeddingProvider,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let query_vec = embed_query(provider, query).await?;
    rank(corpus, &query_vec, k)
}

/// Rank `corpus` chunks against a precomputed query vector.
pub fn rank(corpus: &Corpus, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
    let hits = corpus.index().search(query_vec, k)?;
    Ok(hits
        .into_iter()
        .filter_map(|(row, distance)| {
            corpus.chunks().get(row).map(|chunk| RetrievedChunk {
                chunk: chunk.clone(),
                row,
                distance,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use async_trait::async_trait;

    fn corpus() -> Corpus {
        let chunks = (0..4)
            .map(|i| Chunk {
                text: format!("chunk {}", i),
                source_path: "doc.md".to_string(),
                chunk_index: i,
            })
            .collect();
        Corpus::from_vectors(
            chunks,
            &[
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![5.0, 5.0],
            ],
            "test",
        )
        .unwrap()
    }

    /// Maps "x,y" to the vector `[x, y]`.
    struct CoordProvider;

    #[async_trait]
    impl EmbeddingProvider for CoordProvider {
        fn model_name(&self) -> &str {
            "coords"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| {
                    t.split(',')
                        .map(|p| Ok(p.trim().parse::<f32>()?))
                        .collect::<Result<Vec<f32>>>()
                })
                .collect()
        }
    }

    #[test]
    fn test_rank_maps_rows_to_chunks() {
        let results = rank(&corpus(), &[0.1, 0.9], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_index, 2);
        assert_eq!(results[0].row, 2);
        assert_eq!(results[1].chunk.chunk_index, 0);
    }

    #[test]
    fn test_rank_non_decreasing() {
        let results = rank(&corpus(), &[2.0, 2.0], 10).unwrap();
        assert_eq!(results.len(), 4);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn test_retrieve_embeds_query() {
        let results = retrieve(&corpus(), &CoordProvider, "4.5, 5.5", 1)
            .await
            .unwrap();
        assert_eq!(results[0].chunk.text, "chunk 3");
        assert!((results[0].distance - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        assert!(retrieve(&corpus(), &CoordProvider, "   ", 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        assert!(retrieve(&corpus(), &CoordProvider, "not a vector", 5)
            .await
            .is_err());
    }
}
