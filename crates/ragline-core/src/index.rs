//! Flat (brute-force) vector index with exact k-nearest-neighbor search.
//!
//! Every query is compared against every row under squared Euclidean
//! distance. There is no clustering or quantization, so results are exact.
//! The target corpora are thousands of chunks, not millions.
//!
//! The index is built once from a fixed-size matrix and is read-only
//! afterwards. Its dimensionality is fixed at construction.
//!
//! # Byte format
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────────────┐
//! │ RGLFLAT1 │ dims u32 │ rows u64 │ rows × dims f32 (row-major) │
//! └──────────┴──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! All integers and floats are little-endian.

use anyhow::{bail, Result};

use crate::embedding::{blob_to_vec, squared_l2, vec_to_blob};

const MAGIC: &[u8; 8] = b"RGLFLAT1";
const HEADER_LEN: usize = MAGIC.len() + 4 + 8;

/// An exact nearest-neighbor index over a dense `rows × dims` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from one vector per row.
    ///
    /// Building copies the matrix and does nothing else.
    ///
    /// # Errors
    ///
    /// Fails on an empty input, zero-dimensional vectors, rows whose
    /// dimensions disagree, or any NaN or infinite component.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let dims = match vectors.first() {
            Some(first) => first.len(),
            None => bail!("cannot build an index from zero vectors"),
        };
        if dims == 0 {
            bail!("cannot build an index from zero-dimensional vectors");
        }

        let mut data = Vec::with_capacity(vectors.len() * dims);
        for (row, v) in vectors.iter().enumerate() {
            if v.len() != dims {
                bail!(
                    "vector at row {} has {} dimensions, expected {}",
                    row,
                    v.len(),
                    dims
                );
            }
            if v.iter().any(|x| !x.is_finite()) {
                bail!("vector at row {} has a non-finite component", row);
            }
            data.extend_from_slice(v);
        }

        Ok(Self { dims, data })
    }

    /// Dimensionality of every row.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.len() / self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The stored vector for `row`, if it exists.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dims)?;
        self.data.get(start..start + self.dims)
    }

    /// Return the `k` rows closest to `query`, ascending by squared distance.
    ///
    /// Ties are broken by row id so results are stable across runs. If `k`
    /// exceeds the row count, every row is returned. A NaN distance (only
    /// possible from a non-finite query) sorts after every number.
    ///
    /// # Errors
    ///
    /// Fails if `query` does not have the index's dimensionality.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dims {
            bail!(
                "query vector has {} dimensions, index has {}",
                query.len(),
                self.dims
            );
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(row, v)| (row, squared_l2(query, v)))
            .collect();

        scored.sort_by(|a, b| {
            a.1.is_nan()
                .cmp(&b.1.is_nan())
                .then(a.1.total_cmp(&b.1))
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Serialize into the binary format described in the module docs.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.dims as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&vec_to_blob(&self.data));
        bytes
    }

    /// Deserialize an index written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Fails on a wrong magic header, zero dims, a payload whose length
    /// disagrees with the header, or a non-finite value.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            bail!("not a flat index file (bad header)");
        }

        let mut dims_bytes = [0u8; 4];
        dims_bytes.copy_from_slice(&bytes[8..12]);
        let dims = u32::from_le_bytes(dims_bytes) as usize;

        let mut rows_bytes = [0u8; 8];
        rows_bytes.copy_from_slice(&bytes[12..20]);
        let rows = u64::from_le_bytes(rows_bytes) as usize;

        if dims == 0 {
            bail!("flat index header declares zero dimensions");
        }

        let payload = &bytes[HEADER_LEN..];
        let expected = rows
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| anyhow::anyhow!("flat index header is out of range"))?;
        if payload.len() != expected {
            bail!(
                "flat index payload is {} bytes, header declares {} rows × {} dims ({} bytes)",
                payload.len(),
                rows,
                dims,
                expected
            );
        }

        let data = blob_to_vec(payload);
        if let Some(pos) = data.iter().position(|x| !x.is_finite()) {
            bail!("flat index row {} has a non-finite component", pos / dims);
        }
        Ok(Self { dims, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> FlatIndex {
        FlatIndex::build(&[
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 2.0],
            vec![3.0, 3.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_build_shape() {
        let index = grid();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dims(), 2);
        assert_eq!(index.row(2), Some(&[0.0, 2.0][..]));
        assert_eq!(index.row(4), None);
    }

    #[test]
    fn test_build_rejects_bad_input() {
        assert!(FlatIndex::build(&[]).is_err());
        assert!(FlatIndex::build(&[vec![]]).is_err());
        assert!(FlatIndex::build(&[vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(FlatIndex::build(&[vec![1.0, 2.0], vec![f32::NAN, 0.0]]).is_err());
        assert!(FlatIndex::build(&[vec![f32::INFINITY, 0.0]]).is_err());
    }

    #[test]
    fn test_search_orders_nan_distances_last() {
        // Rows that bypass `build`, as a hand-edited index file might.
        let mut data = Vec::new();
        for row in 0..64 {
            if row % 3 == 0 {
                data.extend_from_slice(&[f32::NAN, 0.0]);
            } else {
                data.extend_from_slice(&[row as f32, 0.0]);
            }
        }
        let index = FlatIndex { dims: 2, data };

        let results = index.search(&[0.0, 0.0], 64).unwrap();
        assert_eq!(results.len(), 64);
        let finite: Vec<usize> = results
            .iter()
            .take_while(|r| !r.1.is_nan())
            .map(|r| r.0)
            .collect();
        let expected: Vec<usize> = (0..64).filter(|r| r % 3 != 0).collect();
        assert_eq!(finite, expected);
        assert!(results[finite.len()..].iter().all(|r| r.1.is_nan()));
    }

    #[test]
    fn test_search_infinite_query_does_not_panic() {
        let results = grid().search(&[f32::INFINITY, f32::NEG_INFINITY], 4).unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_search_ascending_exact() {
        let results = grid().search(&[0.9, 0.1], 4).unwrap();
        let rows: Vec<usize> = results.iter().map(|r| r.0).collect();
        assert_eq!(rows, vec![1, 0, 2, 3]);
        assert!((results[0].1 - 0.02).abs() < 1e-6);
        for pair in results.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn test_search_k_larger_than_rows() {
        let results = grid().search(&[0.0, 0.0], 100).unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_search_k_zero() {
        assert!(grid().search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_ties_broken_by_row() {
        let index = FlatIndex::build(&[vec![1.0], vec![-1.0], vec![1.0]]).unwrap();
        let rows: Vec<usize> = index
            .search(&[0.0], 3)
            .unwrap()
            .iter()
            .map(|r| r.0)
            .collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_dimension_mismatch() {
        assert!(grid().search(&[1.0, 2.0, 3.0], 1).is_err());
    }

    #[test]
    fn test_bytes_roundtrip_is_query_equivalent() {
        let index = grid();
        let restored = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(restored, index);
        for q in [[0.0, 0.0], [2.5, 2.5], [-1.0, 4.0]] {
            assert_eq!(index.search(&q, 3).unwrap(), restored.search(&q, 3).unwrap());
        }
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(FlatIndex::from_bytes(b"nope").is_err());
        assert!(FlatIndex::from_bytes(b"NOTFLAT1\x02\0\0\0\x01\0\0\0\0\0\0\0").is_err());

        let mut truncated = grid().to_bytes();
        truncated.pop();
        assert!(FlatIndex::from_bytes(&truncated).is_err());

        let mut poisoned = grid().to_bytes();
        let last = poisoned.len() - 4;
        poisoned[last..].copy_from_slice(&f32::NAN.to_le_bytes());
        assert!(FlatIndex::from_bytes(&poisoned).is_err());
    }
}
