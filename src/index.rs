//! In-memory vector index.
//!
//! Holds the document's chunks and their embeddings in insertion order.
//! Search is brute-force cosine similarity over every stored vector,
//! which is plenty for a single-document corpus.
//!
//! The index is immutable once built; share it behind an `Arc` and read
//! it from any number of tasks without locking.

use anyhow::{bail, Result};

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ScoredChunk};

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

pub struct VectorIndex {
    entries: Vec<Entry>,
    dims: usize,
}

impl VectorIndex {
    /// Pair chunks with their embeddings.
    ///
    /// # Errors
    ///
    /// - the two inputs differ in length,
    /// - there are no chunks,
    /// - a vector is empty or its dimensionality differs from the first.
    pub fn from_parts(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            bail!(
                "got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            );
        }
        if chunks.is_empty() {
            bail!("cannot build an index from zero chunks");
        }

        let dims = embeddings[0].len();
        if dims == 0 {
            bail!("embedding backend returned an empty vector");
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(embeddings) {
            if vector.len() != dims {
                bail!(
                    "embedding for chunk {} has {} dims, expected {}",
                    chunk.index,
                    vector.len(),
                    dims
                );
            }
            entries.push(Entry { chunk, vector });
        }

        Ok(Self { entries, dims })
    }

    /// Return the `k` chunks most similar to `query`.
    ///
    /// Results are ordered by score descending; equal scores keep chunk
    /// order, so repeated searches always return the same list.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
        }
    }

    fn sample() -> VectorIndex {
        VectorIndex::from_parts(
            vec![
                chunk(0, "rail"),
                chunk(1, "road"),
                chunk(2, "air"),
                chunk(3, "road again"),
            ],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 1.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = sample();
        let hits = index.search(&[0.1, 0.9, 0.0], 2);
        assert_eq!(hits.len(), 2);
        // Equal scores fall back to chunk order.
        assert_eq!(hits[0].chunk.index, 1);
        assert_eq!(hits[1].chunk.index, 3);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_k_clamped_to_corpus() {
        let index = sample();
        assert_eq!(index.search(&[1.0, 1.0, 1.0], 50).len(), 4);
        assert!(index.search(&[1.0, 1.0, 1.0], 0).is_empty());
    }

    #[test]
    fn test_repeated_search_is_stable() {
        let index = sample();
        let q = [0.3, 0.3, 0.3];
        let first: Vec<usize> = index.search(&q, 3).iter().map(|h| h.chunk.index).collect();
        for _ in 0..10 {
            let again: Vec<usize> = index.search(&q, 3).iter().map(|h| h.chunk.index).collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(VectorIndex::from_parts(vec![chunk(0, "a")], vec![]).is_err());
        assert!(VectorIndex::from_parts(vec![], vec![]).is_err());
        assert!(VectorIndex::from_parts(vec![chunk(0, "a")], vec![vec![]]).is_err());
        assert!(VectorIndex::from_parts(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]]
        )
        .is_err());
    }

    #[test]
    fn test_dims_and_len() {
        let index = sample();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dims(), 3);
        assert!(!index.is_empty());
    }
}
