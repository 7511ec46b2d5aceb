//! Flat nearest-neighbour index over embedding vectors.
//!
//! Vectors live in one contiguous row-major buffer; chunk `i` pairs with
//! row `i`. Search is exhaustive squared-L2, scored as `1 / (1 + d)`.

use crate::index::{self, IndexMeta, IndexPaths};
use crate::types::{DocumentChunk, IndexEntry, RetrievalResult};
use docent_core::{AppError, AppResult};
use std::path::Path;

/// In-memory vector store with exact search.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<f32>,
    chunks: Vec<DocumentChunk>,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension` values.
    pub fn new(dimension: usize) -> AppResult<Self> {
        if dimension == 0 {
            return Err(AppError::Config(
                "vector index dimension must be positive".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            vectors: Vec::new(),
            chunks: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    /// Append entries in order.
    ///
    /// Every vector is checked before anything is stored, so a length
    /// mismatch or a non-finite component leaves the index untouched.
    pub fn add(&mut self, entries: Vec<IndexEntry>) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != self.dimension)
        {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.embedding.len(),
            });
        }

        if let Some(bad) = entries.iter().find(|e| !is_finite(&e.embedding)) {
            return Err(AppError::InvalidVector(format!(
                "embedding for chunk {} contains NaN or infinite values",
                bad.chunk.id
            )));
        }

        self.vectors.reserve(entries.len() * self.dimension);
        self.chunks.reserve(entries.len());
        for entry in entries {
            self.vectors.extend_from_slice(&entry.embedding);
            self.chunks.push(entry.chunk);
        }

        tracing::debug!("Vector index now holds {} items", self.chunks.len());
        Ok(())
    }

    /// Return the `k` nearest chunks, best first.
    ///
    /// `k` is clamped to the number of stored items. Equal distances keep
    /// insertion order. Scores stay within `(0, 1]` even for very distant
    /// vectors.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievalResult>> {
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if !is_finite(query) {
            return Err(AppError::InvalidVector(
                "query contains NaN or infinite values".to_string(),
            ));
        }

        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut distances: Vec<(usize, f64)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| squared_l2(row, query))
            .enumerate()
            .collect();

        distances.sort_by(|a, b| a.1.total_cmp(&b.1));
        distances.truncate(k.min(self.len()));

        Ok(distances
            .into_iter()
            .map(|(position, distance)| RetrievalResult {
                chunk: self.chunks[position].clone(),
                score: score(distance),
            })
            .collect())
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.vectors.clear();
        self.chunks.clear();
    }

    /// Persist the index as three artifacts named `name` under `dir`.
    pub fn save(&self, dir: &Path, name: &str) -> AppResult<IndexMeta> {
        let paths = IndexPaths::new(dir, name);
        let meta = index::write_index(&paths, self.dimension, &self.vectors, &self.chunks)?;

        tracing::info!("Saved vector index '{}' ({} items) to {:?}", name, meta.count, dir);
        Ok(meta)
    }

    /// Restore an index saved with [`VectorIndex::save`].
    pub fn load(dir: &Path, name: &str) -> AppResult<Self> {
        let stored = index::read_index(&IndexPaths::new(dir, name))?;

        if stored.meta.dimension == 0 {
            return Err(AppError::Integrity(
                "Index metadata records dimension 0".to_string(),
            ));
        }

        if !is_finite(&stored.vectors) {
            return Err(AppError::Integrity(
                "Stored vectors contain NaN or infinite values".to_string(),
            ));
        }

        tracing::info!(
            "Loaded vector index '{}' ({} items, dimension {})",
            name,
            stored.meta.count,
            stored.meta.dimension
        );

        Ok(Self {
            dimension: stored.meta.dimension,
            vectors: stored.vectors,
            chunks: stored.chunks,
        })
    }
}

fn is_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

// Accumulated in f64 so that large finite components cannot overflow.
fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum()
}

fn score(distance: f64) -> f32 {
    ((1.0 / (1.0 + distance)) as f32).max(f32::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(text: &str, index: usize, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            embedding,
            DocumentChunk::new("doc.txt", index, None, text.to_string()),
        )
    }

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new(3).unwrap();
        index
            .add(vec![
                entry("x axis", 0, vec![1.0, 0.0, 0.0]),
                entry("y axis", 1, vec![0.0, 1.0, 0.0]),
                entry("z axis", 2, vec![0.0, 0.0, 1.0]),
                entry("diagonal", 3, vec![0.5, 0.5, 0.0]),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(VectorIndex::new(0), Err(AppError::Config(_))));
    }

    #[test]
    fn test_add_rejects_wrong_length_atomically() {
        let mut index = VectorIndex::new(3).unwrap();
        let result = index.add(vec![
            entry("ok", 0, vec![1.0, 0.0, 0.0]),
            entry("bad", 1, vec![1.0, 0.0]),
        ]);

        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_add_rejects_non_finite_atomically() {
        let mut index = VectorIndex::new(3).unwrap();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let result = index.add(vec![
                entry("ok", 0, vec![1.0, 0.0, 0.0]),
                entry("bad", 1, vec![0.0, bad, 0.0]),
            ]);
            assert!(matches!(result, Err(AppError::InvalidVector(_))));
        }
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_rejects_non_finite_query() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[f32::NAN, 0.0, 0.0], 1),
            Err(AppError::InvalidVector(_))
        ));
        assert!(matches!(
            index.search(&[0.0, f32::INFINITY, 0.0], 1),
            Err(AppError::InvalidVector(_))
        ));
    }

    #[test]
    fn test_distant_vectors_keep_positive_ordered_scores() {
        let mut index = VectorIndex::new(2).unwrap();
        index
            .add(vec![
                entry("far", 0, vec![f32::MAX, f32::MAX]),
                entry("farther", 1, vec![-f32::MAX, -f32::MAX]),
                entry("near", 2, vec![1.0e20, 0.0]),
            ])
            .unwrap();

        let results = index.search(&[-f32::MAX, f32::MAX], 3).unwrap();
        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(result.score.is_finite());
            assert!(result.score > 0.0 && result.score <= 1.0);
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_add_empty_is_noop() {
        let mut index = VectorIndex::new(3).unwrap();
        index.add(Vec::new()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(3).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_query_dimension_checked() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(AppError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_k_larger_than_store_is_clamped() {
        let index = sample_index();
        let results = index.search(&[0.9, 0.1, 0.0], 10).unwrap();

        assert_eq!(results.len(), 4);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for result in &results {
            assert!(result.score > 0.0 && result.score <= 1.0);
        }
    }

    #[test]
    fn test_identical_vector_scores_one() {
        let index = sample_index();
        let results = index.search(&[0.0, 0.0, 1.0], 1).unwrap();

        assert_eq!(results[0].chunk.text, "z axis");
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = sample_index();
        // Equidistant from the x and y axes.
        let results = index.search(&[0.0, 0.0, 0.0], 4).unwrap();

        let order: Vec<_> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(order, vec!["diagonal", "x axis", "y axis", "z axis"]);
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let index = sample_index();
        index.save(temp.path(), "vector_store").unwrap();

        let loaded = VectorIndex::load(temp.path(), "vector_store").unwrap();
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.len(), 4);

        for query in [[0.9, 0.1, 0.0], [0.2, 0.2, 0.7], [-1.0, 0.5, 0.3]] {
            let before = index.search(&query, 3).unwrap();
            let after = loaded.search(&query, 3).unwrap();
            assert_eq!(before.len(), after.len());
            for (a, b) in before.iter().zip(&after) {
                assert_eq!(a.chunk.id, b.chunk.id);
                assert!((a.score - b.score).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_load_missing_store() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            VectorIndex::load(temp.path(), "absent"),
            Err(AppError::Integrity(_))
        ));
    }
}
