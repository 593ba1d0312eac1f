//! HNSW Vector Index
//!
//! Wraps the `hnsw_rs` crate for approximate nearest neighbor search over
//! description embeddings. The index is a derived cache: it is rebuilt from
//! the `concept_vectors` table on open, so nothing here is persisted.
//!
//! Record ids are strings; `hnsw_rs` addresses points by `usize`, so a slot
//! table maps insertion order to record id.

use std::sync::RwLock;

use hnsw_rs::prelude::*;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// HNSW tuning parameters. The corpus grows by one record per day, so the
/// defaults are sized for years of headroom rather than throughput.
const MAX_NB_CONNECTION: usize = 24;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;
const MAX_ELEMENTS: usize = 100_000;

/// Newtype wrapper so the index can be shared across threads.
struct HnswInner {
    hnsw: Hnsw<'static, f32, DistCosine>,
}

// SAFETY: hnsw_rs::Hnsw<'static, f32, DistCosine> uses Arc-based internal
// storage and is safe to share across threads. All data is owned because the
// graph is only ever created via `Hnsw::new` (never loaded from borrowed IO).
unsafe impl Send for HnswInner {}
unsafe impl Sync for HnswInner {}

/// Thread-safe cosine-distance nearest neighbor index keyed by record id.
pub struct VectorIndex {
    dimension: usize,
    inner: HnswInner,
    /// Slot -> record id, in insertion order.
    slots: RwLock<Vec<String>>,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        let hnsw = Hnsw::<f32, DistCosine>::new(
            MAX_NB_CONNECTION,
            MAX_ELEMENTS,
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine,
        );
        Self {
            dimension,
            inner: HnswInner { hnsw },
            slots: RwLock::new(Vec::new()),
        }
    }

    /// The expected vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .map(|slots| slots.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a vector under a record id.
    pub fn insert(&self, record_id: &str, embedding: &[f32]) -> StoreResult<()> {
        self.check_dimension(embedding)?;
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StoreError::internal("vector index lock poisoned"))?;
        let slot = slots.len();
        slots.push(record_id.to_string());
        self.inner.hnsw.insert_slice((embedding, slot));
        debug!(record_id, slot, "indexed embedding");
        Ok(())
    }

    /// The `k` nearest record ids with their cosine distance, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> StoreResult<Vec<(String, f32)>> {
        self.check_dimension(query)?;
        let slots = self
            .slots
            .read()
            .map_err(|_| StoreError::internal("vector index lock poisoned"))?;
        if slots.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let ef = EF_SEARCH.max(k * 2);
        let neighbours = self.inner.hnsw.search(query, k, ef);

        let mut results: Vec<(String, f32)> = neighbours
            .into_iter()
            .filter_map(|n| slots.get(n.d_id).map(|id| (id.clone(), n.distance)))
            .collect();
        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    fn check_dimension(&self, vector: &[f32]) -> StoreResult<()> {
        if vector.len() != self.dimension {
            return Err(StoreError::index(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vector(dimension: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn test_empty_index_returns_no_results() {
        let index = VectorIndex::new(8);
        assert!(index.is_empty());
        let results = index.search(&unit_vector(8, 0), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_insert_and_search_nearest() {
        let index = VectorIndex::new(8);
        for i in 0..4 {
            index
                .insert(&format!("rec-{}", i), &unit_vector(8, i))
                .unwrap();
        }

        let results = index.search(&unit_vector(8, 2), 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "rec-2");
        assert!(results[0].1 < 0.01, "exact match should have ~zero distance");
    }

    #[test]
    fn test_search_results_sorted_by_distance() {
        let index = VectorIndex::new(4);
        index.insert("exact", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.insert("close", &[0.9, 0.1, 0.0, 0.0]).unwrap();
        index.insert("far", &[0.0, 0.0, 1.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(results[0].0, "exact");
        assert_eq!(results[1].0, "close");
        assert!(results[0].1 <= results[1].1);
        assert!(results[1].1 <= results[2].1);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let index = VectorIndex::new(8);
        assert!(index.insert("bad", &[1.0, 2.0]).is_err());
        assert!(index.search(&[1.0, 2.0], 3).is_err());
    }
}
