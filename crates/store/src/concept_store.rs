//! Concept Store Trait
//!
//! The abstract contract the pipeline depends on: fetch recent history,
//! nearest-neighbor search by description embedding, and the publish write.
//! The SQLite implementation lives in `sqlite`; tests substitute mock
//! implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use colorit_core::models::{HistoryEntry, ProductionRecord};

use crate::error::StoreResult;

/// A prior concept returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborConcept {
    pub id: String,
    pub title: String,
    pub description: String,
    pub visual_tags: Vec<String>,
    /// Cosine distance (1 - cosine similarity); smaller is closer.
    pub distance: f32,
}

/// Append-only store of published concepts.
///
/// Written only by the critique stage's publish step; read by ideation for
/// history and similarity. Implementations must apply the metadata write and
/// the vector-index write for one record as a single atomic unit.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// The `limit` most recently published entries, newest first.
    async fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>>;

    /// The `k` nearest prior concepts by cosine similarity of description
    /// embeddings, closest first.
    async fn nearest(&self, embedding: &[f32], k: usize) -> StoreResult<Vec<NeighborConcept>>;

    /// Persist an approved record (metadata + vector, atomically).
    /// Returns the record id.
    async fn publish(&self, record: &ProductionRecord) -> StoreResult<String>;
}
