//! Color It Daily Store
//!
//! Append-only store of published concepts, kept in two co-indexed SQLite
//! tables sharing the same record id:
//!
//! - `concepts` - full metadata, one row per published production record
//! - `concept_vectors` - the description embedding for similarity search
//!
//! Both rows for one record are written in a single transaction. Nearest-
//! neighbor lookups go through an in-memory HNSW index that is a derived
//! cache: SQLite is the source of truth and the index is rebuilt from the
//! `concept_vectors` table whenever the store is opened.

pub mod concept_store;
pub mod error;
pub mod sqlite;
pub mod vector_index;

pub use concept_store::{ConceptStore, NeighborConcept};
pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteConceptStore;
pub use vector_index::VectorIndex;
