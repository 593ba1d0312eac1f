//! SQLite Concept Store
//!
//! `ConceptStore` implementation over two co-indexed tables:
//!
//! - `concepts` - full production record metadata, keyed by record id
//! - `concept_vectors` - the description embedding, same key
//!
//! A publish writes both rows in one transaction, then updates the in-memory
//! HNSW index. On open the index is rebuilt by scanning `concept_vectors`,
//! so SQLite stays the single source of truth.
//!
//! The migration job additionally reads full unpublished records and flips
//! their `published` flag; those operations live on the concrete type, not
//! the `ConceptStore` trait, because only the batch job needs them.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use colorit_core::models::{
    CompositionStrategy, CritiqueStatus, HistoryEntry, ProductionRecord,
};

use crate::concept_store::{ConceptStore, NeighborConcept};
use crate::error::{StoreError, StoreResult};
use crate::vector_index::VectorIndex;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS concepts (
    id                   TEXT PRIMARY KEY,
    title                TEXT NOT NULL,
    description          TEXT NOT NULL,
    visual_tags          TEXT NOT NULL,
    mood                 TEXT NOT NULL,
    target_audience      TEXT NOT NULL,
    composition_strategy TEXT NOT NULL,
    positive_prompt      TEXT NOT NULL,
    negative_prompt      TEXT NOT NULL,
    raw_location         TEXT NOT NULL,
    optimized_location   TEXT NOT NULL,
    status               TEXT NOT NULL,
    feedback             TEXT NOT NULL,
    published            INTEGER NOT NULL DEFAULT 0,
    published_date       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS concept_vectors (
    id             TEXT PRIMARY KEY,
    embedding      BLOB NOT NULL,
    published_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_concepts_published ON concepts(published);
CREATE INDEX IF NOT EXISTS idx_concepts_published_date ON concepts(published_date);
"#;

/// SQLite-backed concept store with an in-memory similarity index.
pub struct SqliteConceptStore {
    conn: Mutex<Connection>,
    index: VectorIndex,
}

impl SqliteConceptStore {
    /// Open (or create) a store at `path` and rebuild the vector index.
    pub fn open(path: impl AsRef<Path>, dimension: usize) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn, dimension)
    }

    /// In-memory store, for tests.
    pub fn in_memory(dimension: usize) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, dimension)
    }

    fn initialize(conn: Connection, dimension: usize) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        let index = VectorIndex::new(dimension);

        let mut indexed = 0usize;
        {
            let mut stmt =
                conn.prepare("SELECT id, embedding FROM concept_vectors ORDER BY rowid")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;
            for row in rows {
                let (id, blob) = row?;
                let embedding = decode_embedding(&blob)?;
                index.insert(&id, &embedding)?;
                indexed += 1;
            }
        }
        info!(indexed, dimension, "concept store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            index,
        })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::internal("connection lock poisoned"))
    }

    /// All records not yet migrated to the relational store, oldest first.
    pub fn unpublished(&self) -> StoreResult<Vec<ProductionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.title, c.description, c.visual_tags, c.mood,
                    c.target_audience, c.composition_strategy, c.positive_prompt,
                    c.negative_prompt, c.raw_location, c.optimized_location,
                    c.status, c.feedback, c.published, c.published_date, v.embedding
             FROM concepts c
             JOIN concept_vectors v ON v.id = c.id
             WHERE c.published = 0
             ORDER BY c.published_date ASC, c.rowid ASC",
        )?;
        let rows = stmt.query_map([], record_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    /// Flip the `published` flag after successful migration.
    pub fn mark_published(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE concepts SET published = 1 WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found(format!("record {}", id)));
        }
        Ok(())
    }

    /// Total number of stored records.
    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM concepts", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl ConceptStore for SqliteConceptStore {
    async fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT title, visual_tags, composition_strategy
             FROM concepts
             ORDER BY published_date DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (title, tags_json, strategy) = row?;
            entries.push(HistoryEntry {
                title,
                visual_tags: serde_json::from_str(&tags_json)?,
                composition_strategy: strategy.parse::<CompositionStrategy>().ok(),
            });
        }
        Ok(entries)
    }

    async fn nearest(&self, embedding: &[f32], k: usize) -> StoreResult<Vec<NeighborConcept>> {
        let hits = self.index.search(embedding, k)?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        // Batch fetch metadata for the matched ids, preserving distance order.
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT title, description, visual_tags FROM concepts WHERE id = ?1",
        )?;

        let mut neighbors = Vec::with_capacity(hits.len());
        for (id, distance) in hits {
            let found = stmt
                .query_row(params![id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            if let Some((title, description, tags_json)) = found {
                neighbors.push(NeighborConcept {
                    id,
                    title,
                    description,
                    visual_tags: serde_json::from_str(&tags_json)?,
                    distance,
                });
            }
        }
        Ok(neighbors)
    }

    async fn publish(&self, record: &ProductionRecord) -> StoreResult<String> {
        if record.embedding.len() != self.index.dimension() {
            return Err(StoreError::index(format!(
                "record embedding has {} dimensions, index expects {}",
                record.embedding.len(),
                self.index.dimension()
            )));
        }

        let published_date = record.published_date.to_rfc3339();
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO concepts (
                    id, title, description, visual_tags, mood, target_audience,
                    composition_strategy, positive_prompt, negative_prompt,
                    raw_location, optimized_location, status, feedback,
                    published, published_date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.id,
                    record.title,
                    record.description,
                    serde_json::to_string(&record.visual_tags)?,
                    record.mood,
                    record.target_audience,
                    record.composition_strategy.to_string(),
                    record.positive_prompt,
                    serde_json::to_string(&record.negative_prompt)?,
                    record.raw_location,
                    record.optimized_location,
                    status_str(record.status),
                    record.feedback,
                    record.published as i64,
                    published_date,
                ],
            )?;
            tx.execute(
                "INSERT INTO concept_vectors (id, embedding, published_date)
                 VALUES (?1, ?2, ?3)",
                params![record.id, encode_embedding(&record.embedding), published_date],
            )?;
            tx.commit()?;
        }

        // SQLite is committed; the index is a derived cache and can always be
        // rebuilt on the next open if this insert were to fail.
        self.index.insert(&record.id, &record.embedding)?;
        debug!(id = %record.id, title = %record.title, "published production record");
        Ok(record.id.clone())
    }
}

// ---------------------------------------------------------------------------
// Row mapping and blob encoding
// ---------------------------------------------------------------------------

fn status_str(status: CritiqueStatus) -> &'static str {
    match status {
        CritiqueStatus::Pass => "PASS",
        CritiqueStatus::Reject => "REJECT",
    }
}

fn parse_status(s: &str) -> StoreResult<CritiqueStatus> {
    match s {
        "PASS" => Ok(CritiqueStatus::Pass),
        "REJECT" => Ok(CritiqueStatus::Reject),
        other => Err(StoreError::corrupt(format!("unknown status: {}", other))),
    }
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(format!("bad timestamp {}: {}", s, e)))
}

/// Encode an embedding as little-endian f32 bytes.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into an embedding.
pub fn decode_embedding(bytes: &[u8]) -> StoreResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::corrupt(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

type RecordRowResult = StoreResult<ProductionRecord>;

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<RecordRowResult> {
    let visual_tags_json: String = row.get(3)?;
    let strategy: String = row.get(6)?;
    let negative_json: String = row.get(8)?;
    let status: String = row.get(11)?;
    let published: i64 = row.get(13)?;
    let published_date: String = row.get(14)?;
    let embedding_blob: Vec<u8> = row.get(15)?;

    let build = || -> RecordRowResult {
        Ok(ProductionRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            visual_tags: serde_json::from_str(&visual_tags_json)?,
            mood: row.get(4)?,
            target_audience: row.get(5)?,
            composition_strategy: strategy
                .parse::<CompositionStrategy>()
                .map_err(|e| StoreError::corrupt(e.to_string()))?,
            positive_prompt: row.get(7)?,
            negative_prompt: serde_json::from_str(&negative_json)?,
            raw_location: row.get(9)?,
            optimized_location: row.get(10)?,
            status: parse_status(&status)?,
            feedback: row.get(12)?,
            published_date: parse_timestamp(&published_date)?,
            embedding: decode_embedding(&embedding_blob)?,
            published: published != 0,
        })
    };
    Ok(build())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DIM: usize = 8;

    fn unit_vector(hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[hot] = 1.0;
        v
    }

    fn sample_record(id: &str, hot: usize, day: u32) -> ProductionRecord {
        ProductionRecord {
            id: id.to_string(),
            title: format!("Record {}", id),
            description: format!("Description for {}", id),
            visual_tags: vec!["cute".to_string(), "sticker".to_string()],
            mood: "Playful".to_string(),
            target_audience: "child".to_string(),
            composition_strategy: CompositionStrategy::Sticker,
            positive_prompt: "positive".to_string(),
            negative_prompt: vec!["shading".to_string()],
            raw_location: format!("/data/raw/{}.png", id),
            optimized_location: format!("/data/optimized/{}.png", id),
            status: CritiqueStatus::Pass,
            feedback: "Excellent.".to_string(),
            published_date: Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap(),
            embedding: unit_vector(hot),
            published: false,
        }
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let embedding = vec![0.5, -1.25, 3.0];
        let decoded = decode_embedding(&encode_embedding(&embedding)).unwrap();
        assert_eq!(decoded, embedding);
    }

    #[test]
    fn test_decode_embedding_rejects_ragged_blob() {
        assert!(decode_embedding(&[1, 2, 3]).is_err());
    }

    #[tokio::test]
    async fn test_publish_writes_both_rows_atomically() {
        let store = SqliteConceptStore::in_memory(DIM).unwrap();
        let record = sample_record("abc-123", 0, 1);
        store.publish(&record).await.unwrap();

        let conn = store.lock().unwrap();
        let concepts: i64 = conn
            .query_row("SELECT COUNT(*) FROM concepts", [], |r| r.get(0))
            .unwrap();
        let vectors: i64 = conn
            .query_row("SELECT COUNT(*) FROM concept_vectors", [], |r| r.get(0))
            .unwrap();
        assert_eq!((concepts, vectors), (1, 1));
    }

    #[tokio::test]
    async fn test_publish_rejects_wrong_dimension() {
        let store = SqliteConceptStore::in_memory(DIM).unwrap();
        let mut record = sample_record("abc-123", 0, 1);
        record.embedding = vec![1.0, 2.0];
        assert!(store.publish(&record).await.is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recent_returns_newest_first_with_limit() {
        let store = SqliteConceptStore::in_memory(DIM).unwrap();
        store.publish(&sample_record("a", 0, 1)).await.unwrap();
        store.publish(&sample_record("b", 1, 2)).await.unwrap();
        store.publish(&sample_record("c", 2, 3)).await.unwrap();

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].title, "Record c");
        assert_eq!(recent[1].title, "Record b");
        assert_eq!(
            recent[0].composition_strategy,
            Some(CompositionStrategy::Sticker)
        );
    }

    #[tokio::test]
    async fn test_nearest_returns_closest_with_metadata() {
        let store = SqliteConceptStore::in_memory(DIM).unwrap();
        store.publish(&sample_record("a", 0, 1)).await.unwrap();
        store.publish(&sample_record("b", 1, 2)).await.unwrap();

        let neighbors = store.nearest(&unit_vector(1), 1).await.unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].id, "b");
        assert_eq!(neighbors[0].title, "Record b");
        assert!(neighbors[0].distance < 0.01);
    }

    #[tokio::test]
    async fn test_index_rebuilt_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concepts.db");
        {
            let store = SqliteConceptStore::open(&path, DIM).unwrap();
            store.publish(&sample_record("a", 3, 1)).await.unwrap();
        }

        let reopened = SqliteConceptStore::open(&path, DIM).unwrap();
        let neighbors = reopened.nearest(&unit_vector(3), 1).await.unwrap();
        assert_eq!(neighbors[0].id, "a");
    }

    #[tokio::test]
    async fn test_unpublished_and_mark_published() {
        let store = SqliteConceptStore::in_memory(DIM).unwrap();
        store.publish(&sample_record("a", 0, 1)).await.unwrap();
        store.publish(&sample_record("b", 1, 2)).await.unwrap();

        let pending = store.unpublished().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "a"); // oldest first
        assert_eq!(pending[0].embedding, unit_vector(0));

        store.mark_published("a").unwrap();
        let pending = store.unpublished().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");

        assert!(store.mark_published("missing").is_err());
    }
}
