//! Daily Push Migration Job
//!
//! Batch step outside the interactive loop: every concept-store record with
//! `published = false` becomes a row in the relational pages database (plus
//! its tag rows), gets a unique human-readable slug derived from the title,
//! and is then flagged as published back in the concept store. Each record
//! is its own transaction, so one bad record never blocks the rest.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{error, info, warn};

use colorit_core::models::ProductionRecord;
use colorit_store::{SqliteConceptStore, StoreResult};

const COLLECTION_NAME: &str = "color-it-daily";
const COLLECTION_DISPLAY_NAME: &str = "Color It Daily";
const GENERATE_SCRIPT: &str = "colorit-daily::publisher";

const PAGES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL,
    unique_name         TEXT NOT NULL UNIQUE,
    prompt              TEXT NOT NULL,
    full_path           TEXT NOT NULL,
    thumbnail_path      TEXT NOT NULL,
    colored_path        TEXT,
    width               INTEGER NOT NULL,
    height              INTEGER NOT NULL,
    model_name          TEXT NOT NULL,
    prompt_model_name   TEXT NOT NULL,
    generate_script     TEXT,
    collection_name     TEXT NOT NULL,
    upd_collection_name TEXT NOT NULL,
    generated_on        TEXT NOT NULL,
    created_on          TEXT NOT NULL,
    published           INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS page_tags (
    page_id INTEGER NOT NULL,
    tag_id  INTEGER NOT NULL,
    PRIMARY KEY (page_id, tag_id)
);
"#;

/// The relational store the migration job publishes into.
pub struct PagesDb {
    conn: Connection,
}

impl PagesDb {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(PAGES_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(PAGES_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn page_count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

/// Derive the base slug from a page title: lowercase, spaces to hyphens,
/// possessive "'s" dropped. An empty title falls back to "sample".
pub fn slug(title: &str) -> String {
    if title.trim().is_empty() {
        return "sample".to_string();
    }
    title.to_lowercase().replace(' ', "-").replace("'s", "")
}

/// Resolve slug collisions with a numeric suffix: `winter-fox`,
/// `winter-fox-1`, `winter-fox-2`, ...
fn unique_slug(conn: &Connection, base: &str) -> StoreResult<String> {
    let mut stmt = conn.prepare("SELECT unique_name FROM pages WHERE unique_name LIKE ?1")?;
    let existing: std::collections::HashSet<String> = stmt
        .query_map(params![format!("{}%", base)], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    if !existing.contains(base) {
        return Ok(base.to_string());
    }
    let mut count = 1usize;
    loop {
        let candidate = format!("{}-{}", base, count);
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
        count += 1;
    }
}

/// Fetch-or-create ids for a tag list, in order.
fn ensure_tags(conn: &Connection, tags: &[String]) -> StoreResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(tags.len());
    for tag in tags {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![tag])?;
        let id: i64 = conn.query_row("SELECT id FROM tags WHERE name = ?1", params![tag], |r| {
            r.get(0)
        })?;
        ids.push(id);
    }
    Ok(ids)
}

/// Place "thumbnail/" in front of the location's basename.
fn thumbnail_location(location: &str) -> String {
    match location.rfind('/') {
        Some(idx) => format!("{}thumbnail/{}", &location[..idx + 1], &location[idx + 1..]),
        None => format!("thumbnail/{}", location),
    }
}

/// Outcome summary of one job run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PushReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The migration job itself.
pub struct DailyPushJob {
    model_name: String,
    prompt_model_name: String,
}

impl DailyPushJob {
    pub fn new(model_name: String, prompt_model_name: String) -> Self {
        Self {
            model_name,
            prompt_model_name,
        }
    }

    /// Migrate all unpublished records from the concept store into the
    /// pages database.
    pub fn run(
        &self,
        store: &SqliteConceptStore,
        pages: &mut PagesDb,
    ) -> StoreResult<PushReport> {
        let pending = store.unpublished()?;
        if pending.is_empty() {
            info!("no unpublished records found");
            return Ok(PushReport::default());
        }
        info!(count = pending.len(), "migrating unpublished records");

        let mut report = PushReport::default();
        for record in &pending {
            if record.optimized_location.trim().is_empty() {
                warn!(id = %record.id, "skipping record without an optimized artifact");
                report.skipped += 1;
                continue;
            }

            match self.push_one(pages, record) {
                Ok(unique_name) => {
                    // The page row is committed; flag the source record so it
                    // is not migrated again.
                    store.mark_published(&record.id)?;
                    info!(id = %record.id, slug = %unique_name, "record published");
                    report.processed += 1;
                }
                Err(e) => {
                    error!(id = %record.id, error = %e, "failed to publish record");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Insert one page row plus its tag rows, transactionally.
    fn push_one(&self, pages: &mut PagesDb, record: &ProductionRecord) -> StoreResult<String> {
        let tx = pages.conn.transaction()?;

        let unique_name = unique_slug(&tx, &slug(&record.title))?;
        tx.execute(
            "INSERT INTO pages (
                name, unique_name, prompt, full_path, thumbnail_path, colored_path,
                width, height, model_name, prompt_model_name, generate_script,
                collection_name, upd_collection_name, generated_on, created_on, published
             ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 0)",
            params![
                record.title,
                unique_name,
                record.description,
                record.optimized_location,
                thumbnail_location(&record.optimized_location),
                colorit_pipeline::CANVAS_WIDTH,
                colorit_pipeline::CANVAS_HEIGHT,
                self.model_name,
                self.prompt_model_name,
                GENERATE_SCRIPT,
                COLLECTION_DISPLAY_NAME,
                COLLECTION_NAME,
                record.published_date.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let page_id = tx.last_insert_rowid();

        for tag_id in ensure_tags(&tx, &record.visual_tags)? {
            tx.execute(
                "INSERT OR IGNORE INTO page_tags (page_id, tag_id) VALUES (?1, ?2)",
                params![page_id, tag_id],
            )?;
        }

        tx.commit()?;
        Ok(unique_name)
    }
}
