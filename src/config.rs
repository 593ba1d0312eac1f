//! Application Configuration
//!
//! One explicit `AppConfig` built from the environment at startup and passed
//! into every component constructor. Components never read ambient global
//! state; a missing required variable is a startup error, never a panic.

use std::path::PathBuf;

use thiserror::Error;

use colorit_pipeline::DEFAULT_MAX_CYCLES;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the application needs, resolved once.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key (required)
    pub gemini_api_key: String,
    /// Chat/critique model
    pub gemini_model: String,
    /// Image generation model
    pub gemini_image_model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Embedding vector dimension
    pub embedding_dimension: usize,

    /// Root directory for artifacts and databases
    pub data_dir: PathBuf,

    /// Recent records shown to the creative director
    pub history_limit: usize,
    /// Neighbors checked by the de-duplication gate
    pub neighbor_count: usize,
    /// Cosine distance below which the duplicate judgment runs
    pub similarity_threshold: f32,
    /// Brainstorm attempt cap
    pub max_brainstorm_attempts: usize,
    /// Production loop cycle bound
    pub max_cycles: usize,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_model: var_or("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_image_model: var_or("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            embedding_model: var_or("GEMINI_EMBEDDING_MODEL", "text-embedding-004"),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", 768)?,
            data_dir: PathBuf::from(var_or("COLORIT_DATA_DIR", "./data")),
            history_limit: parse_or("HISTORY_LIMIT", 3)?,
            neighbor_count: parse_or("DEDUP_NEIGHBORS", 5)?,
            similarity_threshold: parse_or("DEDUP_DISTANCE_THRESHOLD", 0.25)?,
            max_brainstorm_attempts: parse_or("MAX_BRAINSTORM_ATTEMPTS", 5)?,
            max_cycles: parse_or("MAX_PRODUCTION_CYCLES", DEFAULT_MAX_CYCLES)?,
        })
    }

    /// Path of the concept store database.
    pub fn concept_db_path(&self) -> PathBuf {
        self.data_dir.join("concepts.db")
    }

    /// Path of the relational pages database the migration job fills.
    pub fn pages_db_path(&self) -> PathBuf {
        self.data_dir.join("pages.db")
    }

    /// Root directory for raw/optimized artifacts.
    pub fn artifact_dir(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                value: raw,
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}
