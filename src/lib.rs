//! Color It Daily
//!
//! Application shell: configuration, the daily-push migration job, and the
//! CLI wiring in `main.rs`. The pipeline itself lives in the workspace
//! crates (`colorit-core`, `colorit-llm`, `colorit-store`,
//! `colorit-pipeline`).

pub mod config;
pub mod services;
