//! Rugby scrape persistence
//!
//! Routes scraped rugby records into a SQLite store, reconciling each one
//! with what is already stored, and into per-kind CSV exports.

pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod items;
pub mod pipeline;
pub mod storage;

pub use export::FlatFileSink;
pub use items::{Item, Kind};
pub use pipeline::{ItemPipeline, PipelineRunner, RunSummary};
pub use storage::RelationalSink;
