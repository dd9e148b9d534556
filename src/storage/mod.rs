//! SQLite storage module for scraped rugby records
//!
//! Provides the relational sink, which reconciles each incoming record with
//! what is already stored, and the schema and row operations it builds on.

pub mod repository;
pub mod schema;
pub mod sink;

pub use repository::RecordRepository;
pub use schema::create_tables;
pub use sink::{Outcome, RelationalSink, SinkStats, Strategy};
