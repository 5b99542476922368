//! Storage Layer - SQLite-backed classification log
//!
//! System of record is SQLite with tables:
//! - models(id, model_name)
//! - results(id, label_name)
//! - history(id, input_text, model_id, ai_probability, result_id, created_at)

pub mod schema;
pub mod sqlite;

pub use sqlite::{ClassificationStore, HistoryEntry, HistoryRow, StoreStats};
