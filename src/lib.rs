//! # Authorcheck - Human vs AI authorship detection
//!
//! Scores a text sample with one of several pre-trained classifiers and keeps
//! every classification as an auditable row in a small SQLite database.
//!
//! Authorcheck provides:
//! - A model resource cache that loads the TF-IDF vectorizer and the named
//!   classifiers once and scores text without ever failing the caller
//! - A normalized classification log (models, results, history) with
//!   insert, query and delete
//! - A service layer that hands out one shared cache and one shared store

pub mod config;
pub mod label;
pub mod model;
pub mod output;
pub mod service;
pub mod storage;
pub mod ui;

use std::path::PathBuf;

// Re-exports for convenient access
pub use config::DetectorConfig;
pub use label::{AI_THRESHOLD, Label};
pub use model::{LoadReport, ModelCache};
pub use service::{Analysis, Detector, Registry};
pub use storage::ClassificationStore;

/// Result type alias for Authorcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Authorcheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("Vectorizer is not loaded")]
    VectorizerUnavailable,

    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Feature shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Model produced an invalid probability: {0}")]
    InvalidProbability(f64),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Classification store has been closed")]
    StoreClosed,

    #[error("Lock poisoned")]
    LockPoisoned,
}
