//! Model Layer - vectorizer and classifier artifacts held in memory
//!
//! Artifacts are JSON documents tagged by `kind`:
//! - vectorizer: `tfidf`
//! - classifiers: `logistic_regression`, `multinomial_nb`, `random_forest`
//!
//! Every classifier answers with `[P(human), P(ai)]`.

pub mod artifact;
pub mod cache;
pub mod classifier;
pub mod vectorizer;

pub use artifact::{ArtifactStatus, ClassifierArtifact, VectorizerArtifact};
pub use cache::{LoadReport, ModelCache};
pub use classifier::{DecisionTree, LogisticRegression, MultinomialNb, RandomForest, TreeNode};
pub use vectorizer::{Norm, TfidfParams, TfidfVectorizer};

use crate::{Error, Result};

/// Turns raw text into a feature vector
pub trait Vectorizer: Send + Sync {
    fn transform(&self, text: &str) -> Result<FeatureVector>;
}

/// Scores a feature vector as `[P(human), P(ai)]`
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]>;
}

/// Sparse feature vector with a fixed dimension.
///
/// Entries are sorted by column and hold no duplicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Build from `(column, value)` pairs; duplicate columns are summed
    pub fn from_pairs(dim: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Result<Self> {
        let mut entries: Vec<(usize, f64)> = Vec::new();
        for (col, value) in pairs {
            if col >= dim {
                return Err(Error::ShapeMismatch {
                    expected: dim,
                    found: col + 1,
                });
            }
            entries.push((col, value));
        }
        entries.sort_by_key(|(col, _)| *col);

        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (col, value) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == col => *acc += value,
                _ => merged.push((col, value)),
            }
        }
        Ok(Self { dim, entries: merged })
    }

    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            dim: values.len(),
            entries: values
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dim];
        for (col, value) in &self.entries {
            dense[*col] = *value;
        }
        dense
    }

    /// Dot product against a dense weight row of the same dimension
    pub fn dot(&self, weights: &[f64]) -> Result<f64> {
        self.expect_dim(weights.len())?;
        Ok(self.entries.iter().map(|(col, value)| value * weights[*col]).sum())
    }

    pub fn expect_dim(&self, expected: usize) -> Result<()> {
        if self.dim != expected {
            return Err(Error::ShapeMismatch {
                expected,
                found: self.dim,
            });
        }
        Ok(())
    }
}
