//! Reading vectorizer and classifier artifacts from disk

use super::classifier::{LogisticRegression, MultinomialNb, RandomForest};
use super::vectorizer::{TfidfParams, TfidfVectorizer};
use super::{Classifier, Vectorizer};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VectorizerArtifact {
    Tfidf(TfidfParams),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    LogisticRegression(LogisticRegression),
    MultinomialNb(MultinomialNb),
    RandomForest(RandomForest),
}

impl ClassifierArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierArtifact::LogisticRegression(_) => "logistic_regression",
            ClassifierArtifact::MultinomialNb(_) => "multinomial_nb",
            ClassifierArtifact::RandomForest(_) => "random_forest",
        }
    }

    fn into_classifier(self) -> std::result::Result<Box<dyn Classifier>, String> {
        match self {
            ClassifierArtifact::LogisticRegression(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
            ClassifierArtifact::MultinomialNb(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
            ClassifierArtifact::RandomForest(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
        }
    }
}

/// Outcome of loading one artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Loaded { path: PathBuf, digest: String },
    Unavailable { path: PathBuf, reason: String },
    /// Supplied in memory rather than read from disk
    Provided,
}

impl ArtifactStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self, ArtifactStatus::Unavailable { .. })
    }
}

/// A loaded artifact together with the blake3 digest of its bytes
pub struct Loaded<T> {
    pub value: T,
    pub digest: String,
}

fn artifact_error(path: &Path, reason: impl Into<String>) -> Error {
    Error::Artifact {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<Loaded<T>> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            artifact_error(path, "not found")
        } else {
            artifact_error(path, format!("unreadable: {}", e))
        }
    })?;
    let digest = blake3::hash(&bytes).to_hex().to_string();
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| artifact_error(path, format!("corrupt artifact: {}", e)))?;
    Ok(Loaded { value, digest })
}

pub fn load_vectorizer(path: &Path) -> Result<Loaded<Box<dyn Vectorizer>>> {
    let loaded: Loaded<VectorizerArtifact> = read_artifact(path)?;
    let vectorizer: Box<dyn Vectorizer> = match loaded.value {
        VectorizerArtifact::Tfidf(params) => {
            Box::new(TfidfVectorizer::from_params(params).map_err(|e| artifact_error(path, e))?)
        }
    };
    Ok(Loaded {
        value: vectorizer,
        digest: loaded.digest,
    })
}

pub fn load_classifier(path: &Path) -> Result<Loaded<Box<dyn Classifier>>> {
    let loaded: Loaded<ClassifierArtifact> = read_artifact(path)?;
    let kind = loaded.value.kind();
    let classifier = loaded
        .value
        .into_classifier()
        .map_err(|e| artifact_error(path, format!("invalid {}: {}", kind, e)))?;
    Ok(Loaded {
        value: classifier,
        digest: loaded.digest,
    })
}
