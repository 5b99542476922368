//! In-memory cache of the vectorizer and every named classifier.
//!
//! Loading is eager and best-effort: each artifact is loaded on its own, and
//! a failure only removes that artifact from service. Scoring never fails the
//! caller; every degraded path answers `0.0` and is logged.

use super::artifact::{self, ArtifactStatus};
use super::{Classifier, Vectorizer};
use crate::config::ArtifactConfig;
use crate::{Error, Result};
use serde::Serialize;

/// Per-artifact outcome of the initial load
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub vectorizer: ArtifactStatus,
    pub models: Vec<(String, ArtifactStatus)>,
}

impl LoadReport {
    pub fn available_models(&self) -> usize {
        self.models.iter().filter(|(_, s)| s.is_available()).count()
    }
}

/// The failure cause without the path, which the status already carries
fn unavailable_reason(e: Error) -> String {
    match e {
        Error::Artifact { reason, .. } => reason,
        other => other.to_string(),
    }
}

pub struct ModelCache {
    vectorizer: Option<Box<dyn Vectorizer>>,
    models: Vec<(String, Box<dyn Classifier>)>,
    report: LoadReport,
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("vectorizer", &self.vectorizer.is_some())
            .field("servable", &self.servable())
            .finish()
    }
}

impl ModelCache {
    /// Load the vectorizer first, then every configured model independently
    pub fn load(config: &ArtifactConfig) -> Self {
        let (vectorizer, vectorizer_status) = match artifact::load_vectorizer(&config.vectorizer) {
            Ok(loaded) => {
                tracing::info!("Vectorizer loaded from {}", config.vectorizer.display());
                (
                    Some(loaded.value),
                    ArtifactStatus::Loaded {
                        path: config.vectorizer.clone(),
                        digest: loaded.digest,
                    },
                )
            }
            Err(e) => {
                tracing::error!("Vectorizer unavailable, every model will score 0.0: {}", e);
                (
                    None,
                    ArtifactStatus::Unavailable {
                        path: config.vectorizer.clone(),
                        reason: unavailable_reason(e),
                    },
                )
            }
        };

        let mut models: Vec<(String, Box<dyn Classifier>)> = Vec::new();
        let mut statuses = Vec::new();
        for (name, path) in &config.models {
            if models.iter().any(|(n, _)| n == name) {
                tracing::warn!("Duplicate model name {:?} ignored ({})", name, path.display());
                continue;
            }
            match artifact::load_classifier(path) {
                Ok(loaded) => {
                    tracing::info!("Model loaded: {}", name);
                    models.push((name.clone(), loaded.value));
                    statuses.push((
                        name.clone(),
                        ArtifactStatus::Loaded {
                            path: path.clone(),
                            digest: loaded.digest,
                        },
                    ));
                }
                Err(e) => {
                    tracing::warn!("Model {:?} will not be available: {}", name, e);
                    statuses.push((
                        name.clone(),
                        ArtifactStatus::Unavailable {
                            path: path.clone(),
                            reason: unavailable_reason(e),
                        },
                    ));
                }
            }
        }

        Self {
            vectorizer,
            models,
            report: LoadReport {
                vectorizer: vectorizer_status,
                models: statuses,
            },
        }
    }

    /// Build a cache from already constructed components
    pub fn from_parts(
        vectorizer: Option<Box<dyn Vectorizer>>,
        models: Vec<(String, Box<dyn Classifier>)>,
    ) -> Self {
        let vectorizer_status = if vectorizer.is_some() {
            ArtifactStatus::Provided
        } else {
            ArtifactStatus::Unavailable {
                path: Default::default(),
                reason: "not provided".to_string(),
            }
        };
        let statuses = models
            .iter()
            .map(|(name, _)| (name.clone(), ArtifactStatus::Provided))
            .collect();

        Self {
            vectorizer,
            models,
            report: LoadReport {
                vectorizer: vectorizer_status,
                models: statuses,
            },
        }
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn has_vectorizer(&self) -> bool {
        self.vectorizer.is_some()
    }

    /// Names that can be scored, in configuration order
    pub fn servable(&self) -> Vec<&str> {
        self.models.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_servable(&self, model_name: &str) -> bool {
        self.models.iter().any(|(name, _)| name == model_name)
    }

    /// Score `text` under `model_name`, reporting why scoring was impossible
    pub fn try_classify(&self, model_name: &str, text: &str) -> Result<f64> {
        let vectorizer = self.vectorizer.as_ref().ok_or(Error::VectorizerUnavailable)?;
        let model = self
            .models
            .iter()
            .find(|(name, _)| name == model_name)
            .map(|(_, model)| model)
            .ok_or_else(|| Error::ModelUnavailable(model_name.to_string()))?;

        let features = vectorizer.transform(text)?;
        let probabilities = model.predict_proba(&features)?;
        let ai = probabilities[1];
        if !ai.is_finite() || !(0.0..=1.0).contains(&ai) {
            return Err(Error::InvalidProbability(ai));
        }
        tracing::debug!(model = model_name, ai_probability = ai, "Scored sample");
        Ok(ai)
    }

    /// Probability that `text` is AI-written; `0.0` whenever it cannot be scored
    pub fn classify(&self, model_name: &str, text: &str) -> f64 {
        match self.try_classify(model_name, text) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Scoring with {:?} degraded to 0.0: {}", model_name, e);
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeatureVector;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedVectorizer {
        calls: Arc<AtomicUsize>,
    }

    impl Vectorizer for FixedVectorizer {
        fn transform(&self, _text: &str) -> Result<FeatureVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FeatureVector::from_dense(&[1.0]))
        }
    }

    struct FixedModel([f64; 2]);

    impl Classifier for FixedModel {
        fn predict_proba(&self, _features: &FeatureVector) -> Result<[f64; 2]> {
            Ok(self.0)
        }
    }

    struct FailingModel;

    impl Classifier for FailingModel {
        fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]> {
            Err(Error::ShapeMismatch {
                expected: 42,
                found: features.dim(),
            })
        }
    }

    fn vectorizer() -> (Box<dyn Vectorizer>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(FixedVectorizer {
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn write_artifacts(dir: &Path) {
        std::fs::write(
            dir.join("tfidf_vectorizer.json"),
            r#"{"kind":"tfidf","vocabulary":{"delve":0,"honestly":1},"idf":[1.0,1.0]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("model_logistic_regression.json"),
            r#"{"kind":"logistic_regression","coef":[3.0,-3.0],"intercept":0.0}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("model_naive_bayes.json"),
            r#"{"kind":"multinomial_nb","class_log_prior":[-0.6931,-0.6931],
                "feature_log_prob":[[-3.0,-0.1],[-0.1,-3.0]]}"#,
        )
        .unwrap();
    }

    fn artifact_config(dir: &Path) -> ArtifactConfig {
        crate::DetectorConfig::default().artifacts(dir)
    }

    #[test]
    fn test_selects_ai_probability() {
        let (vectorizer, calls) = vectorizer();
        let cache = ModelCache::from_parts(
            Some(vectorizer),
            vec![("TestModel".to_string(), Box::new(FixedModel([0.2, 0.8])) as Box<dyn Classifier>)],
        );

        assert_eq!(cache.classify("TestModel", "deneme metni"), 0.8);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_vectorizer_scores_zero_for_every_model() {
        let cache = ModelCache::from_parts(
            None,
            vec![
                ("A".to_string(), Box::new(FixedModel([0.0, 1.0])) as Box<dyn Classifier>),
                ("B".to_string(), Box::new(FixedModel([0.1, 0.9])) as Box<dyn Classifier>),
            ],
        );

        for name in ["A", "B", "Unknown"] {
            assert_eq!(cache.classify(name, "anything"), 0.0);
        }
        assert!(matches!(cache.try_classify("A", "x"), Err(Error::VectorizerUnavailable)));
    }

    #[test]
    fn test_unknown_model_scores_zero() {
        let (vectorizer, calls) = vectorizer();
        let cache = ModelCache::from_parts(Some(vectorizer), vec![]);

        assert_eq!(cache.classify("Random Forest", "text"), 0.0);
        assert!(matches!(
            cache.try_classify("Random Forest", "text"),
            Err(Error::ModelUnavailable(name)) if name == "Random Forest"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prediction_errors_degrade() {
        let (vectorizer, _) = vectorizer();
        let cache = ModelCache::from_parts(
            Some(vectorizer),
            vec![
                ("Broken".to_string(), Box::new(FailingModel) as Box<dyn Classifier>),
                ("NaN".to_string(), Box::new(FixedModel([0.5, f64::NAN])) as Box<dyn Classifier>),
                ("Range".to_string(), Box::new(FixedModel([-0.5, 1.5])) as Box<dyn Classifier>),
            ],
        );

        assert_eq!(cache.classify("Broken", "text"), 0.0);
        assert_eq!(cache.classify("NaN", "text"), 0.0);
        assert_eq!(cache.classify("Range", "text"), 0.0);
        assert!(matches!(cache.try_classify("Range", "text"), Err(Error::InvalidProbability(_))));
    }

    #[test]
    fn test_load_isolates_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());

        let cache = ModelCache::load(&artifact_config(dir.path()));

        assert!(cache.has_vectorizer());
        assert_eq!(cache.servable(), vec!["Logistic Regression", "Naive Bayes"]);
        assert!(!cache.is_servable("Random Forest"));
        assert_eq!(cache.classify("Random Forest", "delve"), 0.0);

        let lr = cache.classify("Logistic Regression", "Let us delve into it");
        assert!(lr > 0.9, "got {lr}");
        let nb = cache.classify("Naive Bayes", "honestly");
        assert!(nb < 0.1, "got {nb}");

        let report = cache.report();
        assert_eq!(report.available_models(), 2);
        assert!(matches!(
            &report.models[1],
            (name, ArtifactStatus::Unavailable { reason, .. }) if name == "Random Forest" && reason == "not found"
        ));
    }

    #[test]
    fn test_load_without_vectorizer_keeps_models() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        std::fs::remove_file(dir.path().join("tfidf_vectorizer.json")).unwrap();

        let cache = ModelCache::load(&artifact_config(dir.path()));

        assert!(!cache.has_vectorizer());
        assert!(cache.is_servable("Logistic Regression"));
        assert_eq!(cache.classify("Logistic Regression", "delve delve"), 0.0);
        assert!(!cache.report().vectorizer.is_available());
        assert!(matches!(
            &cache.report().vectorizer,
            ArtifactStatus::Unavailable { path, reason }
                if reason == "not found" && path == &dir.path().join("tfidf_vectorizer.json")
        ));
    }

    #[test]
    fn test_load_skips_corrupt_model() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        std::fs::write(dir.path().join("model_random_forest.json"), "{not json").unwrap();

        let cache = ModelCache::load(&artifact_config(dir.path()));
        assert_eq!(cache.servable().len(), 2);
    }

    #[test]
    fn test_cache_is_shareable_across_threads() {
        let (vectorizer, calls) = vectorizer();
        let cache = Arc::new(ModelCache::from_parts(
            Some(vectorizer),
            vec![("M".to_string(), Box::new(FixedModel([0.3, 0.7])) as Box<dyn Classifier>)],
        ));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.classify("M", "same input"))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0.7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
