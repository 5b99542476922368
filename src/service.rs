//! Service layer - shared instances and the caller-facing API
//!
//! A `Registry` is built once from resolved configuration and hands out the
//! same `Arc<ModelCache>` and `Arc<ClassificationStore>` on every request.
//! `Detector` bundles both behind `classify`, `log_result`, `list_history`
//! and `delete_history`.

use crate::config::{ArtifactConfig, DetectorConfig, StoreConfig};
use crate::label::Label;
use crate::model::ModelCache;
use crate::storage::{ClassificationStore, HistoryRow};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

pub struct Registry {
    artifacts: ArtifactConfig,
    store_config: StoreConfig,
    cache: OnceLock<Arc<ModelCache>>,
    store: Mutex<Option<Arc<ClassificationStore>>>,
}

impl Registry {
    pub fn new(artifacts: ArtifactConfig, store_config: StoreConfig) -> Self {
        Self {
            artifacts,
            store_config,
            cache: OnceLock::new(),
            store: Mutex::new(None),
        }
    }

    /// Resolve every configured location against `base`
    pub fn from_config(config: &DetectorConfig, base: &Path) -> Self {
        Self::new(config.artifacts(base), config.store(base))
    }

    /// The model cache, loaded on first request.
    ///
    /// Concurrent first requests block until the single load finishes.
    pub fn cache(&self) -> Arc<ModelCache> {
        self.cache
            .get_or_init(|| {
                tracing::info!("Loading model artifacts");
                Arc::new(ModelCache::load(&self.artifacts))
            })
            .clone()
    }

    pub fn is_cache_loaded(&self) -> bool {
        self.cache.get().is_some()
    }

    /// The classification store, opened on first request.
    ///
    /// A failed open is returned to the caller and attempted again next time.
    pub fn store(&self) -> Result<Arc<ClassificationStore>> {
        let mut slot = self.store.lock().map_err(|_| Error::LockPoisoned)?;
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }
        let store = Arc::new(ClassificationStore::open(&self.store_config)?);
        *slot = Some(store.clone());
        Ok(store)
    }

    pub fn detector(&self) -> Result<Detector> {
        Ok(Detector::new(self.cache(), self.store()?))
    }
}

/// Outcome of scoring and logging one sample
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub model: String,
    pub ai_probability: f64,
    pub human_probability: f64,
    pub label: Label,
    pub entry_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Detector {
    cache: Arc<ModelCache>,
    store: Arc<ClassificationStore>,
}

impl Detector {
    pub fn new(cache: Arc<ModelCache>, store: Arc<ClassificationStore>) -> Self {
        Self { cache, store }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn store(&self) -> &ClassificationStore {
        &self.store
    }

    pub fn classify(&self, model_name: &str, text: &str) -> f64 {
        self.cache.classify(model_name, text)
    }

    pub fn log_result(&self, text: &str, model_name: &str, ai_probability: f64, is_ai: bool) -> Result<i64> {
        self.store
            .insert(text, model_name, ai_probability, Label::from_is_ai(is_ai))
    }

    pub fn list_history(&self) -> Result<Vec<HistoryRow>> {
        self.store.list()
    }

    pub fn delete_history(&self, id: i64) -> Result<bool> {
        self.store.delete(id)
    }

    pub fn delete_many(&self, ids: &[i64]) -> Result<usize> {
        self.store.delete_many(ids)
    }

    /// Score `text`, decide the label with `p > AI_THRESHOLD`, and log it
    /// unless `persist` is false.
    pub fn analyze(&self, model_name: &str, text: &str, persist: bool) -> Result<Analysis> {
        let ai_probability = self.classify(model_name, text);
        let label = Label::from_probability(ai_probability);
        let entry_id = if persist {
            Some(self.log_result(text, model_name, ai_probability, label.is_ai())?)
        } else {
            None
        };

        Ok(Analysis {
            model: model_name.to_string(),
            ai_probability,
            human_probability: 1.0 - ai_probability,
            label,
            entry_id,
        })
    }
}
