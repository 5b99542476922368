use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A named classifier and the artifact file it is loaded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub file: String,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub artifacts_dir: String,
    pub vectorizer: String,
    pub database_dir: String,
    pub database_file: String,
    pub models: Vec<ModelEntry>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: ".".to_string(),
            vectorizer: "tfidf_vectorizer.json".to_string(),
            database_dir: "db".to_string(),
            database_file: "app_database.db".to_string(),
            models: default_models(),
        }
    }
}

pub fn default_models() -> Vec<ModelEntry> {
    vec![
        ModelEntry::new("Logistic Regression", "model_logistic_regression.json"),
        ModelEntry::new("Random Forest", "model_random_forest.json"),
        ModelEntry::new("Naive Bayes", "model_naive_bayes.json"),
    ]
}

/// Resolved artifact locations for the model cache
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub vectorizer: PathBuf,
    pub models: Vec<(String, PathBuf)>,
}

/// Resolved database location and the model names seeded into a new database
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub seed_models: Vec<String>,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>, seed_models: Vec<String>) -> Self {
        Self {
            path: path.into(),
            seed_models,
        }
    }
}

impl DetectorConfig {
    /// Distinct model names in configuration order; a repeated name keeps
    /// its first position, as the model cache does.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.models.len());
        for model in &self.models {
            if !names.contains(&model.name) {
                names.push(model.name.clone());
            }
        }
        names
    }

    pub fn artifacts(&self, base: &Path) -> ArtifactConfig {
        let dir = match self.artifacts_dir.as_str() {
            "" | "." => base.to_path_buf(),
            sub => base.join(sub),
        };
        ArtifactConfig {
            vectorizer: dir.join(&self.vectorizer),
            models: self
                .models
                .iter()
                .map(|m| (m.name.clone(), dir.join(&m.file)))
                .collect(),
        }
    }

    pub fn store(&self, base: &Path) -> StoreConfig {
        StoreConfig::new(
            base.join(&self.database_dir).join(&self.database_file),
            self.model_names(),
        )
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("authorcheck.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    let defaults = DetectorConfig::default();
    base.join(defaults.database_dir).join(defaults.database_file)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<DetectorConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: DetectorConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &DetectorConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Create the directory holding the database file. Returns true if it was created.
pub fn ensure_db_dir(db_path: &Path) -> std::io::Result<bool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            return Ok(true);
        }
    }
    Ok(false)
}
