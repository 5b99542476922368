//! SQLite storage implementation

use super::schema;
use crate::config::{StoreConfig, ensure_db_dir};
use crate::label::Label;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Format of `history.created_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed log of classifications.
///
/// Holds one connection for the lifetime of the process. The connection sits
/// behind a mutex so a shared `Arc<ClassificationStore>` serializes statements.
pub struct ClassificationStore {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for ClassificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationStore")
            .field("path", &self.path)
            .finish()
    }
}

impl ClassificationStore {
    /// Open the database file, creating its directory, schema and seed rows if
    /// the file does not exist yet. An existing file is trusted as-is.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if ensure_db_dir(&config.path)? {
            tracing::info!("Created database directory for {}", config.path.display());
        }

        let existed = config.path.exists();
        let mut conn = Connection::open(&config.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if existed {
            tracing::info!("Opened classification store {}", config.path.display());
        } else {
            tracing::info!("Creating classification store {}", config.path.display());
            if let Err(e) = initialize_schema(&mut conn, &config.seed_models) {
                // Leave no empty file behind, or the next open would trust it
                drop(conn);
                if let Err(rm) = std::fs::remove_file(&config.path) {
                    tracing::warn!("Could not remove {}: {}", config.path.display(), rm);
                }
                return Err(e);
            }
        }

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(config.path.clone()),
        })
    }

    /// Open a fresh in-memory database (for testing)
    pub fn open_in_memory(seed_models: &[String]) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&mut conn, seed_models)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let conn = guard.as_mut().ok_or(Error::StoreClosed)?;
        f(conn)
    }

    // ========== Lookups ==========

    /// Surrogate id of a model name, `None` if the name was never seeded
    pub fn resolve_model_id(&self, model_name: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| resolve_model_id(conn, model_name))
    }

    /// Get the raw persisted row, surrogate keys included
    pub fn get_entry(&self, id: i64) -> Result<Option<HistoryEntry>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, input_text, model_id, ai_probability, result_id, created_at FROM history WHERE id = ?1",
                [id],
                |row| {
                    Ok(HistoryEntry {
                        id: row.get(0)?,
                        input_text: row.get(1)?,
                        model_id: row.get(2)?,
                        ai_probability: row.get(3)?,
                        result_id: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
        })
    }

    // ========== History Operations ==========

    /// Append one classification and return its id.
    ///
    /// An unknown `model_name` is stored with a NULL model reference so the
    /// audit row is never lost.
    pub fn insert(&self, text: &str, model_name: &str, ai_probability: f64, label: Label) -> Result<i64> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let model_id = resolve_model_id(&tx, model_name)?;
            if model_id.is_none() {
                tracing::warn!("Model {:?} is not registered; logging with no model reference", model_name);
            }
            let created_at = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

            tx.execute(
                r#"
                INSERT INTO history (input_text, model_id, ai_probability, result_id, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![text, model_id, ai_probability, label.id(), created_at],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            tracing::debug!(id, model = model_name, %label, "Logged classification");
            Ok(id)
        })
    }

    /// All resolvable entries, newest first
    pub fn list(&self) -> Result<Vec<HistoryRow>> {
        self.query_rows(None)
    }

    /// The `limit` newest resolvable entries
    pub fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRow>> {
        self.query_rows(Some(limit))
    }

    fn query_rows(&self, limit: Option<usize>) -> Result<Vec<HistoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT h.id, h.created_at, m.model_name, r.label_name, h.ai_probability, h.input_text
                FROM history h
                JOIN models m ON h.model_id = m.id
                JOIN results r ON h.result_id = r.id
                ORDER BY h.id DESC
                LIMIT ?1
                "#,
            )?;
            // SQLite treats a negative LIMIT as unbounded
            let limit = limit.map(|l| l as i64).unwrap_or(-1);

            let rows = stmt
                .query_map([limit], row_to_history)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Delete one entry. Returns false if no row had that id.
    pub fn delete(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM history WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    /// Delete several entries in one transaction. Returns how many were removed.
    pub fn delete_many(&self, ids: &[i64]) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM history WHERE id = ?1")?;
                for id in ids {
                    removed += stmt.execute([id])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
    }

    // ========== Statistics ==========

    fn count(&self, table: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn count_history(&self) -> Result<usize> {
        self.count("history")
    }

    pub fn count_models(&self) -> Result<usize> {
        self.count("models")
    }

    pub fn count_labels(&self) -> Result<usize> {
        self.count("results")
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let (human, ai) = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT result_id, COUNT(*) FROM history GROUP BY result_id")?;
            let mut human = 0;
            let mut ai = 0;
            let counts = stmt.query_map([], |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, i64>(1)?)))?;
            for entry in counts {
                let (result_id, count) = entry?;
                match result_id.and_then(Label::from_id) {
                    Some(Label::Human) => human += count as usize,
                    Some(Label::Ai) => ai += count as usize,
                    None => {}
                }
            }
            Ok((human, ai))
        })?;

        Ok(StoreStats {
            models: self.count_models()?,
            labels: self.count_labels()?,
            entries: self.count_history()?,
            human,
            ai,
        })
    }

    /// Release the connection. Every later call fails with `StoreClosed`.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| Error::Storage(e))?;
            tracing::debug!("Classification store closed");
        }
        Ok(())
    }
}

/// Create the tables and seed rows in one transaction
fn initialize_schema(conn: &mut Connection, seed_models: &[String]) -> Result<()> {
    let tx = conn.transaction()?;
    for stmt in schema::all_schema_statements() {
        tx.execute(stmt, [])?;
    }
    seed(&tx, seed_models)?;
    tx.commit()?;
    tracing::info!("Schema created with {} models", seed_models.len());
    Ok(())
}

fn seed(tx: &Transaction<'_>, seed_models: &[String]) -> Result<()> {
    {
        let mut stmt = tx.prepare(schema::INSERT_MODEL)?;
        for (i, name) in seed_models.iter().enumerate() {
            stmt.execute(params![i as i64 + 1, name])?;
        }
    }
    let mut stmt = tx.prepare(schema::INSERT_RESULT)?;
    for label in Label::all() {
        stmt.execute(params![label.id(), label.as_str()])?;
    }
    Ok(())
}

fn resolve_model_id(conn: &Connection, model_name: &str) -> Result<Option<i64>> {
    conn.query_row("SELECT id FROM models WHERE model_name = ?1", [model_name], |row| row.get(0))
        .optional()
        .map_err(Into::into)
}

/// Helper to convert a joined row to a HistoryRow
fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<HistoryRow> {
    let label_name: String = row.get(3)?;
    let label: Label = label_name.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(HistoryRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        model_name: row.get(2)?,
        label,
        ai_probability: row.get(4)?,
        input_text: row.get(5)?,
    })
}

/// A history row as persisted, with surrogate keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub input_text: String,
    pub model_id: Option<i64>,
    pub ai_probability: f64,
    pub result_id: Option<i64>,
    pub created_at: String,
}

impl HistoryEntry {
    pub fn label(&self) -> Option<Label> {
        self.result_id.and_then(Label::from_id)
    }
}

/// A history row joined with its model name and label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub id: i64,
    pub created_at: String,
    pub model_name: String,
    pub label: Label,
    pub ai_probability: f64,
    pub input_text: String,
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub models: usize,
    pub labels: usize,
    pub entries: usize,
    pub human: usize,
    pub ai: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Models: {}", self.models)?;
        writeln!(f, "  Labels: {}", self.labels)?;
        writeln!(f, "  Entries: {}", self.entries)?;
        writeln!(f, "    HUMAN: {}", self.human)?;
        writeln!(f, "    AI: {}", self.ai)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seed_models() -> Vec<String> {
        crate::DetectorConfig::default().model_names()
    }

    fn store_config(dir: &Path) -> StoreConfig {
        StoreConfig::new(dir.join("db").join("app_database.db"), seed_models())
    }

    fn open_memory() -> ClassificationStore {
        ClassificationStore::open_in_memory(&seed_models()).unwrap()
    }

    #[test]
    fn test_seeded_reference_rows() {
        let store = open_memory();

        assert_eq!(store.count_models().unwrap(), 3);
        assert_eq!(store.count_labels().unwrap(), 2);
        assert_eq!(store.resolve_model_id("Logistic Regression").unwrap(), Some(1));
        assert_eq!(store.resolve_model_id("Random Forest").unwrap(), Some(2));
        assert_eq!(store.resolve_model_id("Naive Bayes").unwrap(), Some(3));
        assert_eq!(store.resolve_model_id("GPT Sniffer").unwrap(), None);
    }

    #[test]
    fn test_open_creates_directory_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = store_config(dir.path());

        let store = ClassificationStore::open(&config).unwrap();
        assert!(config.path.exists());
        assert_eq!(store.path(), Some(config.path.as_path()));
        assert_eq!(store.count_models().unwrap(), 3);
    }

    #[test]
    fn test_open_with_repeated_model_name_in_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut detector_config = crate::DetectorConfig::default();
        detector_config
            .models
            .push(crate::config::ModelEntry::new("Random Forest", "model_rf_v2.json"));

        let store = ClassificationStore::open(&detector_config.store(dir.path())).unwrap();
        assert_eq!(store.count_models().unwrap(), 3);
        assert_eq!(store.resolve_model_id("Random Forest").unwrap(), Some(2));
        store.insert("logged", "Random Forest", 0.8, Label::Ai).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_creation_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("app_database.db");
        let broken = StoreConfig::new(&path, vec!["Random Forest".to_string(), "Random Forest".to_string()]);

        assert!(matches!(ClassificationStore::open(&broken), Err(Error::Storage(_))));
        assert!(!path.exists());

        let store = ClassificationStore::open(&StoreConfig::new(&path, seed_models())).unwrap();
        assert_eq!(store.count_models().unwrap(), 3);
        assert_eq!(store.count_labels().unwrap(), 2);
    }

    #[test]
    fn test_reopen_never_reseeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = store_config(dir.path());

        let store = ClassificationStore::open(&config).unwrap();
        store.insert("kept", "Naive Bayes", 0.3, Label::Human).unwrap();
        store.close().unwrap();

        for _ in 0..3 {
            let store = ClassificationStore::open(&config).unwrap();
            assert_eq!(store.count_models().unwrap(), 3);
            assert_eq!(store.count_labels().unwrap(), 2);
            assert_eq!(store.count_history().unwrap(), 1);
            store.close().unwrap();
        }
    }

    #[test]
    fn test_insert_resolves_surrogate_keys() {
        let store = open_memory();

        let ai_id = store.insert("x", "Random Forest", 0.95, Label::from_is_ai(true)).unwrap();
        let entry = store.get_entry(ai_id).unwrap().unwrap();
        assert_eq!(entry.model_id, store.resolve_model_id("Random Forest").unwrap());
        assert_eq!(entry.result_id, Some(2));
        assert_eq!(entry.ai_probability, 0.95);
        assert_eq!(entry.input_text, "x");

        let human_id = store.insert("y", "Naive Bayes", 0.1, Label::from_is_ai(false)).unwrap();
        let entry = store.get_entry(human_id).unwrap().unwrap();
        assert_eq!(entry.model_id, Some(3));
        assert_eq!(entry.result_id, Some(1));
        assert_eq!(entry.label(), Some(Label::Human));
    }

    #[test]
    fn test_threshold_labels_persist() {
        let store = open_memory();

        for (p, expected) in [(0.51, 2), (0.49, 1), (0.50, 1)] {
            let id = store
                .insert("boundary", "Logistic Regression", p, Label::from_probability(p))
                .unwrap();
            let entry = store.get_entry(id).unwrap().unwrap();
            assert_eq!(entry.result_id, Some(expected), "probability {p}");
        }
    }

    #[test]
    fn test_created_at_format() {
        let store = open_memory();
        let id = store.insert("t", "Random Forest", 0.7, Label::Ai).unwrap();
        let entry = store.get_entry(id).unwrap().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(&entry.created_at, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(entry.created_at.len(), 19);
    }

    #[test]
    fn test_unknown_model_is_kept_but_not_listed() {
        let store = open_memory();

        let id = store.insert("orphan", "Renamed Model", 0.8, Label::Ai).unwrap();
        let entry = store.get_entry(id).unwrap().unwrap();
        assert_eq!(entry.model_id, None);
        assert_eq!(store.count_history().unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let store = open_memory();
        store.insert("first", "Logistic Regression", 0.2, Label::Human).unwrap();
        store.insert("second", "Random Forest", 0.9, Label::Ai).unwrap();
        store.insert("third", "Naive Bayes", 0.6, Label::Ai).unwrap();

        let rows = store.list().unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.input_text.as_str()).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
        assert_eq!(rows[1].model_name, "Random Forest");
        assert_eq!(rows[1].label, Label::Ai);
        assert_eq!(rows[2].label, Label::Human);
        assert_eq!(rows[2].ai_probability, 0.2);

        let recent = store.list_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input_text, "third");
    }

    #[test]
    fn test_delete() {
        let store = open_memory();
        let keep = store.insert("keep", "Random Forest", 0.1, Label::Human).unwrap();
        let gone = store.insert("gone", "Random Forest", 0.9, Label::Ai).unwrap();

        assert!(store.delete(gone).unwrap());
        assert!(store.get_entry(gone).unwrap().is_none());
        assert!(store.get_entry(keep).unwrap().is_some());

        assert!(!store.delete(9999).unwrap());
        assert_eq!(store.count_history().unwrap(), 1);
    }

    #[test]
    fn test_delete_many() {
        let store = open_memory();
        let ids: Vec<i64> = (0..4)
            .map(|i| store.insert(&format!("t{i}"), "Naive Bayes", 0.4, Label::Human).unwrap())
            .collect();

        let removed = store.delete_many(&[ids[0], ids[2], 12345]).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count_history().unwrap(), 2);
    }

    #[test]
    fn test_stats() {
        let store = open_memory();
        store.insert("a", "Naive Bayes", 0.4, Label::Human).unwrap();
        store.insert("b", "Naive Bayes", 0.9, Label::Ai).unwrap();
        store.insert("c", "Random Forest", 0.8, Label::Ai).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!((stats.entries, stats.human, stats.ai), (3, 1, 2));
        assert!(stats.to_string().contains("Entries: 3"));
    }

    #[test]
    fn test_close_is_terminal() {
        let store = open_memory();
        store.close().unwrap();

        assert!(matches!(store.list(), Err(Error::StoreClosed)));
        assert!(matches!(store.insert("x", "Random Forest", 0.5, Label::Human), Err(Error::StoreClosed)));
        assert!(matches!(store.delete(1), Err(Error::StoreClosed)));
        store.close().unwrap();
    }

    #[test]
    fn test_concurrent_inserts() {
        let store = Arc::new(open_memory());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store
                            .insert(&format!("{i}-{j}"), "Random Forest", 0.6, Label::Ai)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count_history().unwrap(), 40);
    }
}
