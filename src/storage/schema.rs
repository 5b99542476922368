//! Database schema definitions
//!
//! Applied exactly once, when the database file is first created.

/// SQL to create the models table (surrogate id <-> model display name)
pub const CREATE_MODELS_TABLE: &str = r#"
CREATE TABLE models (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_name TEXT UNIQUE
)
"#;

/// SQL to create the results table, seeded with 1=HUMAN and 2=AI
pub const CREATE_RESULTS_TABLE: &str = r#"
CREATE TABLE results (
    id INTEGER PRIMARY KEY,
    label_name TEXT UNIQUE
)
"#;

/// SQL to create the history table
/// One row per classification; `created_at` is "YYYY-MM-DD HH:MM:SS"
pub const CREATE_HISTORY_TABLE: &str = r#"
CREATE TABLE history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input_text TEXT,
    model_id INTEGER,
    ai_probability REAL,
    result_id INTEGER,
    created_at TEXT,
    FOREIGN KEY(model_id) REFERENCES models(id),
    FOREIGN KEY(result_id) REFERENCES results(id)
)
"#;

pub const INSERT_MODEL: &str = "INSERT INTO models (id, model_name) VALUES (?1, ?2)";

pub const INSERT_RESULT: &str = "INSERT INTO results (id, label_name) VALUES (?1, ?2)";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_MODELS_TABLE, CREATE_RESULTS_TABLE, CREATE_HISTORY_TABLE]
}
