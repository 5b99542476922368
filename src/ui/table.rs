use crate::model::{ArtifactStatus, LoadReport};
use crate::storage::HistoryRow;
use tabled::{Table, Tabled, settings::Style};

/// Longest input text shown in a history table cell
const TEXT_PREVIEW_CHARS: usize = 48;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

#[derive(Tabled)]
struct HistoryTableRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Date")]
    created_at: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Prediction")]
    label: String,
    #[tabled(rename = "AI Probability")]
    probability: String,
    #[tabled(rename = "Text")]
    text: String,
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= TEXT_PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(TEXT_PREVIEW_CHARS - 1).collect();
    cut.push('…');
    cut
}

pub fn history_table(rows: &[HistoryRow]) -> String {
    let rows: Vec<HistoryTableRow> = rows
        .iter()
        .map(|r| HistoryTableRow {
            id: r.id,
            created_at: r.created_at.clone(),
            model: r.model_name.clone(),
            label: r.label.to_string(),
            probability: format!("{:.4}", r.ai_probability),
            text: preview(&r.input_text),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct ModelTableRow {
    #[tabled(rename = "Artifact")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn status_cells(status: &ArtifactStatus) -> (String, String) {
    match status {
        ArtifactStatus::Loaded { digest, .. } => {
            ("loaded".to_string(), digest.chars().take(16).collect())
        }
        ArtifactStatus::Unavailable { path, reason } => {
            ("unavailable".to_string(), format!("{} ({})", reason, path.display()))
        }
        ArtifactStatus::Provided => ("provided".to_string(), String::new()),
    }
}

pub fn models_table(report: &LoadReport) -> String {
    let mut rows = Vec::with_capacity(report.models.len() + 1);
    let (status, detail) = status_cells(&report.vectorizer);
    rows.push(ModelTableRow {
        name: "(vectorizer)".to_string(),
        status,
        detail,
    });
    for (name, artifact) in &report.models {
        let (status, detail) = status_cells(artifact);
        rows.push(ModelTableRow {
            name: name.clone(),
            status,
            detail,
        });
    }

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;

    #[test]
    fn test_preview_truncates_and_flattens() {
        assert_eq!(preview("short\ntext"), "short text");
        let long = "word ".repeat(40);
        let p = preview(&long);
        assert_eq!(p.chars().count(), TEXT_PREVIEW_CHARS);
        assert!(p.ends_with('…'));
    }

    #[test]
    fn test_history_table_contains_rows() {
        let rows = vec![HistoryRow {
            id: 7,
            created_at: "2026-01-02 03:04:05".to_string(),
            model_name: "Random Forest".to_string(),
            label: Label::Ai,
            ai_probability: 0.95,
            input_text: "an abstract".to_string(),
        }];
        let table = history_table(&rows);
        assert!(table.contains("Random Forest"));
        assert!(table.contains("0.9500"));
        assert!(table.contains("AI"));
    }

    #[test]
    fn test_empty_builder() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(stats_table(&[("Entries", "3")]).contains("Entries"));
    }
}
