use crate::{OutputMode, emit_success};
use authorcheck::config::{self, DetectorConfig};
use authorcheck::ui::{self, Icons, Spinner, section, success, summary_row, theme};
use authorcheck::{Detector, Registry};
use anyhow::Context;
use owo_colors::OwoColorize;
use std::io::Read;
use std::path::Path;

/// Text from `--text`, `--file`, or stdin, in that order
pub fn read_input(text: Option<String>, file: Option<&Path>) -> anyhow::Result<String> {
    let input = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if input.trim().is_empty() {
        anyhow::bail!("Please provide some text to analyze.");
    }
    Ok(input)
}

fn open_detector(mode: OutputMode, registry: &Registry) -> anyhow::Result<Detector> {
    let spinner = mode.is_human().then(|| Spinner::new("Loading models..."));
    let detector = registry.detector();
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    Ok(detector?)
}

pub fn run_classify(
    mode: OutputMode,
    registry: &Registry,
    model: &str,
    text: &str,
    persist: bool,
) -> anyhow::Result<()> {
    let detector = open_detector(mode, registry)?;
    classify_with(mode, &detector, model, text, persist)
}

fn classify_with(
    mode: OutputMode,
    detector: &Detector,
    model: &str,
    text: &str,
    persist: bool,
) -> anyhow::Result<()> {
    if mode.is_human() && !detector.cache().is_servable(model) {
        ui::warn(&format!(
            "{} is not loaded (available: {}); the score defaults to 0.0",
            model,
            detector.cache().servable().join(", ")
        ));
    }

    let mut analysis = detector.analyze(model, text, false)?;

    if mode.is_human() {
        section("Result");
        ui::info("Model", model);
        summary_row("Human probability:", &ui::percent(analysis.human_probability));
        summary_row("AI probability:   ", &ui::percent(analysis.ai_probability));
        println!();
        let style = theme().label(analysis.label);
        if analysis.label.is_ai() {
            let message = format!("AI-generated text detected (confidence {})", ui::percent(analysis.ai_probability));
            println!("{} {}", Icons::ROBOT, message.style(style));
        } else {
            let message = format!("Human-written text (confidence {})", ui::percent(analysis.human_probability));
            println!("{} {}", Icons::PERSON, message.style(style));
        }
    }

    if persist {
        let id = detector
            .log_result(text, model, analysis.ai_probability, analysis.label.is_ai())
            .context("Result was not saved to history")?;
        analysis.entry_id = Some(id);
        if mode.is_human() {
            println!("{} {}", Icons::SAVE, ui::dim(&format!("Saved to history as #{}", id)));
        }
    }

    emit_success(mode, "classify", serde_json::to_value(&analysis)?)
}

pub fn run_history(mode: OutputMode, registry: &Registry, limit: Option<usize>) -> anyhow::Result<()> {
    let store = registry.store()?;
    let rows = match limit {
        Some(limit) => store.list_recent(limit)?,
        None => store.list()?,
    };

    if mode.is_human() {
        section("Classification History");
        if rows.is_empty() {
            println!("∅ No classifications logged yet.");
        } else {
            println!("{}", ui::history_table(&rows));
        }
    }

    emit_success(mode, "history", serde_json::to_value(&rows)?)
}

pub fn run_delete(mode: OutputMode, registry: &Registry, ids: &[i64]) -> anyhow::Result<()> {
    let store = registry.store()?;
    let removed = match ids {
        [id] => usize::from(store.delete(*id)?),
        _ => store.delete_many(ids)?,
    };

    if mode.is_human() {
        if removed > 0 {
            success(&format!("{} {} deleted", removed, if removed == 1 { "entry" } else { "entries" }));
        }
        if removed < ids.len() {
            ui::warn(&format!("{} id(s) did not match any entry", ids.len() - removed));
        }
    }

    emit_success(
        mode,
        "delete",
        serde_json::json!({
            "requested": ids,
            "removed": removed,
        }),
    )
}

pub fn run_models(mode: OutputMode, registry: &Registry) -> anyhow::Result<()> {
    let cache = registry.cache();
    let report = cache.report();

    if mode.is_human() {
        section("Model Artifacts");
        println!("{}", ui::models_table(report));
        summary_row(
            &format!("{} Servable:", Icons::BRAIN),
            &format!("{}/{}", report.available_models(), report.models.len()),
        );
        if !cache.has_vectorizer() {
            ui::warn("Vectorizer is missing: every model scores 0.0");
        }
    }

    emit_success(
        mode,
        "models",
        serde_json::json!({
            "servable": cache.servable(),
            "report": report,
        }),
    )
}

pub fn run_stats(mode: OutputMode, registry: &Registry) -> anyhow::Result<()> {
    let store = registry.store()?;
    let stats = store.stats()?;

    if mode.is_human() {
        let path = store
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        println!("{} Authorcheck Statistics ({})", Icons::STATS, ui::muted(&path));
        println!(
            "{}",
            ui::stats_table(&[
                ("Models", &stats.models.to_string()),
                ("Labels", &stats.labels.to_string()),
                ("Entries", &stats.entries.to_string()),
                ("HUMAN", &stats.human.to_string()),
                ("AI", &stats.ai.to_string()),
            ])
        );
    }

    emit_success(mode, "stats", serde_json::to_value(&stats)?)
}

pub fn run_init(mode: OutputMode, config_path: &Path, force: bool) -> anyhow::Result<()> {
    let detector_config = DetectorConfig::default();
    config::write_config(config_path, &detector_config, force)?;

    let base = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    let db_path = detector_config.store(&base).path;
    config::ensure_db_dir(&db_path)?;

    if mode.is_human() {
        if !authorcheck::output::is_quiet() {
            ui::banner(
                &format!("{}", "Authorcheck".bold().style(theme().info.clone())),
                &format!("Version {}", env!("CARGO_PKG_VERSION").bold()),
            );
        }
        success(&format!("Config written to {}", config_path.display()));
        ui::info(&format!("{} Database", Icons::DATABASE), &db_path.display().to_string());
        ui::info(
            &format!("{} Artifacts", Icons::PACKAGE),
            &base.join(&detector_config.artifacts_dir).display().to_string(),
        );
    }

    emit_success(
        mode,
        "init",
        serde_json::json!({
            "config": config_path,
            "database": db_path,
        }),
    )
}
