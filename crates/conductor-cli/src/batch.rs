//! Loading task batches from TOML or JSON files.

use anyhow::{Context as _, Result, bail};
use conductor_core::Task;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

#[derive(Deserialize)]
struct TaskBatch {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Parses a batch: a JSON array of tasks or `{"tasks": [...]}` when `json` is set,
/// otherwise TOML with `[[tasks]]` entries.
///
/// # Errors
/// Returns an error if the text does not parse or two tasks share an id.
pub fn parse_batch(contents: &str, json: bool) -> Result<Vec<Task>> {
    let tasks = if json {
        let value: serde_json::Value =
            serde_json::from_str(contents).context("Invalid JSON task batch")?;
        if value.is_array() {
            serde_json::from_value(value).context("Invalid task in JSON batch")?
        } else {
            serde_json::from_value::<TaskBatch>(value)
                .context("Invalid JSON task batch")?
                .tasks
        }
    } else {
        toml::from_str::<TaskBatch>(contents)
            .context("Invalid TOML task batch")?
            .tasks
    };

    let mut seen = HashSet::new();
    for task in &tasks {
        if !seen.insert(task.id.as_str()) {
            bail!("Duplicate task id {:?} in batch", task.id.as_str());
        }
    }

    Ok(tasks)
}

/// Reads a batch file; `.json` files are parsed as JSON, anything else as TOML.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub async fn load_batch(path: &Path) -> Result<Vec<Task>> {
    let contents = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read task batch {}", path.display()))?;
    let json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

    let tasks = parse_batch(&contents, json)
        .with_context(|| format!("Failed to load task batch {}", path.display()))?;
    tracing::debug!(path = %path.display(), tasks = tasks.len(), "Loaded task batch");
    Ok(tasks)
}
