// 🗂️ History Store - append-only JSON array files
// Used for validation stats and pipeline run stats

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Load a history file.
///
/// A missing or malformed file yields an empty history; a single object
/// (older format) yields a one-element history.
pub fn load_history<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };

    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = ?path, error = %e, "history file is malformed, starting fresh");
            return Vec::new();
        }
    };

    let entries = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(path = ?path, error = %e, "skipping unreadable history entry");
                None
            }
        })
        .collect()
}

/// Append one entry and rewrite the file; returns the new history length
pub fn append_history<T: Serialize>(path: &Path, entry: &T) -> Result<usize> {
    let mut history: Vec<serde_json::Value> = load_history(path);
    history.push(serde_json::to_value(entry).context("Failed to serialize history entry")?);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create history directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(&history).context("Failed to encode history")?;
    fs::write(path, json).with_context(|| format!("Failed to write history: {:?}", path))?;

    Ok(history.len())
}

/// Most recent entry, if any
pub fn latest_entry<T: DeserializeOwned>(path: &Path) -> Option<T> {
    load_history(path).pop()
}
