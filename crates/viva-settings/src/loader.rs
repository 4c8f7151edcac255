//! Settings loading: defaults → JSON file (deep merge) → env overrides.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::VivaSettings;

/// Resolve the settings file path.
///
/// `VIVA_SETTINGS` wins when set; otherwise `~/.viva/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var("VIVA_SETTINGS") {
        return PathBuf::from(path);
    }
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(".viva").join("settings.json")
}

/// Load settings from the default path with env overrides applied.
///
/// A missing file is not an error — defaults are used.
pub fn load_settings() -> Result<VivaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file, deep-merging over compiled defaults
/// and applying `VIVA_*` env overrides last.
pub fn load_settings_from_path(path: &Path) -> Result<VivaSettings> {
    let defaults = serde_json::to_value(VivaSettings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let file_value: Value = serde_json::from_str(&raw)?;
        debug!(?path, "settings file loaded");
        deep_merge(defaults, file_value)
    } else {
        debug!(?path, "no settings file, using defaults");
        defaults
    };

    let mut settings: VivaSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Deep-merge `overlay` onto `base`. Objects merge recursively; any other
/// value in `overlay` replaces the base value wholesale.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Apply `VIVA_*` environment overrides (highest priority layer).
fn apply_env_overrides(settings: &mut VivaSettings) {
    if let Ok(key) = std::env::var("VIVA_EVALUATOR_API_KEY") {
        settings.evaluator.api_key = Some(key);
    }
    if let Ok(url) = std::env::var("VIVA_EVALUATOR_BASE_URL") {
        settings.evaluator.base_url = url;
    }
    if let Ok(url) = std::env::var("VIVA_SPEECH_BASE_URL") {
        settings.speech.base_url = url;
    }
    if let Ok(url) = std::env::var("VIVA_DOCUMENT_BASE_URL") {
        settings.store.document_base_url = Some(url);
    }
    if let Ok(path) = std::env::var("VIVA_SQLITE_PATH") {
        settings.store.sqlite_path = path;
    }
    if let Ok(dir) = std::env::var("VIVA_RUBRIC_DIR") {
        settings.pipeline.rubric_dir = dir;
    }
    if let Ok(port) = std::env::var("VIVA_PORT") {
        match port.parse() {
            Ok(port) => settings.server.port = port,
            Err(_) => warn!(%port, "ignoring non-numeric VIVA_PORT"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
