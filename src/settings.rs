//! # Settings Module
//!
//! ## Purpose
//! Persisted user preferences (display language and visual theme) plus the
//! UI label table. Preferences are read once at startup from
//! `settings.json` and written back when changed from the settings menu;
//! nothing here participates in the calculation itself.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "lang": "en",
//!   "theme": "light"
//! }
//! ```
//!
//! Labels for both supported languages ship with the crate
//! (`src/assets/lang.json`); lookups fall back to English and then to the
//! key itself, so a missing translation never panics.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

pub const SETTINGS_FILE: &str = "settings.json";

const LANG_JSON: &str = include_str!("assets/lang.json");

static LABELS: LazyLock<HashMap<String, HashMap<String, String>>> = LazyLock::new(|| {
    serde_json::from_str(LANG_JSON).unwrap_or_else(|e| panic!("bad embedded lang.json: {}", e))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub lang: String,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            lang: "en".to_string(),
            theme: Theme::Light,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable (first run behaves like a reset).
    pub fn load(path: &str) -> Self {
        if !Path::new(path).exists() {
            return Settings::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("settings file '{}' is malformed ({}), using defaults", path, e);
                Settings::default()
            }),
            Err(e) => {
                warn!("cannot read settings file '{}' ({}), using defaults", path, e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// UI label in the configured language.
    pub fn label(&self, key: &str) -> &'static str {
        label(&self.lang, key)
    }
}

/// Label lookup: configured language, then English, then the key itself.
pub fn label(lang: &str, key: &str) -> &'static str {
    if let Some(text) = LABELS.get(lang).and_then(|table| table.get(key)) {
        return text;
    }
    if let Some(text) = LABELS.get("en").and_then(|table| table.get(key)) {
        return text;
    }
    Box::leak(key.to_string().into_boxed_str())
}
