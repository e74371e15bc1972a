//! # Cache Manager Module
//!
//! ## Purpose
//! Remembers the last-entered list of material formulas per material count,
//! so the entry screen can pre-fill fields from the previous session. The
//! cache is purely advisory: losing or corrupting it never affects a
//! calculation.
//!
//! ## Cache Format
//! `cache_materials.json`, keyed by the material count (stringified for the
//! JSON object):
//! ```json
//! {
//!   "3": ["Li2O", "SiO2", "MoO3"]
//! }
//! ```

use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const CACHE_FILE: &str = "cache_materials.json";

/// Filesystem-backed material input cache.
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache: HashMap<String, Vec<String>>,
    cache_file: String,
}

impl CacheManager {
    /// Opens the cache at the default location, starting empty when the file
    /// is missing or unreadable.
    pub fn new() -> Self {
        Self::with_cache_file(CACHE_FILE)
    }

    /// Opens a cache at a custom path (used by tests).
    pub fn with_cache_file(cache_file: &str) -> Self {
        let cache = Self::load_cache(cache_file).unwrap_or_default();
        CacheManager {
            cache,
            cache_file: cache_file.to_string(),
        }
    }

    fn load_cache(cache_file: &str) -> Option<HashMap<String, Vec<String>>> {
        if !Path::new(cache_file).exists() {
            return None;
        }
        match fs::read_to_string(cache_file) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!("material cache '{}' is malformed ({}), ignoring it", cache_file, e);
                    None
                }
            },
            Err(e) => {
                warn!("cannot read material cache '{}' ({})", cache_file, e);
                None
            }
        }
    }

    /// Cached formulas for a given material count, padded with empty strings
    /// to exactly `n` entries when nothing (or something shorter) is cached.
    pub fn cached_materials(&self, n: usize) -> Vec<String> {
        let mut materials = self
            .cache
            .get(&n.to_string())
            .cloned()
            .unwrap_or_default();
        materials.resize(n, String::new());
        materials
    }

    /// Stores the list under its length and persists the cache.
    pub fn store_materials(&mut self, materials: &[String]) -> Result<(), Box<dyn std::error::Error>> {
        self.cache
            .insert(materials.len().to_string(), materials.to_vec());
        let content = serde_json::to_string_pretty(&self.cache)?;
        fs::write(&self.cache_file, content)?;
        Ok(())
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}
