//! Flat key=value weight persistence
//!
//! One small text file per learning module. The format is a plain
//! `key=value` line list (decimal floats, `#` comments ignored). Persistence
//! is strictly best-effort: a missing file means defaults, an unparsable
//! value silently keeps its default, and write failures are swallowed after
//! a debug log. Learning must never take the engine down.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to one module's weight file.
#[derive(Clone, Debug)]
pub struct WeightStore {
    /// `None` disables persistence entirely (tests, embedded use).
    path: Option<PathBuf>,
}

impl WeightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// In-memory only: loads nothing, saves nowhere.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Load the stored mapping. Missing or unreadable file yields an empty
    /// map; individual bad values are dropped.
    pub fn load(&self) -> HashMap<String, f32> {
        match self.try_load() {
            Ok(map) => map,
            Err(e) => {
                log::debug!("weight store load skipped: {e}");
                HashMap::new()
            }
        }
    }

    fn try_load(&self) -> Result<HashMap<String, f32>, StoreError> {
        let mut map = HashMap::new();
        let Some(path) = &self.path else {
            return Ok(map);
        };
        if !path.exists() {
            return Ok(map);
        }
        let text = fs::read_to_string(path)?;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if let Ok(v) = value.trim().parse::<f32>() {
                map.insert(key.trim().to_string(), v);
            }
        }
        Ok(map)
    }

    /// Overwrite the file with the given entries (best-effort).
    pub fn save(&self, header: &str, entries: &[(&str, f32)]) {
        if let Err(e) = self.try_save(header, entries) {
            log::debug!("weight store save skipped: {e}");
        }
    }

    fn try_save(&self, header: &str, entries: &[(&str, f32)]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut out = String::with_capacity(64 + entries.len() * 24);
        out.push_str("# ");
        out.push_str(header);
        out.push('\n');
        for (key, value) in entries {
            out.push_str(key);
            out.push('=');
            out.push_str(&value.to_string());
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Read a single weight, falling back when missing or unparsable.
    pub fn get_or(map: &HashMap<String, f32>, key: &str, fallback: f32) -> f32 {
        map.get(key).copied().unwrap_or(fallback)
    }
}
