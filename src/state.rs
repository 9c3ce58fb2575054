//! JSON file implementation of [`KeyValueStore`].
//!
//! The file holds one JSON object whose keys are store keys. Values that
//! are themselves JSON are stored inline so the file stays readable and
//! hand-editable. Writes go to a sibling temp file that is then renamed
//! over the original.

use anyhow::{Context, Result};
use review_lens_core::store::{KeyValueStore, SavedState};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Config;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read state file: {}", self.path.display()))
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Map<String, Value>>(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file is not a JSON object; treating it as empty"
                );
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create state directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.read_map()?;
        Ok(map.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("state file lock poisoned"))?;
        let mut map = self.read_map()?;
        let stored = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        map.insert(key.to_string(), stored);
        self.write_map(&map)
    }
}

/// Open the configured state file and load saved searches and collections.
pub fn open_state(config: &Config) -> Result<(JsonFileStore, SavedState)> {
    let store = JsonFileStore::new(&config.state.path);
    let state = SavedState::load(&store)?;
    debug!(
        path = %store.path().display(),
        searches = state.searches.len(),
        collections = state.collections.len(),
        "State opened"
    );
    Ok((store, state))
}
