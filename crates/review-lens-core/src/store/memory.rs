//! In-memory [`KeyValueStore`] for tests and embedding.
//!
//! A `HashMap` behind `std::sync::RwLock`. Nothing survives the process.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use super::KeyValueStore;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
