//! Persistence for saved searches and collections.
//!
//! The [`KeyValueStore`] trait is the only storage seam: string values under
//! string keys. [`SavedState`] serializes its two lists to JSON under
//! [`SEARCHES_KEY`] and [`COLLECTIONS_KEY`] and is loaded once at start,
//! then written back after every mutation by the caller.
//!
//! Loading is lenient. A record that fails to decode is logged and
//! skipped; the rest of the list survives.
//!
//! | Implementation | Crate |
//! |----------------|-------|
//! | [`memory::InMemoryStore`] | this crate, for tests and embedding |
//! | JSON file store | `review-lens` application |

pub mod memory;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filter::FilterSpec;

pub const SEARCHES_KEY: &str = "saved_searches";
pub const COLLECTIONS_KEY: &str = "collections";

/// String key-value storage backend.
///
/// Implementations must be `Send + Sync` so state can be shared with
/// worker threads.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// A named filter snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    pub spec: FilterSpec,
}

/// A named, ordered list of review source URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: String,
    pub name: String,
    pub source_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Every persisted saved search and collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedState {
    pub searches: Vec<SavedSearch>,
    pub collections: Vec<CollectionRecord>,
}

impl SavedState {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        Ok(Self {
            searches: load_list(store, SEARCHES_KEY)?,
            collections: load_list(store, COLLECTIONS_KEY)?,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let searches = serde_json::to_string(&self.searches)?;
        let collections = serde_json::to_string(&self.collections)?;
        store
            .set(SEARCHES_KEY, &searches)
            .context("Failed to persist saved searches")?;
        store
            .set(COLLECTIONS_KEY, &collections)
            .context("Failed to persist collections")?;
        Ok(())
    }

    pub fn find_search(&self, name: &str) -> Option<&SavedSearch> {
        self.searches.iter().find(|s| s.name == name)
    }

    /// Save `spec` under `name`, replacing the snapshot of an existing
    /// search with that name (its id is kept).
    pub fn save_search(&mut self, name: &str, spec: FilterSpec) -> &SavedSearch {
        let index = match self.searches.iter().position(|s| s.name == name) {
            Some(i) => {
                self.searches[i].spec = spec;
                i
            }
            None => {
                self.searches.push(SavedSearch {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    spec,
                });
                self.searches.len() - 1
            }
        };
        &self.searches[index]
    }

    /// Returns whether a search was removed.
    pub fn delete_search(&mut self, name: &str) -> bool {
        let before = self.searches.len();
        self.searches.retain(|s| s.name != name);
        self.searches.len() != before
    }

    pub fn find_collection(&self, name: &str) -> Option<&CollectionRecord> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn create_collection(&mut self, name: &str, now: DateTime<Utc>) -> Result<&CollectionRecord> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Collection name must not be empty");
        }
        if self.find_collection(name).is_some() {
            bail!("Collection '{}' already exists", name);
        }
        self.collections.push(CollectionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            source_urls: Vec::new(),
            created_at: now,
        });
        Ok(&self.collections[self.collections.len() - 1])
    }

    /// Append URLs not already in the collection; returns how many were added.
    pub fn add_to_collection(&mut self, name: &str, urls: &[String]) -> Result<usize> {
        let Some(collection) = self.collections.iter_mut().find(|c| c.name == name) else {
            bail!("Unknown collection '{}'", name);
        };
        let mut added = 0;
        for url in urls {
            let url = url.trim();
            if !url.is_empty() && !collection.source_urls.iter().any(|u| u == url) {
                collection.source_urls.push(url.to_string());
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn delete_collection(&mut self, name: &str) -> bool {
        let before = self.collections.len();
        self.collections.retain(|c| c.name != name);
        self.collections.len() != before
    }
}

fn load_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    let Some(raw) = store
        .get(key)
        .with_context(|| format!("Failed to read '{}' from state store", key))?
    else {
        return Ok(Vec::new());
    };

    let items: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable state entry");
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key, index, error = %e, "Skipping malformed state record");
                None
            }
        })
        .collect())
}
