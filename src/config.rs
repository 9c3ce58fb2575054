//! TOML configuration for `rlens`.
//!
//! Every section is optional. A missing config file is not an error: the CLI
//! falls back to [`Config::minimal`], which reads `./data/reviews.json` with
//! the built-in keyword tables.
//!
//! ```toml
//! [corpus]
//! path = "./data/trustpilot_reviews.json"
//! operator_names = ["Fiverr"]
//!
//! [analysis]
//! now = "2024-06-15T00:00:00Z"   # fixed "now" for "N days ago" dates
//!
//! [clustering]
//! threshold = 70                 # 50..=95
//! strategy = "greedy"            # or "connected"
//!
//! [classification]
//! extra_stop_words = ["gig"]
//! # seller_keywords / buyer_keywords / [[classification.topics]] replace
//! # the built-in tables when present.
//!
//! [state]
//! path = "./data/state.json"
//! ```

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use review_lens_core::classify::{KeywordTables, TopicRule};
use review_lens_core::cluster::{SimilarityStrategy, DEFAULT_THRESHOLD};
use review_lens_core::split::DEFAULT_OPERATOR;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Similarity thresholds accepted from configuration and the CLI.
pub const THRESHOLD_RANGE: std::ops::RangeInclusive<u8> = 50..=95;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
    #[serde(default = "default_operator_names")]
    pub operator_names: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
            operator_names: default_operator_names(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("./data/reviews.json")
}

fn default_operator_names() -> Vec<String> {
    vec![DEFAULT_OPERATOR.to_string()]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnalysisConfig {
    /// RFC 3339 instant used as "now"; the wall clock when unset.
    #[serde(default)]
    pub now: Option<String>,
}

impl AnalysisConfig {
    pub fn now(&self) -> Result<DateTime<Utc>> {
        match &self.now {
            Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("analysis.now is not an RFC 3339 timestamp: '{}'", raw)),
            None => Ok(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClusteringConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub strategy: SimilarityStrategy,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            strategy: SimilarityStrategy::default(),
        }
    }
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub seller_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub buyer_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub topics: Option<Vec<TopicRule>>,
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
}

impl ClassificationConfig {
    /// Built-in tables with any configured table swapped in.
    pub fn tables(&self) -> KeywordTables {
        let defaults = KeywordTables::default();
        KeywordTables {
            seller: self.seller_keywords.clone().unwrap_or(defaults.seller),
            buyer: self.buyer_keywords.clone().unwrap_or(defaults.buyer),
            topics: self.topics.clone().unwrap_or(defaults.topics),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./data/state.json")
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Load the config at `path`, or [`Config::minimal`] when the file is absent.
pub fn resolve_config(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        debug!(path = %path.display(), "No config file; using defaults");
        Ok(Config::minimal())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.corpus.operator_names.iter().all(|n| n.trim().is_empty()) {
        bail!("corpus.operator_names must contain at least one name");
    }

    config.analysis.now()?;

    if !THRESHOLD_RANGE.contains(&config.clustering.threshold) {
        bail!(
            "clustering.threshold must be in [{}, {}], got {}",
            THRESHOLD_RANGE.start(),
            THRESHOLD_RANGE.end(),
            config.clustering.threshold
        );
    }

    if let Some(topics) = &config.classification.topics {
        for (i, topic) in topics.iter().enumerate() {
            if topic.tag.trim().is_empty() {
                bail!("classification.topics[{}].tag must not be empty", i);
            }
            if topic.keywords.is_empty() {
                bail!(
                    "classification.topics[{}] ('{}') needs at least one keyword",
                    i,
                    topic.tag
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.clustering.threshold, 70);
        assert_eq!(cfg.clustering.strategy, SimilarityStrategy::Greedy);
        assert_eq!(cfg.corpus.operator_names, vec!["Fiverr"]);
        assert_eq!(cfg.state.path, PathBuf::from("./data/state.json"));
    }

    #[test]
    fn full_config_parses() {
        let file = write_config(
            r#"
[corpus]
path = "reviews.json"
operator_names = ["Acme"]

[analysis]
now = "2024-06-15T00:00:00Z"

[clustering]
threshold = 80
strategy = "connected"

[classification]
extra_stop_words = ["gig"]
seller_keywords = ["vendor"]

[[classification.topics]]
tag = "shipping"
keywords = ["parcel"]
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.clustering.strategy, SimilarityStrategy::Connected);
        assert_eq!(cfg.analysis.now().unwrap().to_rfc3339(), "2024-06-15T00:00:00+00:00");
        let tables = cfg.classification.tables();
        assert_eq!(tables.seller, vec!["vendor"]);
        assert!(!tables.buyer.is_empty());
        assert_eq!(tables.topics.len(), 1);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let file = write_config("[clustering]\nthreshold = 40\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("clustering.threshold"));
    }

    #[test]
    fn bad_now_is_rejected() {
        let file = write_config("[analysis]\nnow = \"last tuesday\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_resolves_to_minimal() {
        let cfg = resolve_config(Path::new("/nonexistent/rlens.toml")).unwrap();
        assert_eq!(cfg.corpus.path, PathBuf::from("./data/reviews.json"));
    }
}
