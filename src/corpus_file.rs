//! Reading the scraped review file.
//!
//! The scraper appends one JSON array per run, so a corpus file is often a
//! sequence of arrays (`[...][...]`) rather than a single document, and an
//! interrupted run can leave the last array unterminated. The loader:
//!
//! 1. Reads every top-level JSON value in sequence. Arrays contribute their
//!    items; a bare object is a single record.
//! 2. If input ends inside an array, closes it after the last complete
//!    object and keeps those records.
//! 3. Skips a `]` that closes nothing, with a warning.
//! 4. Decodes each item into a [`RawReview`], skipping (and logging) items
//!    that are not review objects.

use anyhow::{bail, Context, Result};
use review_lens_core::corpus::Corpus;
use review_lens_core::models::RawReview;
use review_lens_core::normalize::{NormalizeOptions, Normalizer};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Load and normalize the configured corpus.
pub fn load_corpus(config: &Config) -> Result<Corpus> {
    let normalizer = build_normalizer(config)?;
    load_corpus_with(config, &normalizer)
}

/// [`load_corpus`] with a caller-built normalizer, for commands that also
/// need its reply splitter.
pub fn load_corpus_with(config: &Config, normalizer: &Normalizer) -> Result<Corpus> {
    let raws = load_raw_reviews(&config.corpus.path)?;
    let corpus = Corpus::from_raw(&raws, normalizer);
    info!(
        path = %config.corpus.path.display(),
        now = %normalizer.now(),
        raw = raws.len(),
        normalized = corpus.len(),
        "Corpus loaded"
    );
    Ok(corpus)
}

pub fn build_normalizer(config: &Config) -> Result<Normalizer> {
    let opts = NormalizeOptions {
        now: config.analysis.now()?,
        operator_names: config.corpus.operator_names.clone(),
        tables: config.classification.tables(),
    };
    Normalizer::new(&opts).context("Invalid operator names in corpus.operator_names")
}

pub fn load_raw_reviews(path: &Path) -> Result<Vec<RawReview>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    parse_raw_reviews(&content)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))
}

/// Parse corpus text, repairing concatenated and truncated arrays.
pub fn parse_raw_reviews(content: &str) -> Result<Vec<RawReview>> {
    let items = read_items(content)?;
    let total = items.len();
    let reviews: Vec<RawReview> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<RawReview>(item) {
            Ok(review) => Some(review),
            Err(e) => {
                warn!(index, error = %e, "Skipping corpus item that is not a review object");
                None
            }
        })
        .collect();
    debug!(items = total, decoded = reviews.len(), "Corpus items decoded");
    Ok(reviews)
}

fn read_items(content: &str) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    let mut batches = 0usize;
    let mut base = 0usize;

    'batches: while base < content.len() {
        let mut stream = serde_json::Deserializer::from_str(&content[base..]).into_iter::<Value>();
        loop {
            let offset = base + stream.byte_offset();
            match stream.next() {
                None => break 'batches,
                Some(Ok(value)) => {
                    batches += 1;
                    push_value(&mut items, value);
                }
                Some(Err(e)) if e.is_eof() => {
                    let recovered = recover_truncated(&content[offset..])
                        .with_context(|| format!("Corpus ends mid-value at byte {}", offset))?;
                    warn!(
                        offset,
                        recovered = recovered.len(),
                        "Corpus file is truncated; recovered complete records from the last batch"
                    );
                    items.extend(recovered);
                    batches += 1;
                    break 'batches;
                }
                Some(Err(e)) => match stray_bracket(content, offset) {
                    Some(at) => {
                        warn!(offset = at, "Skipping stray ']' in corpus file");
                        base = at + 1;
                        continue 'batches;
                    }
                    None => {
                        return Err(e).with_context(|| format!("Malformed JSON near byte {}", offset));
                    }
                },
            }
        }
    }

    if batches > 1 {
        info!(batches, items = items.len(), "Merged concatenated corpus batches");
    }
    Ok(items)
}

/// Byte position of a `]` that closes nothing, if one starts the input at
/// `offset` after whitespace. An interrupted append can leave one behind.
fn stray_bracket(content: &str, offset: usize) -> Option<usize> {
    let rest = &content[offset..];
    let trimmed = rest.trim_start();
    trimmed
        .starts_with(']')
        .then(|| offset + (rest.len() - trimmed.len()))
}

fn push_value(items: &mut Vec<Value>, value: Value) {
    match value {
        Value::Array(values) => items.extend(values),
        other => items.push(other),
    }
}

/// Close an unterminated array after its last complete object.
fn recover_truncated(tail: &str) -> Result<Vec<Value>> {
    let tail = tail.trim_start();
    if !tail.starts_with('[') {
        bail!("only a truncated array can be recovered");
    }
    let mut end = tail.len();
    while let Some(pos) = tail[..end].rfind('}') {
        let candidate = format!("{}]", &tail[..=pos]);
        if let Ok(values) = serde_json::from_str::<Vec<Value>>(&candidate) {
            return Ok(values);
        }
        end = pos;
    }
    Ok(Vec::new())
}
