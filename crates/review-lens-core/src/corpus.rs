//! A normalized review set with a stable identity.
//!
//! [`Corpus`] owns the normalized reviews for one analysis pass. Its SHA-256
//! fingerprint identifies the review set, so callers can key caches by
//! `(fingerprint, parameters)`. The aggregate block is computed on first
//! access and reused afterward.

use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use tracing::debug;

use crate::aggregate::{build_aggregates, Aggregates};
use crate::models::{NormalizedReview, RawReview};
use crate::normalize::Normalizer;

#[derive(Debug)]
pub struct Corpus {
    reviews: Vec<NormalizedReview>,
    fingerprint: String,
    aggregates: OnceLock<Aggregates>,
}

impl Corpus {
    pub fn new(reviews: Vec<NormalizedReview>) -> Self {
        let fingerprint = fingerprint(&reviews);
        debug!(reviews = reviews.len(), fingerprint = %fingerprint, "Corpus ready");
        Self {
            reviews,
            fingerprint,
            aggregates: OnceLock::new(),
        }
    }

    /// Normalize `raws` and wrap the result.
    pub fn from_raw(raws: &[RawReview], normalizer: &Normalizer) -> Self {
        Self::new(normalizer.normalize_all(raws))
    }

    pub fn reviews(&self) -> &[NormalizedReview] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Hex SHA-256 over every review's content, in order.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Aggregates for this review set, computed once.
    pub fn aggregates(&self) -> &Aggregates {
        self.aggregates.get_or_init(|| build_aggregates(&self.reviews))
    }
}

fn fingerprint(reviews: &[NormalizedReview]) -> String {
    let mut hasher = Sha256::new();
    for r in reviews {
        let date = r
            .canonical_date
            .instant()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "undated".to_string());
        for field in [
            r.source_url.as_str(),
            date.as_str(),
            r.reviewer.name.as_str(),
            r.main_text.as_str(),
            r.reply_text.as_deref().unwrap_or(""),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([r.rating]);
        hasher.update(r.useful_count.to_le_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}
