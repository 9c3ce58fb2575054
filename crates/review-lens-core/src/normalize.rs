//! Raw record → [`NormalizedReview`] pipeline.
//!
//! A [`Normalizer`] bundles everything one analysis pass needs to turn
//! scraped records into normalized reviews: the fixed `now` used for
//! relative dates, the reply splitter, and the keyword classifier.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::classify::{quality_score, Classifier, KeywordTables};
use crate::date::normalize_date;
use crate::models::{NormalizedReview, RawReview, Reviewer};
use crate::split::ReplySplitter;

/// Inputs that parameterize normalization.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Reference instant for `"N days ago"` dates.
    pub now: DateTime<Utc>,
    /// Operator names recognized in `"Reply from <name>"` markers.
    pub operator_names: Vec<String>,
    pub tables: KeywordTables,
}

impl NormalizeOptions {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            operator_names: vec![crate::split::DEFAULT_OPERATOR.to_string()],
            tables: KeywordTables::default(),
        }
    }
}

/// Normalizes raw reviews for one analysis pass.
#[derive(Debug, Clone)]
pub struct Normalizer {
    now: DateTime<Utc>,
    splitter: ReplySplitter,
    classifier: Classifier,
}

impl Normalizer {
    pub fn new(opts: &NormalizeOptions) -> Result<Self> {
        Ok(Self {
            now: opts.now,
            splitter: ReplySplitter::new(&opts.operator_names)?,
            classifier: Classifier::new(&opts.tables),
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn splitter(&self) -> &ReplySplitter {
        &self.splitter
    }

    /// Normalize one record.
    ///
    /// Returns `None` when the star rating is missing or non-numeric; such
    /// a record cannot satisfy the `1..=5` rating invariant.
    pub fn normalize(&self, raw: &RawReview) -> Option<NormalizedReview> {
        let rating = parse_rating(raw.star_rating.as_deref()?)?;

        let text = raw.review_text.as_deref().unwrap_or("");
        let split = self.splitter.split(text);
        let useful_count = parse_useful(raw.useful_count.as_deref());
        let name = raw.reviewer_name.as_deref().unwrap_or("").trim().to_string();

        let initials = raw
            .reviewer_initials
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| derive_initials(&name));

        Some(NormalizedReview {
            reviewer: Reviewer {
                initials,
                name,
                avatar: non_empty(raw.reviewer_avatar.as_deref()),
                link: non_empty(raw.reviewer_link.as_deref()),
            },
            canonical_date: normalize_date(raw.date.as_deref().unwrap_or(""), self.now),
            user_type: self.classifier.user_type(&split.main_text),
            topics: self.classifier.topics(&split.main_text),
            quality_score: quality_score(&split.main_text, useful_count),
            main_text: split.main_text,
            reply_text: split.reply_text,
            rating,
            useful_count,
            source_url: raw.source_url.as_deref().unwrap_or("").trim().to_string(),
            page_number: raw.page_number,
        })
    }

    /// Normalize a batch, skipping (and logging) unusable records.
    ///
    /// Output order follows input order.
    pub fn normalize_all(&self, raws: &[RawReview]) -> Vec<NormalizedReview> {
        let mut out = Vec::with_capacity(raws.len());
        for (index, raw) in raws.iter().enumerate() {
            match self.normalize(raw) {
                Some(review) => out.push(review),
                None => warn!(
                    index,
                    star_rating = ?raw.star_rating,
                    source_url = ?raw.source_url,
                    "Skipping review without a usable star rating"
                ),
            }
        }
        let undated = out.iter().filter(|r| !r.canonical_date.is_dated()).count();
        debug!(
            input = raws.len(),
            normalized = out.len(),
            undated,
            "Normalization pass complete"
        );
        out
    }
}

/// Parse a star rating, clamping numeric values into `1..=5`.
pub fn parse_rating(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(1.0, 5.0) as u8)
}

fn parse_useful(raw: Option<&str>) -> u32 {
    raw.map(str::trim)
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0)
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Up to two uppercase initials from a display name, else `"??"`.
pub fn derive_initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .take(2)
        .flat_map(|c| c.to_uppercase())
        .collect();
    if initials.is_empty() {
        "??".to_string()
    } else {
        initials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReviewDate, UserType};
    use chrono::TimeZone;

    fn normalizer() -> Normalizer {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        Normalizer::new(&NormalizeOptions::new(now)).unwrap()
    }

    fn raw(rating: Option<&str>, text: &str) -> RawReview {
        RawReview {
            reviewer_name: Some("Jane Q Doe".into()),
            date: Some("Updated Jun 1, 2024".into()),
            star_rating: rating.map(|s| s.to_string()),
            review_text: Some(text.into()),
            useful_count: Some("".into()),
            source_url: Some("https://example.test/r/1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_full_record() {
        let n = normalizer();
        let r = n
            .normalize(&raw(Some("2"), "I hired a designer. Reply from Fiverr: sorry"))
            .unwrap();
        assert_eq!(r.rating, 2);
        assert_eq!(r.useful_count, 0);
        assert_eq!(r.main_text, "I hired a designer.");
        assert!(r.has_reply());
        assert_eq!(r.user_type, UserType::Buyer);
        assert_eq!(r.reviewer.initials, "JQ");
        assert_eq!(r.reviewer.avatar, None);
        assert_eq!(
            r.canonical_date,
            ReviewDate::Dated(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_or_garbage_rating_is_skipped() {
        let n = normalizer();
        assert!(n.normalize(&raw(None, "x")).is_none());
        assert!(n.normalize(&raw(Some("five"), "x")).is_none());
        let all = n.normalize_all(&[raw(Some("5"), "a"), raw(None, "b")]);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn numeric_ratings_are_clamped() {
        assert_eq!(parse_rating("0"), Some(1));
        assert_eq!(parse_rating("7"), Some(5));
        assert_eq!(parse_rating(" 4 "), Some(4));
        assert_eq!(parse_rating("NaN"), None);
    }

    #[test]
    fn initials_fallbacks() {
        assert_eq!(derive_initials("ada lovelace byron"), "AL");
        assert_eq!(derive_initials("  "), "??");
        assert_eq!(derive_initials("Émile"), "É");
    }

    #[test]
    fn raw_initials_win() {
        let n = normalizer();
        let mut r = raw(Some("3"), "fine");
        r.reviewer_initials = Some("XY".into());
        assert_eq!(n.normalize(&r).unwrap().reviewer.initials, "XY");
    }
}
