//! Core data models used throughout Review Lens.
//!
//! [`RawReview`] is the scraped record as it arrives in the corpus file.
//! [`NormalizedReview`] is the same record after date canonicalization,
//! reply splitting, and classification. Every derived structure in the
//! engine borrows `NormalizedReview`s; none of them copy or mutate one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// All valid star ratings, lowest first.
pub const RATINGS: [u8; 5] = [1, 2, 3, 4, 5];

/// Ratings at or below this value count as "low" for crisis detection.
pub const LOW_RATING_MAX: u8 = 2;

/// Zero-based slot for a rating in a `[_; 5]` per-rating array.
///
/// Ratings are validated by the normalizer, so this is always in `0..5`.
pub fn rating_slot(rating: u8) -> usize {
    (rating.clamp(1, 5) - 1) as usize
}

/// A review record exactly as produced by the scraper.
///
/// Every field is optional: scraped payloads routinely contain `null`s,
/// numbers where strings were expected, or missing keys. Decoding is
/// lenient so one odd field does not discard a whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub star_rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub review_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub useful_count: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub reviewer_avatar: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub reviewer_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub reviewer_initials: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32", skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Canonical review date.
///
/// `Undated` is the sentinel for strings the date normalizer could not
/// interpret. It is a separate variant rather than a fake instant so that
/// time-series, calendar, and trend computations can exclude it and sorts
/// can place it last instead of treating it as the earliest review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewDate {
    Dated(DateTime<Utc>),
    Undated,
}

impl ReviewDate {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            ReviewDate::Dated(dt) => Some(*dt),
            ReviewDate::Undated => None,
        }
    }

    /// Calendar day (UTC) of a dated review.
    pub fn day(&self) -> Option<NaiveDate> {
        self.instant().map(|dt| dt.date_naive())
    }

    pub fn is_dated(&self) -> bool {
        matches!(self, ReviewDate::Dated(_))
    }

    /// The instant, or the Unix epoch for undated reviews.
    ///
    /// Only for flat export formats that cannot carry a null date.
    pub fn instant_or_epoch(&self) -> DateTime<Utc> {
        match self {
            ReviewDate::Dated(dt) => *dt,
            ReviewDate::Undated => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Serialize for ReviewDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.instant().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReviewDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<DateTime<Utc>>::deserialize(deserializer)? {
            Some(dt) => ReviewDate::Dated(dt),
            None => ReviewDate::Undated,
        })
    }
}

/// Who wrote a review, inferred from its wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Seller,
    Buyer,
    Unknown,
}

impl UserType {
    pub const ALL: [UserType; 3] = [UserType::Seller, UserType::Buyer, UserType::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Seller => "seller",
            UserType::Buyer => "buyer",
            UserType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seller" => Ok(UserType::Seller),
            "buyer" => Ok(UserType::Buyer),
            "unknown" => Ok(UserType::Unknown),
            other => Err(format!(
                "unknown user type '{}'. Use seller, buyer, or unknown.",
                other
            )),
        }
    }
}

/// Reviewer identity block carried through from the raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    pub name: String,
    /// Raw initials, else derived from the name, else `"??"`.
    pub initials: String,
    pub avatar: Option<String>,
    pub link: Option<String>,
}

/// A review after normalization and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReview {
    pub reviewer: Reviewer,
    pub canonical_date: ReviewDate,
    /// Review body with any operator reply removed.
    pub main_text: String,
    /// Operator reply including its "Reply from ..." marker, if present.
    pub reply_text: Option<String>,
    /// Always in `1..=5`.
    pub rating: u8,
    pub useful_count: u32,
    pub user_type: UserType,
    /// Topic tags in classification-table order, no duplicates.
    pub topics: Vec<String>,
    /// Always in `0..=100`.
    pub quality_score: u8,
    /// Identity key across every derived structure.
    pub source_url: String,
    pub page_number: Option<u32>,
}

impl NormalizedReview {
    pub fn has_reply(&self) -> bool {
        self.reply_text.is_some()
    }

    /// Length of the main text in characters (not bytes).
    pub fn text_len(&self) -> usize {
        self.main_text.chars().count()
    }

    pub fn is_low_rating(&self) -> bool {
        self.rating <= LOW_RATING_MAX
    }
}
