//! Composable review filter with override slots.
//!
//! A [`FilterSpec`] AND-combines optional predicates. [`Overrides`] carry
//! explicit review sets chosen elsewhere (a collection, a calendar day, a
//! cluster group). When any override is active it replaces the composed
//! filter entirely; precedence is
//!
//! | Priority | Override |
//! |----------|----------|
//! | 1 | collection |
//! | 2 | calendar day |
//! | 3 | cluster group |
//! | 4 | composed filter (no override) |
//!
//! Results are then sorted by the filter's sort key. Undated reviews sort last
//! in both directions and ties keep input order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::models::{NormalizedReview, UserType};

/// Reply-presence predicate. Serializes as `true`, `false`, or `"all"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyPresence {
    #[default]
    All,
    With,
    Without,
}

impl Serialize for ReplyPresence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReplyPresence::All => serializer.serialize_str("all"),
            ReplyPresence::With => serializer.serialize_bool(true),
            ReplyPresence::Without => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for ReplyPresence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Flag(true) => Ok(ReplyPresence::With),
            Repr::Flag(false) => Ok(ReplyPresence::Without),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl FromStr for ReplyPresence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ReplyPresence::All),
            "true" | "yes" | "with" => Ok(ReplyPresence::With),
            "false" | "no" | "without" => Ok(ReplyPresence::Without),
            other => Err(format!(
                "unknown reply filter '{}'. Use true, false, or all.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Rating,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "rating" => Ok(SortKey::Rating),
            other => Err(format!("unknown sort key '{}'. Use date or rating.", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'. Use asc or desc.", other)),
        }
    }
}

/// Composed filter. Every field is optional; set fields are AND-combined.
///
/// This is the snapshot persisted for saved searches, so reloading it
/// reproduces the same result set and order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Case-insensitive substring over main text and reviewer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Also search reply text.
    pub include_replies: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    /// Inclusive from 00:00:00 UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive through 23:59:59.999 UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_useful: Option<u32>,
    pub has_reply: ReplyPresence,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl FilterSpec {
    /// True when no predicate is set; sort settings are ignored.
    pub fn is_empty(&self) -> bool {
        *self
            == FilterSpec {
                sort: self.sort,
                direction: self.direction,
                ..FilterSpec::default()
            }
    }

    /// Whether `review` satisfies every set predicate.
    pub fn matches(&self, review: &NormalizedReview) -> bool {
        if let Some(needle) = self.search_needle() {
            let hit = contains_ci(&review.main_text, &needle)
                || contains_ci(&review.reviewer.name, &needle)
                || (self.include_replies
                    && review
                        .reply_text
                        .as_deref()
                        .is_some_and(|reply| contains_ci(reply, &needle)));
            if !hit {
                return false;
            }
        }
        if self.rating.is_some_and(|rating| review.rating != rating) {
            return false;
        }
        if self.user_type.is_some_and(|t| review.user_type != t) {
            return false;
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(instant) = review.canonical_date.instant() else {
                return false;
            };
            if self.date_from.and_then(start_of_day).is_some_and(|from| instant < from) {
                return false;
            }
            if self.date_to.and_then(end_of_day).is_some_and(|to| instant > to) {
                return false;
            }
        }
        if self.min_useful.is_some_and(|min| review.useful_count < min) {
            return false;
        }
        match self.has_reply {
            ReplyPresence::All => true,
            ReplyPresence::With => review.has_reply(),
            ReplyPresence::Without => !review.has_reply(),
        }
    }

    fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Order two reviews by this spec's sort key and direction.
    pub fn compare(&self, a: &NormalizedReview, b: &NormalizedReview) -> Ordering {
        let directed = |ord: Ordering| match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        match self.sort {
            SortKey::Rating => directed(a.rating.cmp(&b.rating)),
            SortKey::Date => match (a.canonical_date.instant(), b.canonical_date.instant()) {
                (Some(x), Some(y)) => directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn start_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

fn end_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_milli_opt(23, 59, 59, 999).map(|naive| naive.and_utc())
}

/// Which override slot supplied the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    Collection,
    CalendarDay,
    ClusterGroup,
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverrideKind::Collection => "collection",
            OverrideKind::CalendarDay => "calendar day",
            OverrideKind::ClusterGroup => "cluster group",
        })
    }
}

/// Explicit review sets, each a list of source URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub collection: Option<Vec<String>>,
    pub calendar_day: Option<Vec<String>>,
    pub cluster_group: Option<Vec<String>>,
}

impl Overrides {
    /// The highest-priority populated slot.
    pub fn active(&self) -> Option<(OverrideKind, &[String])> {
        if let Some(urls) = &self.collection {
            return Some((OverrideKind::Collection, urls));
        }
        if let Some(urls) = &self.calendar_day {
            return Some((OverrideKind::CalendarDay, urls));
        }
        self.cluster_group
            .as_deref()
            .map(|urls| (OverrideKind::ClusterGroup, urls))
    }
}

/// Select and sort reviews.
///
/// With an active override, the result is every review whose source URL is
/// in the override set; otherwise every review matching `spec`.
pub fn apply_filter<'a>(
    reviews: &'a [NormalizedReview],
    spec: &FilterSpec,
    overrides: &Overrides,
) -> Vec<&'a NormalizedReview> {
    let mut selected: Vec<&NormalizedReview> = match overrides.active() {
        Some((_, urls)) => {
            let wanted: HashSet<&str> = urls.iter().map(String::as_str).collect();
            reviews
                .iter()
                .filter(|r| wanted.contains(r.source_url.as_str()))
                .collect()
        }
        None => reviews.iter().filter(|r| spec.matches(r)).collect(),
    };
    selected.sort_by(|a, b| spec.compare(a, b));
    selected
}
