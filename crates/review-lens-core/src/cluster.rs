//! Clustering engine: topic, similarity, and rating groupings.
//!
//! | Mode | Grouping | Order |
//! |------|----------|-------|
//! | [`ClusterMode::Topic`] | one bucket per topic tag, `other` for untagged | count desc, stable |
//! | [`ClusterMode::Similarity`] | edit-distance similarity ≥ threshold | first member position |
//! | [`ClusterMode::Rating`] | one group per rating present | rating desc |
//!
//! Groups borrow their members from the input slice. Empty or single-review
//! input produces no groups in every mode.
//!
//! # Similarity
//!
//! `similarity(a, b) = (max_len - levenshtein(a, b)) / max_len * 100` over
//! lowercased text, with `max_len` counted in characters and `0` when both
//! texts are empty. Two strategies:
//!
//! - **Greedy** (default): walk reviews in input order; each unclaimed review
//!   seeds a group and claims every later unclaimed review meeting the
//!   threshold. Results depend on input order.
//! - **Connected**: union every pair meeting the threshold and emit the
//!   connected components. Order-independent, but a chain of pairwise
//!   similar reviews can join dissimilar endpoints.
//!
//! Both are `O(n² · L)`; intended for hundreds to low thousands of reviews.
//! Cancellation is checked between outer-loop iterations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

use crate::models::{NormalizedReview, RATINGS};

pub const DEFAULT_THRESHOLD: u8 = 70;

/// Tag used for reviews with no topic in topic mode.
pub const OTHER_TOPIC: &str = "other";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("clustering cancelled after {processed} of {total} reviews")]
    Cancelled { processed: usize, total: usize },
    #[error("similarity threshold {0} is outside 0..=100")]
    InvalidThreshold(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMode {
    Topic,
    Similarity,
    Rating,
}

impl fmt::Display for ClusterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClusterMode::Topic => "topic",
            ClusterMode::Similarity => "similarity",
            ClusterMode::Rating => "rating",
        })
    }
}

impl FromStr for ClusterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "topic" => Ok(ClusterMode::Topic),
            "similarity" => Ok(ClusterMode::Similarity),
            "rating" => Ok(ClusterMode::Rating),
            other => Err(format!(
                "unknown cluster mode '{}'. Use topic, similarity, or rating.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityStrategy {
    #[default]
    Greedy,
    Connected,
}

impl fmt::Display for SimilarityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SimilarityStrategy::Greedy => "greedy",
            SimilarityStrategy::Connected => "connected",
        })
    }
}

impl FromStr for SimilarityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(SimilarityStrategy::Greedy),
            "connected" => Ok(SimilarityStrategy::Connected),
            other => Err(format!(
                "unknown similarity strategy '{}'. Use greedy or connected.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Minimum similarity percentage, `0..=100`.
    pub threshold: u8,
    pub strategy: SimilarityStrategy,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strategy: SimilarityStrategy::Greedy,
        }
    }
}

/// Observer for similarity clustering progress.
pub trait ClusterProgress {
    /// Called before each outer-loop iteration and once at completion.
    fn on_progress(&self, processed: usize, total: usize);
}

/// Progress observer that ignores every update.
pub struct NoClusterProgress;

impl ClusterProgress for NoClusterProgress {
    fn on_progress(&self, _processed: usize, _total: usize) {}
}

/// A set of reviews produced by one clustering mode.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewGroup<'a> {
    pub id: String,
    pub label: String,
    pub members: Vec<&'a NormalizedReview>,
    pub count: usize,
    /// Seed text; similarity mode only.
    pub representative: Option<String>,
}

impl<'a> ReviewGroup<'a> {
    fn new(
        id: String,
        label: String,
        members: Vec<&'a NormalizedReview>,
        representative: Option<String>,
    ) -> Self {
        let count = members.len();
        Self {
            id,
            label,
            members,
            count,
            representative,
        }
    }

    /// Member source URLs in member order.
    pub fn source_urls(&self) -> Vec<String> {
        self.members.iter().map(|r| r.source_url.clone()).collect()
    }
}

/// Look up a group by id.
pub fn find_group<'g, 'a>(groups: &'g [ReviewGroup<'a>], id: &str) -> Option<&'g ReviewGroup<'a>> {
    groups.iter().find(|g| g.id == id)
}

/// Run one clustering mode.
///
/// `cancel` and `progress` are only consulted by similarity mode; the other
/// modes are linear and always complete.
pub fn cluster<'a>(
    reviews: &'a [NormalizedReview],
    mode: ClusterMode,
    opts: &ClusterOptions,
    cancel: &AtomicBool,
    progress: &dyn ClusterProgress,
) -> Result<Vec<ReviewGroup<'a>>, ClusterError> {
    let groups = match mode {
        ClusterMode::Topic => topic_groups(reviews),
        ClusterMode::Rating => rating_groups(reviews),
        ClusterMode::Similarity => similarity_groups(reviews, opts, cancel, progress)?,
    };
    debug!(
        mode = %mode,
        reviews = reviews.len(),
        groups = groups.len(),
        "Clustering complete"
    );
    Ok(groups)
}

/// Bucket reviews by topic tag; a review joins every bucket it is tagged with.
pub fn topic_groups(reviews: &[NormalizedReview]) -> Vec<ReviewGroup<'_>> {
    if reviews.len() < 2 {
        return Vec::new();
    }

    let mut buckets: Vec<(String, Vec<&NormalizedReview>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in reviews {
        let tags: Vec<&str> = if r.topics.is_empty() {
            vec![OTHER_TOPIC]
        } else {
            r.topics.iter().map(String::as_str).collect()
        };
        for tag in tags {
            match index.get(tag) {
                Some(&i) => buckets[i].1.push(r),
                None => {
                    index.insert(tag.to_string(), buckets.len());
                    buckets.push((tag.to_string(), vec![r]));
                }
            }
        }
    }

    buckets.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    buckets
        .into_iter()
        .map(|(tag, members)| {
            ReviewGroup::new(format!("topic-{}", tag), tag, members, None)
        })
        .collect()
}

/// Partition by rating, highest rating first; empty ratings are omitted.
pub fn rating_groups(reviews: &[NormalizedReview]) -> Vec<ReviewGroup<'_>> {
    if reviews.len() < 2 {
        return Vec::new();
    }
    RATINGS
        .iter()
        .rev()
        .filter_map(|&rating| {
            let members: Vec<&NormalizedReview> =
                reviews.iter().filter(|r| r.rating == rating).collect();
            if members.is_empty() {
                return None;
            }
            Some(ReviewGroup::new(
                format!("rating-{}", rating),
                rating_label(rating),
                members,
                None,
            ))
        })
        .collect()
}

/// `"1 Star"`, `"2 Stars"`, …
pub fn rating_label(rating: u8) -> String {
    if rating == 1 {
        "1 Star".to_string()
    } else {
        format!("{} Stars", rating)
    }
}

/// Similarity percentage between two texts, case-insensitive.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    similarity_lower(&a, a.chars().count(), &b, b.chars().count())
}

fn similarity_lower(a: &str, a_len: usize, b: &str, b_len: usize) -> f64 {
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 0.0;
    }
    let distance = strsim::levenshtein(a, b);
    (max_len - distance.min(max_len)) as f64 / max_len as f64 * 100.0
}

/// Lowercased texts with their character lengths, computed once per pass.
struct SimilarityInput {
    texts: Vec<String>,
    lens: Vec<usize>,
    threshold: f64,
}

impl SimilarityInput {
    fn new(reviews: &[NormalizedReview], threshold: u8) -> Self {
        let texts: Vec<String> = reviews.iter().map(|r| r.main_text.to_lowercase()).collect();
        let lens = texts.iter().map(|t| t.chars().count()).collect();
        Self {
            texts,
            lens,
            threshold: threshold as f64,
        }
    }

    /// Whether reviews `i` and `j` meet the threshold.
    ///
    /// Edit distance is at least the length difference, so pairs whose
    /// length ratio alone falls below the threshold are rejected early.
    fn similar(&self, i: usize, j: usize) -> bool {
        let (li, lj) = (self.lens[i], self.lens[j]);
        let max_len = li.max(lj);
        if max_len > 0 && (li.min(lj) as f64 / max_len as f64 * 100.0) < self.threshold {
            return false;
        }
        similarity_lower(&self.texts[i], li, &self.texts[j], lj) >= self.threshold
    }
}

/// Group near-duplicate reviews by edit-distance similarity.
pub fn similarity_groups<'a>(
    reviews: &'a [NormalizedReview],
    opts: &ClusterOptions,
    cancel: &AtomicBool,
    progress: &dyn ClusterProgress,
) -> Result<Vec<ReviewGroup<'a>>, ClusterError> {
    if opts.threshold > 100 {
        return Err(ClusterError::InvalidThreshold(opts.threshold));
    }
    if reviews.len() < 2 {
        return Ok(Vec::new());
    }

    let input = SimilarityInput::new(reviews, opts.threshold);
    let components = match opts.strategy {
        SimilarityStrategy::Greedy => greedy_components(&input, cancel, progress)?,
        SimilarityStrategy::Connected => connected_components(&input, cancel, progress)?,
    };

    Ok(components
        .into_iter()
        .enumerate()
        .map(|(n, indices)| {
            let seed = &reviews[indices[0]];
            ReviewGroup::new(
                format!("similar-{}", n + 1),
                format!("Similar group {}", n + 1),
                indices.iter().map(|&i| &reviews[i]).collect(),
                Some(seed.main_text.clone()),
            )
        })
        .collect())
}

fn check_cancel(cancel: &AtomicBool, processed: usize, total: usize) -> Result<(), ClusterError> {
    if cancel.load(Ordering::Relaxed) {
        debug!(processed, total, "Similarity clustering cancelled");
        return Err(ClusterError::Cancelled { processed, total });
    }
    Ok(())
}

fn greedy_components(
    input: &SimilarityInput,
    cancel: &AtomicBool,
    progress: &dyn ClusterProgress,
) -> Result<Vec<Vec<usize>>, ClusterError> {
    let n = input.texts.len();
    let mut claimed = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        check_cancel(cancel, i, n)?;
        progress.on_progress(i, n);
        if claimed[i] {
            continue;
        }
        let mut members = vec![i];
        for j in (i + 1)..n {
            if !claimed[j] && input.similar(i, j) {
                members.push(j);
            }
        }
        if members.len() > 1 {
            for &m in &members {
                claimed[m] = true;
            }
            groups.push(members);
        }
    }
    progress.on_progress(n, n);
    Ok(groups)
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn connected_components(
    input: &SimilarityInput,
    cancel: &AtomicBool,
    progress: &dyn ClusterProgress,
) -> Result<Vec<Vec<usize>>, ClusterError> {
    let n = input.texts.len();
    let mut parent: Vec<usize> = (0..n).collect();

    for i in 0..n {
        check_cancel(cancel, i, n)?;
        progress.on_progress(i, n);
        for j in (i + 1)..n {
            if input.similar(i, j) {
                let (ri, rj) = (find_root(&mut parent, i), find_root(&mut parent, j));
                if ri != rj {
                    // Lower index as root keeps the first member as the seed.
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }
    progress.on_progress(n, n);

    let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        let root = find_root(&mut parent, i);
        by_root[root].push(i);
    }
    Ok(by_root.into_iter().filter(|members| members.len() > 1).collect())
}
