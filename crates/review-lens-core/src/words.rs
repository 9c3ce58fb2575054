//! Word frequency mining over review main texts.
//!
//! # Algorithm
//!
//! 1. Lowercase the text and replace runs of non-word characters with a
//!    space.
//! 2. Split on whitespace.
//! 3. Drop tokens shorter than [`MIN_TERM_CHARS`] characters and stop words
//!    (built-in English and domain list, plus configured extras).
//! 4. Count, then stable-sort by count descending so ties keep the order
//!    in which terms were first seen.
//!
//! Reply text is never mined; operator boilerplate would dominate.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::models::{NormalizedReview, RATINGS};

pub const MIN_TERM_CHARS: usize = 4;
pub const TOP_GLOBAL: usize = 50;
pub const TOP_PER_RATING: usize = 10;

const STOP_WORDS: &[&str] = &[
    // generic English
    "about", "above", "after", "again", "against", "also", "always", "another", "anything",
    "because", "been", "before", "being", "below", "between", "both", "cannot", "could",
    "didn", "does", "doesn", "doing", "done", "down", "during", "each", "even", "every",
    "from", "further", "getting", "going", "gone", "have", "having", "here", "into", "just",
    "know", "like", "made", "make", "many", "more", "most", "much", "must", "need", "never",
    "none", "only", "other", "over", "really", "said", "same", "should", "since", "some",
    "something", "still", "such", "than", "that", "their", "them", "then", "there", "these",
    "they", "thing", "things", "this", "those", "through", "time", "under", "until", "very",
    "want", "wasn", "well", "were", "what", "when", "where", "which", "while", "will", "with",
    "within", "without", "would", "your", "yours", "yourself",
    // domain
    "fiverr", "trustpilot", "seller", "sellers", "buyer", "buyers", "review", "reviews",
    "platform", "site", "website", "company", "service", "services",
];

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\W+").expect("static regex"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordFrequencyEntry {
    pub term: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingTerms {
    pub rating: u8,
    pub terms: Vec<WordFrequencyEntry>,
}

/// Global and per-rating term rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordReport {
    pub global: Vec<WordFrequencyEntry>,
    pub by_rating: Vec<RatingTerms>,
}

/// Tokenizer and counter with a fixed stop-word set.
#[derive(Debug, Clone)]
pub struct WordMiner {
    stop_words: HashSet<String>,
}

impl Default for WordMiner {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl WordMiner {
    /// Built-in stop words merged with `extra` (case-insensitive).
    pub fn new(extra: &[String]) -> Self {
        let mut stop_words: HashSet<String> = STOP_WORDS.iter().map(|s| s.to_string()).collect();
        stop_words.extend(
            extra
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
        Self { stop_words }
    }

    /// Terms of one text that survive the length and stop-word filters.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let spaced = non_word_re().replace_all(&lowered, " ");
        let terms: Vec<String> = spaced
            .split_whitespace()
            .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
            .filter(|t| !self.stop_words.contains(*t))
            .map(|t| t.to_string())
            .collect();
        terms
    }

    /// Ranked term counts over `texts`, truncated to `limit`.
    pub fn rank<'a, I>(&self, texts: I, limit: usize) -> Vec<WordFrequencyEntry>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries: Vec<WordFrequencyEntry> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for term in self.tokenize(text) {
                match index.get(&term) {
                    Some(&i) => entries[i].count += 1,
                    None => {
                        index.insert(term.clone(), entries.len());
                        entries.push(WordFrequencyEntry { term, count: 1 });
                    }
                }
            }
        }
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries.truncate(limit);
        entries
    }

    /// Top [`TOP_GLOBAL`] terms overall and top [`TOP_PER_RATING`] for each
    /// rating 1 through 5.
    pub fn report(&self, reviews: &[NormalizedReview]) -> WordReport {
        let global = self.rank(reviews.iter().map(|r| r.main_text.as_str()), TOP_GLOBAL);
        let by_rating = RATINGS
            .iter()
            .map(|&rating| RatingTerms {
                rating,
                terms: self.rank(
                    reviews
                        .iter()
                        .filter(|r| r.rating == rating)
                        .map(|r| r.main_text.as_str()),
                    TOP_PER_RATING,
                ),
            })
            .collect();
        WordReport { global, by_rating }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::review_text;

    #[test]
    fn tokenizer_drops_short_and_stop_words() {
        let miner = WordMiner::default();
        assert_eq!(
            miner.tokenize("The SELLER was rude; refund refused!!! 100% scam."),
            vec!["rude", "refund", "refused", "scam"]
        );
    }

    #[test]
    fn punctuation_separates_terms() {
        let miner = WordMiner::default();
        assert_eq!(miner.tokenize("payout/withdrawal-delay"), vec!["payout", "withdrawal", "delay"]);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let miner = WordMiner::default();
        let ranked = miner.rank(["zeta alpha", "alpha beta2 zeta", "gamma"], 10);
        let terms: Vec<(&str, u64)> = ranked.iter().map(|e| (e.term.as_str(), e.count)).collect();
        assert_eq!(
            terms,
            vec![("zeta", 2), ("alpha", 2), ("beta2", 1), ("gamma", 1)]
        );
    }

    #[test]
    fn extra_stop_words_merge() {
        let miner = WordMiner::new(&["Gig".to_string(), "orders".to_string()]);
        assert_eq!(miner.tokenize("gigs orders orders"), vec!["gigs"]);
    }

    #[test]
    fn report_splits_by_rating() {
        let miner = WordMiner::default();
        let reviews = vec![
            review_text("a", 1, "scammed scammed blocked"),
            review_text("b", 5, "smooth delivery"),
        ];
        let report = miner.report(&reviews);
        assert_eq!(report.global[0].term, "scammed");
        assert_eq!(report.by_rating.len(), 5);
        assert_eq!(report.by_rating[0].terms[0].count, 2);
        assert!(report.by_rating[2].terms.is_empty());
        assert_eq!(report.by_rating[4].terms[0].term, "smooth");
    }

    #[test]
    fn limits_apply() {
        let miner = WordMiner::default();
        let text: String = (0..80).map(|i| format!("term{i:03} ")).collect();
        assert_eq!(miner.rank([text.as_str()], TOP_GLOBAL).len(), TOP_GLOBAL);
    }
}
