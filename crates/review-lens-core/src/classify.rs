//! Heuristic classifiers: user type, topics, and quality score.
//!
//! User-type and topic classification are driven by [`KeywordTables`],
//! plain data that can be replaced from configuration. One generic scorer
//! counts case-insensitive keyword hits; there is no per-category code.
//!
//! # Quality score
//!
//! | Signal | Points |
//! |--------|--------|
//! | main text > 500 / > 200 / > 100 chars | 30 / 20 / 10 |
//! | contains a currency amount | 10 |
//! | contains any digit | 10 |
//! | more than 3 sentences | 10 |
//! | feedback intent (suggest, recommend, improve, …) | 20 |
//! | `min(useful_count * 2, 20)` | ≤ 20 |
//!
//! The sum is clamped to `0..=100`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::UserType;

/// One topic tag and the keywords that assign it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRule {
    pub tag: String,
    pub keywords: Vec<String>,
}

/// Keyword tables for user-type and topic classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTables {
    pub seller: Vec<String>,
    pub buyer: Vec<String>,
    /// Ordered: topic tags on a review follow this order.
    pub topics: Vec<TopicRule>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn rule(tag: &str, keywords: &[&str]) -> TopicRule {
    TopicRule {
        tag: tag.to_string(),
        keywords: words(keywords),
    }
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            seller: words(&[
                "my gig",
                "as a seller",
                "i'm a seller",
                "i am a seller",
                "my buyers",
                "my clients",
                "my customers",
                "top rated",
                "level 1",
                "level 2",
                "my earnings",
                "withdraw",
                "my services",
                "my orders",
                "freelancer here",
                "impressions",
            ]),
            buyer: words(&[
                "i hired",
                "i ordered",
                "i paid",
                "as a buyer",
                "the seller",
                "my order",
                "hired a",
                "the freelancer",
                "ordered a",
                "i purchased",
                "delivered late",
                "never delivered",
            ]),
            topics: vec![
                rule(
                    "payments",
                    &["payment", "paid", "payout", "withdraw", "money", "charge", "fee"],
                ),
                rule("refunds", &["refund", "chargeback", "money back", "reimburse"]),
                rule(
                    "support",
                    &["support", "customer service", "ticket", "help center", "agent"],
                ),
                rule(
                    "account",
                    &["account", "banned", "suspended", "blocked", "verification", "restricted"],
                ),
                rule(
                    "quality",
                    &["quality", "professional", "excellent work", "poor work", "skilled"],
                ),
                rule(
                    "communication",
                    &["communication", "responsive", "respond", "message", "replied"],
                ),
                rule("delivery", &["deadline", "on time", "late", "delivery", "delivered"]),
                rule("pricing", &["price", "expensive", "cheap", "cost", "affordable"]),
                rule("scam", &["scam", "fraud", "fake", "stolen", "cheat"]),
                rule(
                    "disputes",
                    &["dispute", "resolution", "cancel", "cancellation", "revision"],
                ),
            ],
        }
    }
}

fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[$€£]\s?\d|\d+(?:[.,]\d+)?\s?(?:usd|eur|gbp|dollars?|euros?|bucks)\b")
            .expect("static regex")
    })
}

fn sentence_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("static regex"))
}

fn feedback_intent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)suggest|recommend|improve|better|should|could").expect("static regex")
    })
}

/// Classifier over a set of keyword tables.
///
/// Keywords are lowercased once at construction.
#[derive(Debug, Clone)]
pub struct Classifier {
    seller: Vec<String>,
    buyer: Vec<String>,
    topics: Vec<TopicRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&KeywordTables::default())
    }
}

impl Classifier {
    pub fn new(tables: &KeywordTables) -> Self {
        let lower = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            seller: lower(&tables.seller),
            buyer: lower(&tables.buyer),
            topics: tables
                .topics
                .iter()
                .map(|t| TopicRule {
                    tag: t.tag.trim().to_string(),
                    keywords: lower(&t.keywords),
                })
                .filter(|t| !t.tag.is_empty())
                .collect(),
        }
    }

    /// Majority of seller vs buyer keyword hits; a tie is `Unknown`.
    pub fn user_type(&self, main_text: &str) -> UserType {
        let text = main_text.to_lowercase();
        let seller = keyword_hits(&text, &self.seller);
        let buyer = keyword_hits(&text, &self.buyer);
        match seller.cmp(&buyer) {
            std::cmp::Ordering::Greater => UserType::Seller,
            std::cmp::Ordering::Less => UserType::Buyer,
            std::cmp::Ordering::Equal => UserType::Unknown,
        }
    }

    /// Every topic with at least one keyword hit, in table order.
    pub fn topics(&self, main_text: &str) -> Vec<String> {
        let text = main_text.to_lowercase();
        let mut tags: Vec<String> = Vec::new();
        for topic in &self.topics {
            if keyword_hits(&text, &topic.keywords) > 0 && !tags.contains(&topic.tag) {
                tags.push(topic.tag.clone());
            }
        }
        tags
    }
}

/// Number of distinct keywords contained in `text_lower`.
fn keyword_hits(text_lower: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| text_lower.contains(k.as_str()))
        .count()
}

/// Weighted quality heuristic, clamped to `0..=100`.
pub fn quality_score(main_text: &str, useful_count: u32) -> u8 {
    let len = main_text.chars().count();
    let mut score: u32 = if len > 500 {
        30
    } else if len > 200 {
        20
    } else if len > 100 {
        10
    } else {
        0
    };

    if currency_re().is_match(main_text) {
        score += 10;
    }
    if main_text.chars().any(|c| c.is_ascii_digit()) {
        score += 10;
    }
    if sentence_count(main_text) > 3 {
        score += 10;
    }
    if feedback_intent_re().is_match(main_text) {
        score += 20;
    }
    score += useful_count.saturating_mul(2).min(20);

    score.min(100) as u8
}

/// Non-empty segments between sentence terminators.
fn sentence_count(text: &str) -> usize {
    sentence_break_re()
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count()
}
