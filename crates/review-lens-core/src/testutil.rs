//! Review builders shared by unit tests.

use chrono::NaiveDate;

use crate::models::{NormalizedReview, ReviewDate, Reviewer, UserType};

/// An undated review identified by `url`.
pub fn review(url: &str, rating: u8) -> NormalizedReview {
    NormalizedReview {
        reviewer: Reviewer {
            name: format!("Reviewer {url}"),
            initials: "RV".to_string(),
            avatar: None,
            link: None,
        },
        canonical_date: ReviewDate::Undated,
        main_text: String::new(),
        reply_text: None,
        rating,
        useful_count: 0,
        user_type: UserType::Unknown,
        topics: Vec::new(),
        quality_score: 0,
        source_url: url.to_string(),
        page_number: None,
    }
}

/// A review dated at midnight UTC on `day` (`YYYY-MM-DD`).
pub fn review_on(url: &str, rating: u8, day: &str) -> NormalizedReview {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap();
    let mut r = review(url, rating);
    r.canonical_date = ReviewDate::Dated(date.and_hms_opt(0, 0, 0).unwrap().and_utc());
    r
}

/// An undated review with the given main text.
pub fn review_text(url: &str, rating: u8, text: &str) -> NormalizedReview {
    let mut r = review(url, rating);
    r.main_text = text.to_string();
    r
}
