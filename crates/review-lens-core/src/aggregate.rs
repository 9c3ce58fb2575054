//! Aggregation pipeline: time buckets, distributions, and cross tabs.
//!
//! [`build_aggregates`] derives every summary table from a slice of
//! normalized reviews in one call. Each table is also exposed as its own
//! function so callers can compute just what they display.
//!
//! Every ratio with a zero denominator (average of an empty bucket, reply
//! rate of zero reviews, percentage of an empty corpus) is `0.0`, never NaN.
//! Undated reviews count toward totals and distributions but are excluded
//! from the daily, weekly, and trend series, which need a real day.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{rating_slot, NormalizedReview, UserType, RATINGS};

/// Topics listed in the topic frequency table.
pub const TOP_TOPICS: usize = 10;
/// Topics carried into the topic × rating cross tab.
pub const CROSS_TAB_TOPICS: usize = 8;
/// Weeks kept in the weekly series.
pub const WEEKLY_WINDOW: usize = 12;

/// `num / den`, or `0.0` when `den` is zero.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Per-day summary of reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub date: NaiveDate,
    pub count: u64,
    /// Counts for ratings 1..=5, indexed by [`rating_slot`].
    pub ratings: [u64; 5],
    pub average_rating: f64,
    pub reply_count: u64,
    /// Fraction of the bucket with a reply, `0..=1`.
    pub reply_rate: f64,
    pub quality_average: f64,
}

impl TimeBucket {
    /// Each individual rating in the bucket, lowest first.
    pub fn expand_ratings(&self) -> impl Iterator<Item = u8> + '_ {
        RATINGS
            .iter()
            .flat_map(move |&r| std::iter::repeat(r).take(self.ratings[rating_slot(r)] as usize))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total: u64,
    pub dated: u64,
    pub undated: u64,
    pub average_rating: f64,
    pub reply_count: u64,
    /// Fraction of all reviews with a reply, `0..=1`.
    pub reply_rate: f64,
    pub average_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingCount {
    pub rating: u8,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthBin {
    pub label: String,
    pub min: usize,
    /// Inclusive upper bound; `None` for the open-ended last bin.
    pub max: Option<usize>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsefulByRating {
    pub rating: u8,
    pub average_useful: f64,
    pub with_useful: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicFrequency {
    pub topic: String,
    pub count: u64,
    /// Share of all reviews carrying the topic, `0..=100`.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicRatingRow {
    pub topic: String,
    pub ratings: [u64; 5],
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTypeRow {
    pub user_type: UserType,
    pub total: u64,
    pub ratings: [u64; 5],
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityByRating {
    pub rating: u8,
    pub count: u64,
    pub average_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyCount {
    /// The Sunday that opens the week.
    pub week_start: NaiveDate,
    pub count: u64,
}

/// First-half vs second-half average rating over dated reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingTrend {
    pub first_half_count: u64,
    pub first_half_average: f64,
    pub second_half_count: u64,
    pub second_half_average: f64,
    /// `second_half_average - first_half_average`.
    pub delta: f64,
}

/// Every aggregate table for one review set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub overview: Overview,
    pub daily: Vec<TimeBucket>,
    pub rating_distribution: Vec<RatingCount>,
    pub length_histogram: Vec<LengthBin>,
    pub useful_by_rating: Vec<UsefulByRating>,
    pub top_topics: Vec<TopicFrequency>,
    pub topic_by_rating: Vec<TopicRatingRow>,
    pub user_types: Vec<UserTypeRow>,
    pub quality_by_rating: Vec<QualityByRating>,
    pub weekly: Vec<WeeklyCount>,
    pub trend: RatingTrend,
}

/// Build every aggregate table.
pub fn build_aggregates(reviews: &[NormalizedReview]) -> Aggregates {
    let ranked = rank_topics(reviews);
    Aggregates {
        overview: overview(reviews),
        daily: daily_buckets(reviews),
        rating_distribution: rating_distribution(reviews),
        length_histogram: length_histogram(reviews),
        useful_by_rating: useful_by_rating(reviews),
        top_topics: topic_frequency(&ranked, reviews.len()),
        topic_by_rating: topic_by_rating(reviews, &ranked),
        user_types: user_type_breakdown(reviews),
        quality_by_rating: quality_by_rating(reviews),
        weekly: weekly_counts(reviews),
        trend: rating_trend(reviews),
    }
}

pub fn overview(reviews: &[NormalizedReview]) -> Overview {
    let total = reviews.len() as u64;
    let dated = reviews.iter().filter(|r| r.canonical_date.is_dated()).count() as u64;
    let reply_count = reviews.iter().filter(|r| r.has_reply()).count() as u64;
    let rating_sum: u64 = reviews.iter().map(|r| r.rating as u64).sum();
    let quality_sum: u64 = reviews.iter().map(|r| r.quality_score as u64).sum();
    Overview {
        total,
        dated,
        undated: total - dated,
        average_rating: ratio(rating_sum as f64, total as f64),
        reply_count,
        reply_rate: ratio(reply_count as f64, total as f64),
        average_quality: ratio(quality_sum as f64, total as f64),
    }
}

/// Daily buckets keyed by the UTC calendar day, ascending.
pub fn daily_buckets(reviews: &[NormalizedReview]) -> Vec<TimeBucket> {
    #[derive(Default)]
    struct Acc {
        count: u64,
        ratings: [u64; 5],
        rating_sum: u64,
        reply_count: u64,
        quality_sum: u64,
    }

    let mut days: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for r in reviews {
        let Some(day) = r.canonical_date.day() else {
            continue;
        };
        let acc = days.entry(day).or_default();
        acc.count += 1;
        acc.ratings[rating_slot(r.rating)] += 1;
        acc.rating_sum += r.rating as u64;
        acc.quality_sum += r.quality_score as u64;
        if r.has_reply() {
            acc.reply_count += 1;
        }
    }

    days.into_iter()
        .map(|(date, acc)| TimeBucket {
            date,
            count: acc.count,
            ratings: acc.ratings,
            average_rating: ratio(acc.rating_sum as f64, acc.count as f64),
            reply_count: acc.reply_count,
            reply_rate: ratio(acc.reply_count as f64, acc.count as f64),
            quality_average: ratio(acc.quality_sum as f64, acc.count as f64),
        })
        .collect()
}

/// Count per rating, 1 through 5.
pub fn rating_distribution(reviews: &[NormalizedReview]) -> Vec<RatingCount> {
    let mut counts = [0u64; 5];
    for r in reviews {
        counts[rating_slot(r.rating)] += 1;
    }
    let total = reviews.len() as f64;
    RATINGS
        .iter()
        .map(|&rating| {
            let count = counts[rating_slot(rating)];
            RatingCount {
                rating,
                count,
                percentage: ratio(count as f64 * 100.0, total),
            }
        })
        .collect()
}

/// Main-text length bins: `0-50`, `51-100`, `101-200`, `201-500`, `500+`.
pub fn length_histogram(reviews: &[NormalizedReview]) -> Vec<LengthBin> {
    let bounds: [(&str, usize, Option<usize>); 5] = [
        ("0-50", 0, Some(50)),
        ("51-100", 51, Some(100)),
        ("101-200", 101, Some(200)),
        ("201-500", 201, Some(500)),
        ("500+", 501, None),
    ];
    let mut bins: Vec<LengthBin> = bounds
        .iter()
        .map(|(label, min, max)| LengthBin {
            label: label.to_string(),
            min: *min,
            max: *max,
            count: 0,
        })
        .collect();

    for r in reviews {
        let len = r.text_len();
        let slot = bins
            .iter()
            .position(|b| b.max.map_or(true, |max| len <= max))
            .unwrap_or(bins.len() - 1);
        bins[slot].count += 1;
    }
    bins
}

pub fn useful_by_rating(reviews: &[NormalizedReview]) -> Vec<UsefulByRating> {
    RATINGS
        .iter()
        .map(|&rating| {
            let members: Vec<&NormalizedReview> =
                reviews.iter().filter(|r| r.rating == rating).collect();
            let sum: u64 = members.iter().map(|r| r.useful_count as u64).sum();
            UsefulByRating {
                rating,
                average_useful: ratio(sum as f64, members.len() as f64),
                with_useful: members.iter().filter(|r| r.useful_count > 0).count() as u64,
            }
        })
        .collect()
}

/// Topic tags ranked by mention count; ties keep first-seen order.
pub fn rank_topics(reviews: &[NormalizedReview]) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for r in reviews {
        for tag in &r.topics {
            match index.get(tag.as_str()) {
                Some(&i) => ranked[i].1 += 1,
                None => {
                    index.insert(tag.as_str(), ranked.len());
                    ranked.push((tag.clone(), 1));
                }
            }
        }
    }
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Top [`TOP_TOPICS`] topics with their share of the corpus.
pub fn topic_frequency(ranked: &[(String, u64)], total_reviews: usize) -> Vec<TopicFrequency> {
    ranked
        .iter()
        .take(TOP_TOPICS)
        .map(|(topic, count)| TopicFrequency {
            topic: topic.clone(),
            count: *count,
            percentage: ratio(*count as f64 * 100.0, total_reviews as f64),
        })
        .collect()
}

/// Rating breakdown for the top [`CROSS_TAB_TOPICS`] topics.
pub fn topic_by_rating(
    reviews: &[NormalizedReview],
    ranked: &[(String, u64)],
) -> Vec<TopicRatingRow> {
    ranked
        .iter()
        .take(CROSS_TAB_TOPICS)
        .map(|(topic, _)| {
            let mut ratings = [0u64; 5];
            for r in reviews.iter().filter(|r| r.topics.contains(topic)) {
                ratings[rating_slot(r.rating)] += 1;
            }
            TopicRatingRow {
                topic: topic.clone(),
                ratings,
                total: ratings.iter().sum(),
            }
        })
        .collect()
}

/// Seller / buyer / unknown rows, always all three.
pub fn user_type_breakdown(reviews: &[NormalizedReview]) -> Vec<UserTypeRow> {
    UserType::ALL
        .iter()
        .map(|&user_type| {
            let mut ratings = [0u64; 5];
            let mut sum = 0u64;
            let mut total = 0u64;
            for r in reviews.iter().filter(|r| r.user_type == user_type) {
                ratings[rating_slot(r.rating)] += 1;
                sum += r.rating as u64;
                total += 1;
            }
            UserTypeRow {
                user_type,
                total,
                ratings,
                average_rating: ratio(sum as f64, total as f64),
            }
        })
        .collect()
}

pub fn quality_by_rating(reviews: &[NormalizedReview]) -> Vec<QualityByRating> {
    RATINGS
        .iter()
        .map(|&rating| {
            let (count, sum) = reviews
                .iter()
                .filter(|r| r.rating == rating)
                .fold((0u64, 0u64), |(c, s), r| (c + 1, s + r.quality_score as u64));
            QualityByRating {
                rating,
                count,
                average_quality: ratio(sum as f64, count as f64),
            }
        })
        .collect()
}

/// The Sunday on or before `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_sunday() as i64)
}

/// Counts for the most recent [`WEEKLY_WINDOW`] weeks present, ascending.
pub fn weekly_counts(reviews: &[NormalizedReview]) -> Vec<WeeklyCount> {
    let mut weeks: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for day in reviews.iter().filter_map(|r| r.canonical_date.day()) {
        *weeks.entry(week_start(day)).or_insert(0) += 1;
    }
    let skip = weeks.len().saturating_sub(WEEKLY_WINDOW);
    weeks
        .into_iter()
        .skip(skip)
        .map(|(week_start, count)| WeeklyCount { week_start, count })
        .collect()
}

/// Split dated reviews at the chronological midpoint and compare averages.
pub fn rating_trend(reviews: &[NormalizedReview]) -> RatingTrend {
    let mut dated: Vec<&NormalizedReview> = reviews
        .iter()
        .filter(|r| r.canonical_date.is_dated())
        .collect();
    dated.sort_by_key(|r| r.canonical_date.instant());

    let mid = dated.len() / 2;
    let (first, second) = dated.split_at(mid);
    let avg = |half: &[&NormalizedReview]| {
        let sum: u64 = half.iter().map(|r| r.rating as u64).sum();
        ratio(sum as f64, half.len() as f64)
    };
    let first_half_average = avg(first);
    let second_half_average = avg(second);
    RatingTrend {
        first_half_count: first.len() as u64,
        first_half_average,
        second_half_count: second.len() as u64,
        second_half_average,
        delta: second_half_average - first_half_average,
    }
}
