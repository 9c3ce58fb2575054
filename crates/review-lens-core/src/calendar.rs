//! Calendar view, crisis-day detection, and rolling rating volatility.
//!
//! A **crisis day** has at least [`CRISIS_MIN_REVIEWS`] reviews and more than
//! half of them rated [`LOW_RATING_MAX`] or lower. Undated reviews never
//! appear on the calendar.
//!
//! # Volatility
//!
//! For each daily bucket at index ≥ 7 (chronological order), the population
//! standard deviation of every individual rating in that bucket and the seven
//! before it. Computed in one forward pass: a deque holds the per-bucket
//! rating sums of the last [`VOLATILITY_WINDOW`] buckets and running totals
//! are adjusted as buckets enter and leave.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::aggregate::{ratio, TimeBucket};
use crate::models::{rating_slot, NormalizedReview, LOW_RATING_MAX};

pub const CRISIS_MIN_REVIEWS: u64 = 3;
/// Buckets per volatility window, current bucket included.
pub const VOLATILITY_WINDOW: usize = 8;
/// Crisis days listed individually before the overflow count.
pub const RECENT_CRISIS_DAYS: usize = 5;

/// Crisis rule: `low / count > 0.5` and `count >= 3`.
pub fn is_crisis(low_count: u64, count: u64) -> bool {
    count >= CRISIS_MIN_REVIEWS && low_count * 2 > count
}

/// Reviews posted on one UTC calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    #[serde(skip)]
    pub members: Vec<&'a NormalizedReview>,
    pub count: u64,
    pub ratings: [u64; 5],
    pub average_rating: f64,
    pub low_count: u64,
    pub is_crisis: bool,
}

impl CalendarDay<'_> {
    pub fn source_urls(&self) -> Vec<String> {
        self.members.iter().map(|r| r.source_url.clone()).collect()
    }
}

/// Per-day buckets with members, ascending by date.
pub fn build_calendar(reviews: &[NormalizedReview]) -> Vec<CalendarDay<'_>> {
    let mut days: BTreeMap<NaiveDate, Vec<&NormalizedReview>> = BTreeMap::new();
    for r in reviews {
        if let Some(day) = r.canonical_date.day() {
            days.entry(day).or_default().push(r);
        }
    }

    days.into_iter()
        .map(|(date, members)| {
            let mut ratings = [0u64; 5];
            let mut sum = 0u64;
            let mut low_count = 0u64;
            for r in &members {
                ratings[rating_slot(r.rating)] += 1;
                sum += r.rating as u64;
                if r.rating <= LOW_RATING_MAX {
                    low_count += 1;
                }
            }
            let count = members.len() as u64;
            CalendarDay {
                date,
                members,
                count,
                ratings,
                average_rating: ratio(sum as f64, count as f64),
                low_count,
                is_crisis: is_crisis(low_count, count),
            }
        })
        .collect()
}

/// Find the calendar entry for `date`.
pub fn find_day<'c, 'a>(days: &'c [CalendarDay<'a>], date: NaiveDate) -> Option<&'c CalendarDay<'a>> {
    days.binary_search_by_key(&date, |d| d.date)
        .ok()
        .map(|i| &days[i])
}

/// Display tone of a calendar cell. Crisis overrides the rating tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayTone {
    Empty,
    Positive,
    Mixed,
    Negative,
    Crisis,
}

impl DayTone {
    pub fn of(count: u64, average_rating: f64, is_crisis: bool) -> Self {
        if is_crisis {
            DayTone::Crisis
        } else if count == 0 {
            DayTone::Empty
        } else if average_rating >= 4.0 {
            DayTone::Positive
        } else if average_rating >= 3.0 {
            DayTone::Mixed
        } else {
            DayTone::Negative
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub count: u64,
    pub average_rating: f64,
    /// `count / max_count` over the month, in `0..=1`.
    pub intensity: f64,
    pub tone: DayTone,
    pub is_crisis: bool,
}

/// One cell per day of a calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub max_count: u64,
    pub cells: Vec<MonthCell>,
}

/// Heat-map view for `year`/`month`; `None` for an invalid month.
pub fn month_view(days: &[CalendarDay<'_>], year: i32, month: u32) -> Option<MonthView> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let in_month: Vec<&CalendarDay<'_>> = days
        .iter()
        .filter(|d| d.date.year() == year && d.date.month() == month)
        .collect();
    let max_count = in_month.iter().map(|d| d.count).max().unwrap_or(0);

    let cells = first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|date| match in_month.iter().find(|d| d.date == date) {
            Some(day) => MonthCell {
                date,
                count: day.count,
                average_rating: day.average_rating,
                intensity: ratio(day.count as f64, max_count as f64).clamp(0.0, 1.0),
                tone: DayTone::of(day.count, day.average_rating, day.is_crisis),
                is_crisis: day.is_crisis,
            },
            None => MonthCell {
                date,
                count: 0,
                average_rating: 0.0,
                intensity: 0.0,
                tone: DayTone::Empty,
                is_crisis: false,
            },
        })
        .collect();

    Some(MonthView {
        year,
        month,
        max_count,
        cells,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisEntry {
    pub date: NaiveDate,
    pub count: u64,
    pub low_count: u64,
    pub average_rating: f64,
}

/// Most recent crisis days plus how many older ones were left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisSummary {
    pub total: usize,
    pub recent: Vec<CrisisEntry>,
    pub overflow: usize,
}

/// Crisis days, most recent first.
pub fn crisis_days<'c, 'a>(days: &'c [CalendarDay<'a>]) -> Vec<&'c CalendarDay<'a>> {
    let mut crises: Vec<&CalendarDay<'a>> = days.iter().filter(|d| d.is_crisis).collect();
    crises.sort_by(|a, b| b.date.cmp(&a.date));
    crises
}

pub fn crisis_summary(days: &[CalendarDay<'_>]) -> CrisisSummary {
    let crises = crisis_days(days);
    let total = crises.len();
    let recent = crises
        .iter()
        .take(RECENT_CRISIS_DAYS)
        .map(|d| CrisisEntry {
            date: d.date,
            count: d.count,
            low_count: d.low_count,
            average_rating: d.average_rating,
        })
        .collect();
    CrisisSummary {
        total,
        recent,
        overflow: total.saturating_sub(RECENT_CRISIS_DAYS),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityPoint {
    pub date: NaiveDate,
    pub std_dev: f64,
}

/// Rolling population standard deviation of ratings over
/// [`VOLATILITY_WINDOW`] daily buckets.
///
/// `buckets` must be in ascending date order, as produced by
/// [`daily_buckets`](crate::aggregate::daily_buckets).
pub fn volatility(buckets: &[TimeBucket]) -> Vec<VolatilityPoint> {
    // (n, sum, sum of squares) per bucket, over the expanded ratings.
    let mut window: VecDeque<(u64, u64, u64)> = VecDeque::with_capacity(VOLATILITY_WINDOW);
    let (mut n, mut sum, mut sum_sq) = (0u64, 0u64, 0u64);
    let mut out = Vec::with_capacity(buckets.len().saturating_sub(VOLATILITY_WINDOW - 1));

    for bucket in buckets {
        let entry = bucket.expand_ratings().fold((0u64, 0u64, 0u64), |(c, s, q), r| {
            let r = r as u64;
            (c + 1, s + r, q + r * r)
        });
        window.push_back(entry);
        n += entry.0;
        sum += entry.1;
        sum_sq += entry.2;

        if window.len() > VOLATILITY_WINDOW {
            if let Some((c, s, q)) = window.pop_front() {
                n -= c;
                sum -= s;
                sum_sq -= q;
            }
        }
        if window.len() == VOLATILITY_WINDOW {
            out.push(VolatilityPoint {
                date: bucket.date,
                std_dev: population_std_dev(n, sum, sum_sq),
            });
        }
    }
    out
}

/// Population standard deviation from integer moments; `0.0` when `n == 0`.
fn population_std_dev(n: u64, sum: u64, sum_sq: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    // n² · variance = n · Σx² - (Σx)², exact in integers and never negative.
    let n = n as u128;
    let scaled = n * sum_sq as u128 - (sum as u128) * (sum as u128);
    ((scaled as f64) / (n * n) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::daily_buckets;
    use crate::testutil::{review, review_on};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_of(ratings: &[u8], date: &str) -> Vec<NormalizedReview> {
        ratings
            .iter()
            .enumerate()
            .map(|(i, &r)| review_on(&format!("{date}-{i}"), r, date))
            .collect()
    }

    #[test]
    fn crisis_rule() {
        let crisis_reviews = day_of(&[1, 1, 5], "2024-01-01");
        let crisis = build_calendar(&crisis_reviews);
        assert!(crisis[0].is_crisis);
        assert_eq!(crisis[0].low_count, 2);

        let calm_reviews = day_of(&[3, 3, 3], "2024-01-01");
        let calm = build_calendar(&calm_reviews);
        assert!(!calm[0].is_crisis);

        let too_few_reviews = day_of(&[1, 1], "2024-01-01");
        let too_few = build_calendar(&too_few_reviews);
        assert!(!too_few[0].is_crisis);

        let half_reviews = day_of(&[1, 2, 5, 5], "2024-01-01");
        let half = build_calendar(&half_reviews);
        assert!(!half[0].is_crisis);
    }

    #[test]
    fn calendar_excludes_undated_and_sorts() {
        let mut reviews = day_of(&[5], "2024-02-02");
        reviews.extend(day_of(&[4, 2], "2024-02-01"));
        reviews.push(review("undated", 1));
        let days = build_calendar(&reviews);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, ymd(2024, 2, 1));
        assert!((days[0].average_rating - 3.0).abs() < 1e-9);
        assert_eq!(days[0].source_urls(), vec!["2024-02-01-0", "2024-02-01-1"]);
        assert!(find_day(&days, ymd(2024, 2, 2)).is_some());
        assert!(find_day(&days, ymd(2024, 2, 3)).is_none());
    }

    #[test]
    fn month_view_fills_every_day() {
        let mut reviews = day_of(&[5, 5, 4, 4], "2024-02-10");
        reviews.extend(day_of(&[3, 4], "2024-02-11"));
        reviews.extend(day_of(&[1, 1, 2], "2024-02-12"));
        reviews.extend(day_of(&[1], "2024-03-01"));
        let days = build_calendar(&reviews);

        let view = month_view(&days, 2024, 2).unwrap();
        assert_eq!(view.cells.len(), 29);
        assert_eq!(view.max_count, 4);
        let cell = |d: u32| &view.cells[(d - 1) as usize];
        assert_eq!(cell(10).tone, DayTone::Positive);
        assert_eq!(cell(10).intensity, 1.0);
        assert_eq!(cell(11).tone, DayTone::Mixed);
        assert!((cell(11).intensity - 0.5).abs() < 1e-9);
        assert_eq!(cell(12).tone, DayTone::Crisis);
        assert_eq!(cell(1).tone, DayTone::Empty);
        assert_eq!(cell(1).intensity, 0.0);

        let empty = month_view(&days, 2023, 6).unwrap();
        assert_eq!(empty.max_count, 0);
        assert!(empty.cells.iter().all(|c| c.intensity == 0.0));
        assert!(month_view(&days, 2024, 13).is_none());
    }

    #[test]
    fn tone_thresholds() {
        assert_eq!(DayTone::of(2, 2.5, false), DayTone::Negative);
        assert_eq!(DayTone::of(3, 4.5, true), DayTone::Crisis);
        assert_eq!(DayTone::of(1, 3.0, false), DayTone::Mixed);
    }

    #[test]
    fn crisis_summary_keeps_recent_five() {
        let mut reviews = Vec::new();
        for d in 1..=7 {
            reviews.extend(day_of(&[1, 1, 1], &format!("2024-04-{d:02}")));
        }
        reviews.extend(day_of(&[5, 5, 5], "2024-04-08"));
        let days = build_calendar(&reviews);
        let summary = crisis_summary(&days);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.overflow, 2);
        let dates: Vec<NaiveDate> = summary.recent.iter().map(|c| c.date).collect();
        assert_eq!(dates[0], ymd(2024, 4, 7));
        assert_eq!(dates[4], ymd(2024, 4, 3));
    }

    #[test]
    fn volatility_needs_eight_buckets() {
        let mut reviews = Vec::new();
        for d in 1..=7 {
            reviews.extend(day_of(&[3], &format!("2024-05-{d:02}")));
        }
        assert!(volatility(&daily_buckets(&reviews)).is_empty());

        reviews.extend(day_of(&[3], "2024-05-08"));
        let series = volatility(&daily_buckets(&reviews));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, ymd(2024, 5, 8));
        assert_eq!(series[0].std_dev, 0.0);
    }

    #[test]
    fn volatility_window_slides() {
        let mut reviews = Vec::new();
        for d in 1..=8 {
            reviews.extend(day_of(&[1, 5], &format!("2024-06-{d:02}")));
        }
        for d in 9..=16 {
            reviews.extend(day_of(&[4], &format!("2024-06-{d:02}")));
        }
        let series = volatility(&daily_buckets(&reviews));
        assert_eq!(series.len(), 9);
        // Window of eight {1, 5} days: mean 3, every rating 2 away.
        assert!((series[0].std_dev - 2.0).abs() < 1e-9);
        // Last window holds only 4-star days.
        assert_eq!(series[8].std_dev, 0.0);
    }

    #[test]
    fn empty_window_volatility_is_zero() {
        assert_eq!(population_std_dev(0, 0, 0), 0.0);
        assert!(volatility(&[]).is_empty());
    }
}
