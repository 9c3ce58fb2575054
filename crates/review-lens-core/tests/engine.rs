use std::sync::atomic::AtomicBool;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use review_lens_core::calendar::{build_calendar, crisis_summary, volatility};
use review_lens_core::classify::quality_score;
use review_lens_core::cluster::{
    cluster, similarity_groups, ClusterMode, ClusterOptions, NoClusterProgress,
    SimilarityStrategy,
};
use review_lens_core::corpus::Corpus;
use review_lens_core::filter::{apply_filter, FilterSpec, Overrides, SortDirection, SortKey};
use review_lens_core::models::{RawReview, ReviewDate};
use review_lens_core::normalize::{NormalizeOptions, Normalizer};
use review_lens_core::split::ReplySplitter;
use review_lens_core::store::memory::InMemoryStore;
use review_lens_core::store::SavedState;
use review_lens_core::words::WordMiner;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn normalizer() -> Normalizer {
    Normalizer::new(&NormalizeOptions::new(now())).unwrap()
}

fn raw(url: &str, rating: &str, date: &str, text: &str) -> RawReview {
    RawReview {
        reviewer_name: Some(format!("Reviewer {url}")),
        date: Some(date.to_string()),
        star_rating: Some(rating.to_string()),
        review_text: Some(text.to_string()),
        useful_count: Some("0".to_string()),
        source_url: Some(url.to_string()),
        ..Default::default()
    }
}

/// Three 1-star reviews on one day, two 5-star reviews on another.
fn five_reviews() -> Vec<RawReview> {
    vec![
        raw("r1", "1", "2024-06-10", "They froze my payout"),
        raw("r2", "1", "2024-06-10", "Account banned without warning"),
        raw("r3", "1", "Updated Jun 10, 2024", "Support never answered my ticket"),
        raw("r4", "5", "2 days ago", "Found a great designer. Reply from Fiverr: Thanks!"),
        raw("r5", "5", "2024-06-13", "Fast delivery and fair price"),
    ]
}

#[test]
fn end_to_end_rating_groups_and_crisis_day() {
    let corpus = Corpus::from_raw(&five_reviews(), &normalizer());
    assert_eq!(corpus.len(), 5);

    let groups = cluster(
        corpus.reviews(),
        ClusterMode::Rating,
        &ClusterOptions::default(),
        &AtomicBool::new(false),
        &NoClusterProgress,
    )
    .unwrap();
    let summary: Vec<(&str, usize)> = groups.iter().map(|g| (g.label.as_str(), g.count)).collect();
    assert_eq!(summary, vec![("5 Stars", 2), ("1 Star", 3)]);

    let days = build_calendar(corpus.reviews());
    let crisis: Vec<NaiveDate> = days.iter().filter(|d| d.is_crisis).map(|d| d.date).collect();
    assert_eq!(crisis, vec![NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()]);

    let summary = crisis_summary(&days);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.overflow, 0);
}

#[test]
fn normalized_fields_flow_through() {
    let corpus = Corpus::from_raw(&five_reviews(), &normalizer());
    let r4 = &corpus.reviews()[3];
    assert_eq!(r4.main_text, "Found a great designer.");
    assert!(r4.has_reply());
    assert_eq!(
        r4.canonical_date.day(),
        Some(NaiveDate::from_ymd_opt(2024, 6, 13).unwrap())
    );

    let agg = corpus.aggregates();
    assert_eq!(agg.overview.total, 5);
    assert_eq!(agg.overview.undated, 0);
    assert!((agg.overview.average_rating - 13.0 / 5.0).abs() < 1e-9);
    assert!((agg.overview.reply_rate - 0.2).abs() < 1e-9);
    assert_eq!(agg.daily.len(), 2);
    assert!(volatility(&agg.daily).is_empty());
}

#[test]
fn rating_mode_is_a_strict_partition() {
    let raws: Vec<RawReview> = (0..40)
        .map(|i| {
            raw(
                &format!("u{i}"),
                &((i % 5) + 1).to_string(),
                "2024-01-01",
                "text",
            )
        })
        .collect();
    let corpus = Corpus::from_raw(&raws, &normalizer());
    let groups = cluster(
        corpus.reviews(),
        ClusterMode::Rating,
        &ClusterOptions::default(),
        &AtomicBool::new(false),
        &NoClusterProgress,
    )
    .unwrap();

    let mut urls: Vec<String> = groups.iter().flat_map(|g| g.source_urls()).collect();
    assert_eq!(urls.len(), 40);
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 40);
    for g in &groups {
        let rating = g.members[0].rating;
        assert!(g.members.iter().all(|r| r.rating == rating));
    }
}

#[test]
fn similarity_groups_are_disjoint_for_both_strategies() {
    let texts = [
        "Fiverr stole my money",
        "fiverr stole my money!",
        "Fiverr stole my money!!",
        "Great experience overall",
        "great experience overall.",
        "Unrelated",
    ];
    let raws: Vec<RawReview> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| raw(&format!("s{i}"), "1", "", t))
        .collect();
    let corpus = Corpus::from_raw(&raws, &normalizer());
    assert!(corpus
        .reviews()
        .iter()
        .all(|r| r.canonical_date == ReviewDate::Undated));

    for strategy in [SimilarityStrategy::Greedy, SimilarityStrategy::Connected] {
        let groups = similarity_groups(
            corpus.reviews(),
            &ClusterOptions {
                threshold: 85,
                strategy,
            },
            &AtomicBool::new(false),
            &NoClusterProgress,
        )
        .unwrap();
        assert_eq!(groups.len(), 2, "{strategy}");
        let mut seen = std::collections::HashSet::new();
        for g in &groups {
            assert!(g.count >= 2);
            for url in g.source_urls() {
                assert!(seen.insert(url));
            }
        }
    }
}

#[test]
fn split_is_idempotent_and_quality_is_bounded() {
    let splitter = ReplySplitter::default();
    for text in [
        "plain",
        "body Reply from Fiverr: reply",
        "  Reply from fiverr\nonly a reply ",
    ] {
        let once = splitter.split(text);
        let twice = splitter.split(&once.main_text);
        assert_eq!(twice.main_text, once.main_text);
        assert!(twice.reply_text.is_none());
    }

    for (text, useful) in [("", 0), ("$5 $6 7 eur. a. b. c. d. should", 99), ("x", u32::MAX)] {
        assert!(quality_score(text, useful) <= 100);
    }
}

#[test]
fn collection_override_beats_cluster_group() {
    let corpus = Corpus::from_raw(&five_reviews(), &normalizer());
    let overrides = Overrides {
        collection: Some(vec!["r5".into()]),
        calendar_day: None,
        cluster_group: Some(vec!["r1".into(), "r2".into()]),
    };
    let out = apply_filter(corpus.reviews(), &FilterSpec::default(), &overrides);
    let urls: Vec<&str> = out.iter().map(|r| r.source_url.as_str()).collect();
    assert_eq!(urls, vec!["r5"]);
}

#[test]
fn saved_search_reload_reproduces_filter_results() {
    let corpus = Corpus::from_raw(&five_reviews(), &normalizer());
    let spec = FilterSpec {
        search: Some("my".into()),
        rating: Some(1),
        sort: SortKey::Date,
        direction: SortDirection::Asc,
        ..Default::default()
    };

    let store = InMemoryStore::new();
    let mut state = SavedState::default();
    state.save_search("ones", spec.clone());
    state.save(&store).unwrap();

    let reloaded = SavedState::load(&store).unwrap();
    let reloaded_spec = &reloaded.find_search("ones").unwrap().spec;

    let before: Vec<String> = apply_filter(corpus.reviews(), &spec, &Overrides::default())
        .iter()
        .map(|r| r.source_url.clone())
        .collect();
    let after: Vec<String> = apply_filter(corpus.reviews(), reloaded_spec, &Overrides::default())
        .iter()
        .map(|r| r.source_url.clone())
        .collect();
    assert_eq!(before, vec!["r1", "r3"]);
    assert_eq!(before, after);
}

#[test]
fn word_report_uses_main_text_only() {
    let corpus = Corpus::from_raw(&five_reviews(), &normalizer());
    let report = WordMiner::default().report(corpus.reviews());
    assert!(report.global.iter().all(|e| e.term != "thanks"));
    assert!(report.global.iter().any(|e| e.term == "payout"));
}
