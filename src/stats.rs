//! Corpus overview and aggregate tables.
//!
//! `rlens stats` prints the headline numbers and every aggregate table the
//! engine computes. With `--json` it prints the full [`Aggregates`] value
//! together with the corpus fingerprint, which is what dashboards consume.

use anyhow::Result;
use review_lens_core::aggregate::Aggregates;
use review_lens_core::cluster::rating_label;
use serde::Serialize;

use crate::config::Config;
use crate::corpus_file::load_corpus;

#[derive(Serialize)]
struct StatsReport<'a> {
    corpus: String,
    fingerprint: &'a str,
    aggregates: &'a Aggregates,
}

/// Run the stats command: load the corpus and print its aggregates.
pub fn run_stats(config: &Config, json: bool) -> Result<()> {
    let corpus = load_corpus(config)?;
    let aggregates = corpus.aggregates();

    if json {
        let report = StatsReport {
            corpus: config.corpus.path.display().to_string(),
            fingerprint: corpus.fingerprint(),
            aggregates,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let o = &aggregates.overview;
    println!("Review Lens: Corpus Stats");
    println!("=========================");
    println!();
    println!("  Corpus:      {}", config.corpus.path.display());
    println!("  Reviews:     {} ({} dated, {} undated)", o.total, o.dated, o.undated);
    println!("  Avg rating:  {:.2}", o.average_rating);
    println!("  Replies:     {} ({:.1}%)", o.reply_count, o.reply_rate * 100.0);
    println!("  Avg quality: {:.1}", o.average_quality);

    if o.total == 0 {
        println!();
        println!("  No reviews loaded.");
        return Ok(());
    }

    println!();
    println!("  Ratings:");
    println!("  {:<10} {:>8} {:>8} {:>12} {:>12}", "RATING", "COUNT", "SHARE", "AVG USEFUL", "AVG QUALITY");
    println!("  {}", "-".repeat(54));
    for (dist, (useful, quality)) in aggregates.rating_distribution.iter().zip(
        aggregates
            .useful_by_rating
            .iter()
            .zip(aggregates.quality_by_rating.iter()),
    ) {
        println!(
            "  {:<10} {:>8} {:>7.1}% {:>12.2} {:>12.1}",
            rating_label(dist.rating),
            dist.count,
            dist.percentage,
            useful.average_useful,
            quality.average_quality
        );
    }

    println!();
    println!("  Review length:");
    for bin in &aggregates.length_histogram {
        println!("  {:<14} {:>8}", bin.label, bin.count);
    }

    if !aggregates.top_topics.is_empty() {
        println!();
        println!("  Top topics:");
        println!("  {:<24} {:>8} {:>8}", "TOPIC", "COUNT", "SHARE");
        println!("  {}", "-".repeat(42));
        for t in &aggregates.top_topics {
            println!("  {:<24} {:>8} {:>7.1}%", t.topic, t.count, t.percentage);
        }

        println!();
        println!("  Topics by rating:");
        println!(
            "  {:<24} {:>6} {:>6} {:>6} {:>6} {:>6}",
            "TOPIC", "1★", "2★", "3★", "4★", "5★"
        );
        for row in &aggregates.topic_by_rating {
            println!(
                "  {:<24} {:>6} {:>6} {:>6} {:>6} {:>6}",
                row.topic, row.ratings[0], row.ratings[1], row.ratings[2], row.ratings[3], row.ratings[4]
            );
        }
    }

    println!();
    println!("  User types:");
    println!("  {:<10} {:>8} {:>10}", "TYPE", "COUNT", "AVG RATING");
    for row in &aggregates.user_types {
        println!("  {:<10} {:>8} {:>10.2}", row.user_type, row.total, row.average_rating);
    }

    if !aggregates.weekly.is_empty() {
        println!();
        println!("  Weekly volume (weeks starting Sunday):");
        for w in &aggregates.weekly {
            println!("  {}  {:>6}", w.week_start, w.count);
        }
    }

    let trend = &aggregates.trend;
    if trend.first_half_count + trend.second_half_count > 0 {
        println!();
        println!(
            "  Trend: {:.2} → {:.2} ({:+.2}) over {} dated reviews",
            trend.first_half_average,
            trend.second_half_average,
            trend.delta,
            trend.first_half_count + trend.second_half_count
        );
    }

    println!();
    println!("  Fingerprint: {}", corpus.fingerprint());

    Ok(())
}
