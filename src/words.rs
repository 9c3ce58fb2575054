//! `rlens words`: most frequent terms in review text.

use anyhow::{bail, Result};
use review_lens_core::cluster::rating_label;
use review_lens_core::words::{WordFrequencyEntry, WordMiner};

use crate::config::Config;
use crate::corpus_file::load_corpus;

pub fn run_words(config: &Config, rating: Option<u8>, json: bool) -> Result<()> {
    if let Some(r) = rating {
        if !(1..=5).contains(&r) {
            bail!("--rating must be between 1 and 5 (got {})", r);
        }
    }

    let corpus = load_corpus(config)?;
    let miner = WordMiner::new(&config.classification.extra_stop_words);
    let report = miner.report(corpus.reviews());

    match rating {
        Some(r) => {
            let terms = report
                .by_rating
                .iter()
                .find(|t| t.rating == r)
                .map(|t| t.terms.as_slice())
                .unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(terms)?);
            } else {
                print_terms(&format!("Top terms in {} reviews", rating_label(r)), terms);
            }
        }
        None if json => println!("{}", serde_json::to_string_pretty(&report)?),
        None => {
            print_terms("Top terms", &report.global);
            for group in &report.by_rating {
                print_terms(&rating_label(group.rating), &group.terms);
            }
        }
    }
    Ok(())
}

fn print_terms(title: &str, terms: &[WordFrequencyEntry]) {
    println!("{}:", title);
    if terms.is_empty() {
        println!("  (none)");
    }
    for t in terms {
        println!("  {:<24} {:>6}", t.term, t.count);
    }
    println!();
}
