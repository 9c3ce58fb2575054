//! `rlens cluster`: group reviews by topic, rating, or text similarity.
//!
//! Similarity clustering is quadratic in the number of reviews, so it runs
//! on a blocking thread while the async runtime watches for Ctrl-C. A
//! cancelled run reports how far it got and produces no groups. A Ctrl-C
//! after clustering has finished exits the process with status 130.

use anyhow::{bail, Context, Result};
use review_lens_core::cluster::{
    cluster, find_group, ClusterError, ClusterMode, ClusterOptions, ReviewGroup, SimilarityStrategy,
};
use review_lens_core::corpus::Corpus;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, THRESHOLD_RANGE};
use crate::corpus_file::load_corpus;
use crate::export::excerpt;
use crate::progress::{ProgressMode, Reporter};

/// Owned view of a [`ReviewGroup`] that can leave the clustering thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub id: String,
    pub label: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representative: Option<String>,
    pub source_urls: Vec<String>,
}

impl From<&ReviewGroup<'_>> for GroupSummary {
    fn from(group: &ReviewGroup<'_>) -> Self {
        Self {
            id: group.id.clone(),
            label: group.label.clone(),
            count: group.count,
            representative: group.representative.clone(),
            source_urls: group.source_urls(),
        }
    }
}

/// Clustering options from the CLI, falling back to `[clustering]`.
pub fn resolve_options(
    config: &Config,
    threshold: Option<u8>,
    strategy: Option<SimilarityStrategy>,
) -> Result<ClusterOptions> {
    let threshold = threshold.unwrap_or(config.clustering.threshold);
    if !THRESHOLD_RANGE.contains(&threshold) {
        bail!(
            "similarity threshold must be between {} and {} (got {})",
            THRESHOLD_RANGE.start(),
            THRESHOLD_RANGE.end(),
            threshold
        );
    }
    Ok(ClusterOptions {
        threshold,
        strategy: strategy.unwrap_or(config.clustering.strategy),
    })
}

/// What a Ctrl-C means when it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Clustering is still running: stop it and report partial progress.
    Cancel,
    /// Clustering has finished: exit the way an unhandled SIGINT would.
    Exit,
}

fn interrupt_action(finished: &AtomicBool) -> Interrupt {
    if finished.load(Ordering::Acquire) {
        Interrupt::Exit
    } else {
        Interrupt::Cancel
    }
}

/// Listen for Ctrl-C for the rest of the process.
///
/// Once `tokio::signal::ctrl_c` has been awaited, the process-wide SIGINT
/// handler stays installed and the default "terminate" action is gone. The
/// watcher therefore keeps listening after clustering and exits with status
/// 130 itself, so a later Ctrl-C (while writing output, say) still stops
/// the command.
fn spawn_interrupt_watcher(cancel: Arc<AtomicBool>, finished: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match interrupt_action(&finished) {
                Interrupt::Cancel => {
                    warn!("Interrupt received; cancelling clustering");
                    cancel.store(true, Ordering::Relaxed);
                }
                Interrupt::Exit => std::process::exit(130),
            }
        }
    });
}

/// Cluster `corpus` on a blocking thread and hand the borrowed groups to
/// `finish`, whose owned result is returned.
async fn with_groups<T, F>(
    corpus: Arc<Corpus>,
    mode: ClusterMode,
    opts: ClusterOptions,
    reporter: Reporter,
    finish: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&[ReviewGroup<'_>]) -> T + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    spawn_interrupt_watcher(Arc::clone(&cancel), Arc::clone(&finished));

    let result = tokio::task::spawn_blocking(move || {
        let groups = cluster(corpus.reviews(), mode, &opts, &cancel, &*reporter)?;
        Ok::<_, ClusterError>(finish(&groups))
    })
    .await
    .context("Clustering task panicked");
    finished.store(true, Ordering::Release);

    Ok(result??)
}

/// Cluster `corpus` off the async runtime, cancelling on Ctrl-C.
pub async fn cluster_corpus(
    corpus: Arc<Corpus>,
    mode: ClusterMode,
    opts: ClusterOptions,
    reporter: Reporter,
) -> Result<Vec<GroupSummary>> {
    with_groups(corpus, mode, opts, reporter, |groups| {
        groups.iter().map(GroupSummary::from).collect()
    })
    .await
}

/// Like [`cluster_corpus`], keeping only the group with `id`.
pub async fn cluster_group(
    corpus: Arc<Corpus>,
    mode: ClusterMode,
    opts: ClusterOptions,
    reporter: Reporter,
    id: String,
) -> Result<Option<GroupSummary>> {
    with_groups(corpus, mode, opts, reporter, move |groups| {
        find_group(groups, &id).map(GroupSummary::from)
    })
    .await
}

/// Run the cluster command.
pub async fn run_cluster(
    config: &Config,
    mode: ClusterMode,
    threshold: Option<u8>,
    strategy: Option<SimilarityStrategy>,
    progress: Option<ProgressMode>,
    members: bool,
    json: bool,
) -> Result<()> {
    let opts = resolve_options(config, threshold, strategy)?;
    let corpus = Arc::new(load_corpus(config)?);
    let reviews = corpus.len();
    let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();

    let groups = cluster_corpus(corpus, mode, opts, reporter).await?;
    info!(mode = %mode, reviews, groups = groups.len(), "Clusters built");

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if mode == ClusterMode::Similarity {
        println!(
            "Similarity clusters (threshold {}%, {}) over {} reviews",
            opts.threshold, opts.strategy, reviews
        );
    } else {
        println!("{} clusters over {} reviews", capitalize(&mode.to_string()), reviews);
    }
    println!();

    if groups.is_empty() {
        println!("  No groups.");
        return Ok(());
    }

    println!("  {:<24} {:>6}   {}", "ID", "COUNT", "LABEL");
    println!("  {}", "-".repeat(60));
    for g in &groups {
        println!("  {:<24} {:>6}   {}", g.id, g.count, g.label);
        if let Some(rep) = &g.representative {
            println!("  {:<24} {:>6}   \"{}\"", "", "", excerpt(rep, 72));
        }
        if members {
            for url in &g.source_urls {
                println!("  {:<24} {:>6}     {}", "", "", url);
            }
        }
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
