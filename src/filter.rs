//! `rlens filter`: select, sort, and export reviews.
//!
//! The result set comes from the first active source below; lower rows are
//! ignored once a higher one is given.
//!
//! | Flag | Source |
//! |------|--------|
//! | `--collection NAME` | URLs stored in a collection |
//! | `--day YYYY-MM-DD` | reviews posted on that calendar day |
//! | `--group ID` | members of a cluster group (`--group-mode`) |
//! | filter flags / `--saved NAME` | the composed filter |
//!
//! Sorting always follows the composed filter's sort settings.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use review_lens_core::calendar::{build_calendar, find_day};
use review_lens_core::cluster::{ClusterMode, SimilarityStrategy};
use review_lens_core::filter::{apply_filter, FilterSpec, Overrides, ReplyPresence, SortDirection, SortKey};
use review_lens_core::models::UserType;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::cluster::{cluster_group, resolve_options};
use crate::config::Config;
use crate::corpus_file::{build_normalizer, load_corpus_with};
use crate::export::{render, OutputFormat};
use crate::progress::ProgressMode;
use crate::state::open_state;

/// Composed filter flags, shared by `filter` and `saved save`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive text search over review text and reviewer name.
    #[arg(long)]
    pub search: Option<String>,

    /// Also search operator reply text.
    #[arg(long)]
    pub include_replies: bool,

    /// Exact star rating (1-5).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub rating: Option<u8>,

    /// Reviewer type: seller, buyer, or unknown.
    #[arg(long)]
    pub user_type: Option<UserType>,

    /// Earliest review date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest review date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Minimum useful votes.
    #[arg(long)]
    pub min_useful: Option<u32>,

    /// Reply presence: true, false, or all.
    #[arg(long)]
    pub has_reply: Option<ReplyPresence>,

    /// Sort key: date or rating.
    #[arg(long)]
    pub sort: Option<SortKey>,

    /// Sort direction: asc or desc.
    #[arg(long)]
    pub direction: Option<SortDirection>,
}

impl FilterArgs {
    /// `base` with every flag given on the command line applied over it.
    pub fn apply_to(&self, mut base: FilterSpec) -> FilterSpec {
        if self.search.is_some() {
            base.search = self.search.clone();
        }
        if self.include_replies {
            base.include_replies = true;
        }
        if self.rating.is_some() {
            base.rating = self.rating;
        }
        if self.user_type.is_some() {
            base.user_type = self.user_type;
        }
        if self.from.is_some() {
            base.date_from = self.from;
        }
        if self.to.is_some() {
            base.date_to = self.to;
        }
        if self.min_useful.is_some() {
            base.min_useful = self.min_useful;
        }
        if let Some(presence) = self.has_reply {
            base.has_reply = presence;
        }
        if let Some(sort) = self.sort {
            base.sort = sort;
        }
        if let Some(direction) = self.direction {
            base.direction = direction;
        }
        base
    }

    pub fn to_spec(&self) -> FilterSpec {
        self.apply_to(FilterSpec::default())
    }
}

#[derive(Args, Debug, Clone)]
pub struct FilterCommand {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Start from a saved search; filter flags override its fields.
    #[arg(long)]
    pub saved: Option<String>,

    /// Show the reviews in a collection.
    #[arg(long)]
    pub collection: Option<String>,

    /// Show the reviews posted on one day (YYYY-MM-DD).
    #[arg(long)]
    pub day: Option<NaiveDate>,

    /// Clustering mode used to resolve `--group`.
    #[arg(long, default_value = "topic")]
    pub group_mode: ClusterMode,

    /// Show the members of a cluster group, e.g. `topic-payment` or `rating-1`.
    #[arg(long)]
    pub group: Option<String>,

    /// Similarity threshold for `--group-mode similarity`.
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Similarity strategy for `--group-mode similarity`.
    #[arg(long)]
    pub strategy: Option<SimilarityStrategy>,

    /// Output format: text, json, or csv.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Write to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Append the resulting reviews to an existing collection.
    #[arg(long)]
    pub add_to: Option<String>,
}

pub async fn run_filter(config: &Config, cmd: &FilterCommand) -> Result<()> {
    let (store, mut state) = open_state(config)?;

    let base = match &cmd.saved {
        Some(name) => match state.find_search(name) {
            Some(saved) => saved.spec.clone(),
            None => bail!("Unknown saved search '{}'", name),
        },
        None => FilterSpec::default(),
    };
    let spec = cmd.filter.apply_to(base);

    let normalizer = build_normalizer(config)?;
    let corpus = Arc::new(load_corpus_with(config, &normalizer)?);
    let mut overrides = Overrides::default();

    if let Some(name) = &cmd.collection {
        let collection = state
            .find_collection(name)
            .with_context(|| format!("Unknown collection '{}'", name))?;
        overrides.collection = Some(collection.source_urls.clone());
    }

    if let Some(day) = cmd.day {
        let days = build_calendar(corpus.reviews());
        overrides.calendar_day = Some(find_day(&days, day).map(|d| d.source_urls()).unwrap_or_default());
    }

    if let Some(id) = &cmd.group {
        let opts = resolve_options(config, cmd.threshold, cmd.strategy)?;
        let group = cluster_group(
            Arc::clone(&corpus),
            cmd.group_mode,
            opts,
            ProgressMode::default_for_tty().reporter(),
            id.clone(),
        )
        .await?;
        let Some(group) = group else {
            bail!("No {} cluster group with id '{}'", cmd.group_mode, id);
        };
        overrides.cluster_group = Some(group.source_urls);
    }

    let results = apply_filter(corpus.reviews(), &spec, &overrides);
    match overrides.active() {
        Some((kind, urls)) => info!(source = %kind, requested = urls.len(), matched = results.len(), "Override applied"),
        None => info!(matched = results.len(), "Filter applied"),
    }

    if let Some(name) = &cmd.add_to {
        let urls: Vec<String> = results.iter().map(|r| r.source_url.clone()).collect();
        let added = state.add_to_collection(name, &urls)?;
        state.save(&store)?;
        eprintln!("Added {} review(s) to collection '{}'", added, name);
    }

    render(&results, cmd.format, cmd.output.as_deref(), normalizer.splitter())
}
