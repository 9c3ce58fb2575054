//! # Review Lens CLI (`rlens`)
//!
//! ## Usage
//!
//! ```bash
//! rlens --config ./config/rlens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rlens stats` | Overview and aggregate tables |
//! | `rlens words` | Most frequent terms, overall and per rating |
//! | `rlens cluster --mode <m>` | Topic, rating, or similarity groups |
//! | `rlens calendar` | Month heat map, crisis days, volatility |
//! | `rlens filter` | Filter, sort, and export reviews |
//! | `rlens saved <action>` | Manage saved searches |
//! | `rlens collection <action>` | Manage review collections |
//!
//! ## Examples
//!
//! ```bash
//! # Aggregates as JSON
//! rlens stats --json
//!
//! # Near-duplicate complaints, stricter than the default
//! rlens cluster --mode similarity --threshold 85
//!
//! # Every 1-star review mentioning refunds, newest first, as CSV
//! rlens filter --rating 1 --search refund --format csv --output refunds.csv
//!
//! # Reviews from a crisis day
//! rlens filter --day 2024-06-10
//! ```

use clap::{Parser, Subcommand};
use review_lens::filter::{FilterArgs, FilterCommand};
use review_lens::progress::ProgressMode;
use review_lens::{calendar, cluster, config, filter, logging, saved, stats, words};
use review_lens_core::cluster::{ClusterMode, SimilarityStrategy};
use std::path::PathBuf;

/// Review Lens CLI: analytics and clustering for scraped customer reviews.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file is not an error; built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "rlens",
    about = "Review Lens: analytics and clustering for scraped customer reviews",
    version,
    long_about = "Review Lens normalizes scraped review records (dates, operator replies, \
    reviewer type, topics, quality), then computes aggregates, term frequencies, topic, rating, \
    and similarity clusters, and a crisis calendar, with a filter and export layer on top."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rlens.toml")]
    config: PathBuf,

    /// Review corpus (JSON), overriding `[corpus].path`.
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the corpus overview and aggregate tables.
    Stats {
        /// Emit JSON instead of tables.
        #[arg(long)]
        json: bool,
    },

    /// Show the most frequent terms in review text.
    ///
    /// Stop words and terms shorter than four characters are ignored.
    Words {
        /// Only reviews with this star rating (1-5).
        #[arg(long)]
        rating: Option<u8>,

        #[arg(long)]
        json: bool,
    },

    /// Group reviews by topic, rating, or text similarity.
    ///
    /// Similarity mode compares every pair of reviews and can take a while on
    /// large corpora; press Ctrl-C to cancel.
    Cluster {
        /// Clustering mode: `topic`, `similarity`, or `rating`.
        #[arg(long, default_value = "topic")]
        mode: ClusterMode,

        /// Similarity threshold in percent (50-95). Defaults to `[clustering].threshold`.
        #[arg(long)]
        threshold: Option<u8>,

        /// Similarity strategy: `greedy` or `connected`.
        #[arg(long)]
        strategy: Option<SimilarityStrategy>,

        /// Progress output: `off`, `human`, or `json`. Defaults to human on a TTY.
        #[arg(long)]
        progress: Option<ProgressMode>,

        /// List member source URLs under each group.
        #[arg(long)]
        members: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show a month heat map, crisis days, and rating volatility.
    Calendar {
        /// Month to display (YYYY-MM). Defaults to the month of the latest review.
        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Filter, sort, and export reviews.
    Filter(FilterCommand),

    /// Manage saved searches.
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },

    /// Manage collections of reviews.
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
}

/// Saved search subcommands.
#[derive(Subcommand)]
enum SavedAction {
    /// Save the given filter flags under a name, replacing any search with that name.
    Save {
        name: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List saved searches.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved search.
    Delete { name: String },
}

/// Collection subcommands.
#[derive(Subcommand)]
enum CollectionAction {
    /// Create an empty collection.
    Create { name: String },
    /// Add reviews, by source URL, to a collection.
    Add {
        name: String,
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// List collections.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a collection.
    Delete { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging()?;

    let mut cfg = config::resolve_config(&cli.config)?;
    if let Some(corpus) = cli.corpus {
        cfg.corpus.path = corpus;
    }

    match cli.command {
        Commands::Stats { json } => {
            stats::run_stats(&cfg, json)?;
        }
        Commands::Words { rating, json } => {
            words::run_words(&cfg, rating, json)?;
        }
        Commands::Cluster {
            mode,
            threshold,
            strategy,
            progress,
            members,
            json,
        } => {
            cluster::run_cluster(&cfg, mode, threshold, strategy, progress, members, json).await?;
        }
        Commands::Calendar { month, json } => {
            calendar::run_calendar(&cfg, month.as_deref(), json)?;
        }
        Commands::Filter(cmd) => {
            filter::run_filter(&cfg, &cmd).await?;
        }
        Commands::Saved { action } => match action {
            SavedAction::Save { name, filter } => saved::save_search(&cfg, &name, &filter)?,
            SavedAction::List { json } => saved::list_searches(&cfg, json)?,
            SavedAction::Delete { name } => saved::delete_search(&cfg, &name)?,
        },
        Commands::Collection { action } => match action {
            CollectionAction::Create { name } => saved::create_collection(&cfg, &name)?,
            CollectionAction::Add { name, urls } => saved::add_to_collection(&cfg, &name, &urls)?,
            CollectionAction::List { json } => saved::list_collections(&cfg, json)?,
            CollectionAction::Delete { name } => saved::delete_collection(&cfg, &name)?,
        },
    }

    Ok(())
}
