//! # Review Lens
//!
//! Offline analytics over scraped customer reviews: aggregates, term
//! frequencies, clustering, a crisis calendar, and a filter/export layer
//! with saved searches and collections.
//!
//! The analysis engine lives in the `review-lens-core` crate and is pure:
//! it borrows normalized reviews and returns plain data. This crate is the
//! application around it: configuration, corpus loading, persisted state,
//! progress reporting, rendering, and the `rlens` commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────────────┐
//! │ reviews.json │──▶│  Normalizer  │──▶│ Corpus (fingerprinted) │
//! │  (scraper)   │   │ date/split/  │   └───────────┬────────────┘
//! └──────────────┘   │  classify    │               │
//!                    └──────────────┘   ┌───────────┼───────────┐
//!                                       ▼           ▼           ▼
//!                                  aggregates   clustering   calendar
//!                                       │           │           │
//!                                       └─────▶ filter ◀────────┘
//!                                                 │
//!                                     text / JSON / CSV output
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rlens stats                              # overview and tables
//! rlens cluster --mode similarity          # near-duplicate reviews
//! rlens calendar --month 2024-06           # heat map and crisis days
//! rlens filter --rating 1 --format csv --output one-star.csv
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`corpus_file`] | Corpus loading and repair |
//! | [`state`] | JSON file store for saved state |
//! | [`progress`] | Clustering progress reporters |
//! | [`export`] | Text, JSON, and CSV rendering |
//! | [`stats`] | `rlens stats` |
//! | [`words`] | `rlens words` |
//! | [`cluster`] | `rlens cluster` |
//! | [`calendar`] | `rlens calendar` |
//! | [`filter`] | `rlens filter` |
//! | [`saved`] | Saved searches and collections |

pub mod calendar;
pub mod cluster;
pub mod config;
pub mod corpus_file;
pub mod export;
pub mod filter;
pub mod logging;
pub mod progress;
pub mod saved;
pub mod state;
pub mod stats;
pub mod words;
