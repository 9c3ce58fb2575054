//! # Review Lens Core
//!
//! The review analytics engine: normalization, classification, aggregation,
//! word mining, clustering, calendar analysis, and filtering over a corpus
//! of scraped customer reviews.
//!
//! Every computation is a pure, synchronous re-derivation from the current
//! review set and its parameters. This crate performs no filesystem or
//! network I/O and needs no async runtime; the `review-lens` application
//! handles files, configuration, and the CLI.
//!
//! Data flows one way:
//!
//! ```text
//! RawReview ─▶ normalize (date, split, classify) ─▶ NormalizedReview
//!     ├─▶ aggregate   (buckets, distributions, cross tabs)
//!     ├─▶ words       (term frequency)
//!     ├─▶ cluster     (topic / similarity / rating groups)
//!     ├─▶ calendar    (crisis days, volatility)
//!     └─▶ filter      (spec + overrides ─▶ sorted subset)
//! ```

pub mod aggregate;
pub mod calendar;
pub mod classify;
pub mod cluster;
pub mod corpus;
pub mod date;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod split;
pub mod store;
pub mod words;

#[cfg(test)]
mod testutil;
