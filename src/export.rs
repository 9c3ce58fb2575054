//! Rendering filtered review sets: text listing, CSV, and JSON.
//!
//! CSV columns: reviewer name, date, rating, review text, useful count,
//! source URL, has reply. Undated reviews are written with the Unix epoch
//! since CSV has no null date. JSON is the normalized reviews verbatim.

use anyhow::{Context, Result};
use review_lens_core::models::NormalizedReview;
use review_lens_core::split::ReplySplitter;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

pub const CSV_HEADER: [&str; 7] = [
    "Reviewer Name",
    "Date",
    "Rating",
    "Review Text",
    "Useful Count",
    "Source URL",
    "Has Reply",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => anyhow::bail!("Unknown output format: '{}'. Use text, json, or csv.", other),
        }
    }
}

pub fn write_csv<W: Write>(reviews: &[&NormalizedReview], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for r in reviews {
        let date = r.canonical_date.instant_or_epoch().to_rfc3339();
        let rating = r.rating.to_string();
        let useful = r.useful_count.to_string();
        writer.write_record([
            r.reviewer.name.as_str(),
            date.as_str(),
            rating.as_str(),
            r.main_text.as_str(),
            useful.as_str(),
            r.source_url.as_str(),
            if r.has_reply() { "Yes" } else { "No" },
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(reviews: &[&NormalizedReview], mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, reviews)?;
    writeln!(out)?;
    Ok(())
}

/// Human listing: one header line and a text excerpt per review, plus the
/// operator reply without its `Reply from ...` marker.
pub fn write_text<W: Write>(reviews: &[&NormalizedReview], splitter: &ReplySplitter, mut out: W) -> Result<()> {
    for r in reviews {
        let date = r
            .canonical_date
            .instant()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "undated".to_string());
        writeln!(
            out,
            "{}  {}  {} ({})  useful {}{}",
            date,
            stars(r.rating),
            r.reviewer.name,
            r.user_type,
            r.useful_count,
            if r.has_reply() { "  [replied]" } else { "" }
        )?;
        writeln!(out, "    {}", excerpt(&r.main_text, 160))?;
        if let Some(reply) = &r.reply_text {
            writeln!(out, "    ↳ reply: {}", excerpt(splitter.reply_body(reply), 160))?;
        }
        writeln!(out, "    {}", r.source_url)?;
    }
    writeln!(out, "{} review(s)", reviews.len())?;
    Ok(())
}

/// Write `reviews` in `format` to `output`, or stdout when `None`.
pub fn render(
    reviews: &[&NormalizedReview],
    format: OutputFormat,
    output: Option<&Path>,
    splitter: &ReplySplitter,
) -> Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let buf = std::io::BufWriter::new(file);
            write_format(reviews, format, splitter, buf)?;
            eprintln!("Wrote {} review(s) to {}", reviews.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_format(reviews, format, splitter, stdout.lock())?;
        }
    }
    Ok(())
}

fn write_format<W: Write>(
    reviews: &[&NormalizedReview],
    format: OutputFormat,
    splitter: &ReplySplitter,
    out: W,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text(reviews, splitter, out),
        OutputFormat::Json => write_json(reviews, out),
        OutputFormat::Csv => write_csv(reviews, out),
    }
}

pub fn stars(rating: u8) -> String {
    let filled = rating.min(5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// First `max_chars` characters of `text` on one line, with an ellipsis
/// when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}
