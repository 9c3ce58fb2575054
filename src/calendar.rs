//! `rlens calendar`: month heat map, crisis days, and rating volatility.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use review_lens_core::calendar::{
    build_calendar, crisis_summary, month_view, volatility, CrisisSummary, DayTone, MonthView,
    VolatilityPoint,
};
use serde::Serialize;

use crate::config::Config;
use crate::corpus_file::load_corpus;

#[derive(Serialize)]
struct CalendarReport {
    month: Option<MonthView>,
    crises: CrisisSummary,
    volatility: Vec<VolatilityPoint>,
}

/// Parse `YYYY-MM`.
pub fn parse_month(s: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}'. Use YYYY-MM.", s))?;
    Ok((date.year(), date.month()))
}

pub fn run_calendar(config: &Config, month: Option<&str>, json: bool) -> Result<()> {
    let corpus = load_corpus(config)?;
    let days = build_calendar(corpus.reviews());

    let target = match month {
        Some(m) => Some(parse_month(m)?),
        None => days.last().map(|d| (d.date.year(), d.date.month())),
    };
    let view = match target {
        Some((year, month)) => match month_view(&days, year, month) {
            Some(view) => Some(view),
            None => bail!("Invalid month {}-{:02}", year, month),
        },
        None => None,
    };
    let crises = crisis_summary(&days);
    let vol = volatility(&corpus.aggregates().daily);

    if json {
        let report = CalendarReport {
            month: view,
            crises,
            volatility: vol,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &view {
        Some(view) => print_month(view),
        None => println!("No dated reviews."),
    }

    println!();
    if crises.total == 0 {
        println!("  No crisis days.");
    } else {
        println!("  Crisis days ({} total):", crises.total);
        println!("  {:<12} {:>6} {:>6} {:>8}", "DATE", "COUNT", "LOW", "AVG");
        for c in &crises.recent {
            println!(
                "  {:<12} {:>6} {:>6} {:>8.2}",
                c.date, c.count, c.low_count, c.average_rating
            );
        }
        if crises.overflow > 0 {
            println!("  … and {} more", crises.overflow);
        }
    }

    if !vol.is_empty() {
        println!();
        println!("  Rating volatility (rolling std dev):");
        for p in &vol {
            println!("  {}  {:>6.3}", p.date, p.std_dev);
        }
    }
    Ok(())
}

fn tone_marker(tone: DayTone) -> char {
    match tone {
        DayTone::Empty => ' ',
        DayTone::Positive => '+',
        DayTone::Mixed => '~',
        DayTone::Negative => '-',
        DayTone::Crisis => '!',
    }
}

fn print_month(view: &MonthView) {
    println!("  {}-{:02}  (max {} per day)", view.year, view.month, view.max_count);
    println!();
    print!(" ");
    for name in ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"] {
        print!(" {:<8}", name);
    }
    println!();

    let lead = view
        .cells
        .first()
        .map(|c| c.date.weekday().num_days_from_sunday() as usize)
        .unwrap_or(0);
    let mut line = " ".to_string();
    for _ in 0..lead {
        line.push_str(&format!(" {:<8}", ""));
    }
    for (i, cell) in view.cells.iter().enumerate() {
        let entry = if cell.count == 0 {
            format!("{:>2}", cell.date.day())
        } else {
            format!("{:>2} {:>3}{}", cell.date.day(), cell.count, tone_marker(cell.tone))
        };
        line.push_str(&format!(" {:<8}", entry));
        if (lead + i + 1) % 7 == 0 {
            println!("{}", line.trim_end());
            line = " ".to_string();
        }
    }
    if !line.trim().is_empty() {
        println!("{}", line.trim_end());
    }
    println!();
    println!("  + positive  ~ mixed  - negative  ! crisis");
}
