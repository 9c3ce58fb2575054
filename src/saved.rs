//! Saved searches and collections.
//!
//! Every mutating command loads the state file, applies one change, and
//! writes the whole state back.

use anyhow::{bail, Result};
use chrono::Utc;

use crate::config::Config;
use crate::filter::FilterArgs;
use crate::state::open_state;

pub fn save_search(config: &Config, name: &str, args: &FilterArgs) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Saved search name must not be empty");
    }
    let (store, mut state) = open_state(config)?;
    let existed = state.find_search(name).is_some();
    let saved = state.save_search(name, args.to_spec());
    let id = saved.id.clone();
    state.save(&store)?;
    println!(
        "{} saved search '{}' ({})",
        if existed { "Updated" } else { "Created" },
        name,
        id
    );
    Ok(())
}

pub fn list_searches(config: &Config, json: bool) -> Result<()> {
    let (_, state) = open_state(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&state.searches)?);
        return Ok(());
    }
    if state.searches.is_empty() {
        println!("No saved searches.");
        return Ok(());
    }
    println!("  {:<24} {}", "NAME", "FILTER");
    println!("  {}", "-".repeat(60));
    for s in &state.searches {
        println!("  {:<24} {}", s.name, serde_json::to_string(&s.spec)?);
    }
    Ok(())
}

pub fn delete_search(config: &Config, name: &str) -> Result<()> {
    let (store, mut state) = open_state(config)?;
    if !state.delete_search(name) {
        bail!("Unknown saved search '{}'", name);
    }
    state.save(&store)?;
    println!("Deleted saved search '{}'", name);
    Ok(())
}

pub fn create_collection(config: &Config, name: &str) -> Result<()> {
    let (store, mut state) = open_state(config)?;
    let id = state.create_collection(name, Utc::now())?.id.clone();
    state.save(&store)?;
    println!("Created collection '{}' ({})", name.trim(), id);
    Ok(())
}

pub fn add_to_collection(config: &Config, name: &str, urls: &[String]) -> Result<()> {
    let (store, mut state) = open_state(config)?;
    let added = state.add_to_collection(name, urls)?;
    state.save(&store)?;
    println!(
        "Added {} of {} review(s) to '{}'",
        added,
        urls.len(),
        name
    );
    Ok(())
}

pub fn list_collections(config: &Config, json: bool) -> Result<()> {
    let (_, state) = open_state(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&state.collections)?);
        return Ok(());
    }
    if state.collections.is_empty() {
        println!("No collections.");
        return Ok(());
    }
    println!("  {:<24} {:>8}   {}", "NAME", "REVIEWS", "CREATED");
    println!("  {}", "-".repeat(60));
    for c in &state.collections {
        println!(
            "  {:<24} {:>8}   {}",
            c.name,
            c.source_urls.len(),
            c.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub fn delete_collection(config: &Config, name: &str) -> Result<()> {
    let (store, mut state) = open_state(config)?;
    if !state.delete_collection(name) {
        bail!("Unknown collection '{}'", name);
    }
    state.save(&store)?;
    println!("Deleted collection '{}'", name);
    Ok(())
}
