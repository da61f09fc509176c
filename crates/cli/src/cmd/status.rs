//! Summarize the pending changes of a workspace snapshot

use crate::config::Config;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

/// Changes listed before the output is cut short
const LISTED: usize = 10;

pub fn run(config: &Config, snapshot: &Path) -> Result<()> {
    let (engine, cache) = util::load_cache(config, snapshot)?;
    let records = cache.pending_changes();

    println!("{}", "Workspace Status".bold());
    println!("{}", util::RULE);
    println!();

    println!("Workspace:     {}", cache.workspace().as_str().cyan());
    println!("Snapshot:      {}", engine.path().display());
    println!("Mappings:      {} working folders", engine.mappings().folders().len());
    println!();

    if records.is_empty() {
        println!("  {}", "No pending changes".dimmed());
        cache.dispose();
        return Ok(());
    }

    println!("Pending changes: {}", records.len().to_string().green());
    for (kind, count) in util::kind_counts(&records) {
        println!("  {:<14} {}", kind.name(), count);
    }
    println!();

    println!("Changes:");
    for change in records.iter().take(LISTED) {
        println!("  {}", util::format_change(change));
    }
    if records.len() > LISTED {
        println!("  ... and {} more", records.len() - LISTED);
    }

    cache.dispose();
    Ok(())
}
