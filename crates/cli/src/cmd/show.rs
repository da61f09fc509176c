//! Look up pending changes by path

use crate::config::Config;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use pendmap_core::server_path;
use std::path::Path;

pub fn run(config: &Config, snapshot: &Path, path: &str, recursive: bool) -> Result<()> {
    let (_engine, cache) = util::load_cache(config, snapshot)?;
    let is_server = server_path::is_server_path(path);

    if recursive {
        let records = if is_server {
            cache.by_server_path_recursive(path)
        } else {
            cache.by_local_path_recursive(path)
        }
        .with_context(|| format!("Invalid path: {}", path))?;

        if records.is_empty() {
            println!("{}", format!("No pending changes under {}", path).dimmed());
        } else {
            println!("{} under {}", format!("{} pending changes", records.len()).bold(), path.cyan());
            for change in &records {
                println!("  {}", util::format_change(change));
            }
        }
    } else {
        let record = if is_server {
            cache.by_server_path(path)
        } else {
            cache.by_local_path(path)
        }
        .with_context(|| format!("Invalid path: {}", path))?;

        match record {
            Some(change) => {
                println!("{}", "Pending change".bold());
                util::print_details(&change);
            }
            None => println!("{}", format!("No pending change at {}", path).dimmed()),
        }
    }

    cache.dispose();
    Ok(())
}
