//! Show the effective configuration

use crate::config::{self, LoadedConfig};
use crate::logging::LOG_ENV;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn run(loaded: &LoadedConfig) -> Result<()> {
    let config = &loaded.config;

    println!("{}", "Configuration".bold());
    match &loaded.source {
        Some(path) => println!("{}: {}\n", "Location".dimmed(), path.display()),
        None => {
            let default = config::config_file_path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "(no config directory)".to_string());
            println!("{}: {} {}\n", "Location".dimmed(), default, "(not found, using defaults)".dimmed());
        }
    }

    println!("{}", "[cache]".yellow());
    println!("  {} = {:?}", "dispatch".cyan(), config.cache.dispatch);

    println!("\n{}", "[log]".yellow());
    println!("  {} = {}", "level".cyan(), config.log.level);
    match &config.log.dir {
        Some(dir) => println!("  {} = {}", "dir".cyan(), dir.display()),
        None => println!("  {} = {}", "dir".cyan(), "(stderr only)".dimmed()),
    }

    if let Ok(filter) = std::env::var(LOG_ENV) {
        println!("\n{}", format!("{} is set ({}), overriding log.level", LOG_ENV, filter).dimmed());
    }

    Ok(())
}
