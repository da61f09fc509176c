//! Pendmap CLI - pmx command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pendmap_cli::{cmd, config, logging};
use std::path::PathBuf;

/// pmx - Pending change cache for version control workspaces
#[derive(Parser)]
#[command(name = "pmx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/pendmap/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the pending changes of a workspace snapshot
    Status {
        /// Workspace snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,
    },
    /// Look up pending changes by server or local path
    Show {
        /// Workspace snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Server path ($/...) or local path
        path: String,
        /// Include everything beneath the path
        #[arg(short, long)]
        recursive: bool,
    },
    /// Replay a script of engine events and print every cache notification
    Replay {
        /// Workspace snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Event script: a JSON array of engine events
        events: PathBuf,
    },
    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = config::load(cli.config.as_deref())?;
    let _guard = logging::init_logging(&loaded.config.log).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Status { snapshot } => cmd::status::run(&loaded.config, &snapshot),
        Commands::Show { snapshot, path, recursive } => {
            cmd::show::run(&loaded.config, &snapshot, &path, recursive)
        }
        Commands::Replay { snapshot, events } => cmd::replay::run(&loaded.config, &snapshot, &events),
        Commands::Config => cmd::config::run(&loaded),
    }
}
