//! pmx configuration
//!
//! Read from `--config` when given, otherwise from
//! `<config dir>/pendmap/config.toml`. A missing default file means defaults.

use anyhow::{Context, Result};
use pendmap_cache::CacheOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheOptions,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when `PENDMAP_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,
    /// Directory for daily log files; stderr only when absent
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

/// Configuration plus the file it came from, if any
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
}

/// Default configuration file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pendmap").join("config.toml"))
}

pub fn parse(contents: &str) -> Result<Config> {
    toml::from_str(contents).context("Invalid configuration")
}

pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read(path)?;
        return Ok(LoadedConfig {
            config,
            source: Some(path.to_path_buf()),
        });
    }

    match config_file_path() {
        Some(path) if path.is_file() => {
            let config = read(&path)?;
            Ok(LoadedConfig {
                config,
                source: Some(path),
            })
        }
        _ => Ok(LoadedConfig {
            config: Config::default(),
            source: None,
        }),
    }
}

fn read(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&contents).with_context(|| format!("In config file {}", path.display()))
}
