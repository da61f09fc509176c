//! Shared utilities for CLI commands

use crate::config::Config;
use crate::snapshot::SnapshotEngine;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use pendmap_cache::PendingChangeCache;
use pendmap_core::{ChangeKind, ItemType, PendingChange, ENCODING_BINARY, ENCODING_UNCHANGED};
use std::path::Path;
use std::sync::Arc;

pub const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Open a snapshot and build a cache attached to it, without loading it
pub fn open_cache(config: &Config, snapshot: &Path) -> Result<(Arc<SnapshotEngine>, PendingChangeCache)> {
    let engine = Arc::new(
        SnapshotEngine::open(snapshot)
            .with_context(|| format!("Failed to open snapshot {}", snapshot.display()))?,
    );
    let cache = PendingChangeCache::with_options(engine.clone(), config.cache.clone())
        .context("Failed to create pending change cache")?;
    Ok((engine, cache))
}

/// Open a snapshot and load its pending changes
pub fn load_cache(config: &Config, snapshot: &Path) -> Result<(Arc<SnapshotEngine>, PendingChangeCache)> {
    let (engine, cache) = open_cache(config, snapshot)?;
    cache
        .try_refresh()
        .with_context(|| format!("Failed to load pending changes from {}", snapshot.display()))?;
    Ok((engine, cache))
}

/// How many records carry each change kind, in flag order, skipping zeros
pub fn kind_counts<'a>(changes: impl IntoIterator<Item = &'a Arc<PendingChange>> + Clone) -> Vec<(ChangeKind, usize)> {
    ChangeKind::ALL
        .into_iter()
        .map(|kind| {
            let count = changes
                .clone()
                .into_iter()
                .filter(|change| change.change_type.contains(kind))
                .count();
            (kind, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}

pub fn format_encoding(encoding: i32) -> String {
    match encoding {
        ENCODING_UNCHANGED => "unchanged".to_string(),
        ENCODING_BINARY => "binary".to_string(),
        code => code.to_string(),
    }
}

/// One-line summary: change type, server path, local path
pub fn format_change(change: &PendingChange) -> String {
    let marker = match change.item_type {
        ItemType::Folder => "/",
        ItemType::File => "",
    };
    let mut line = format!(
        "{:<18} {}{}",
        change.change_type.to_string(),
        change.server_item,
        marker
    );
    if let Some(source) = &change.source_server_item {
        line.push_str(&format!(" (from {})", source));
    }
    if let Some(local) = &change.local_item {
        line.push_str(&format!(" → {}", local));
    }
    line
}

/// Multi-line detail view of one record
pub fn print_details(change: &PendingChange) {
    println!("  Server item:   {}", change.server_item.cyan());
    match &change.local_item {
        Some(local) => println!("  Local item:    {}", local),
        None => println!("  Local item:    {}", "(not mapped)".dimmed()),
    }
    if let Some(source) = &change.source_server_item {
        println!("  Renamed from:  {}", source);
    }
    if let Some(source) = &change.source_local_item {
        println!("  Local source:  {}", source);
    }
    println!("  Change:        {}", change.change_type.to_string().yellow());
    println!("  Item type:     {:?}", change.item_type);
    println!("  Pending id:    {}", change.pending_change_id);
    println!("  Encoding:      {}", format_encoding(change.encoding));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendmap_core::ChangeType;

    #[test]
    fn test_kind_counts() {
        let changes = vec![
            Arc::new(PendingChange::new("$/a", ChangeKind::Edit)),
            Arc::new(PendingChange::new("$/b", ChangeType::of(ChangeKind::Edit).with(ChangeKind::Lock))),
            Arc::new(PendingChange::new("$/c", ChangeKind::Add)),
        ];

        assert_eq!(
            kind_counts(&changes),
            vec![(ChangeKind::Add, 1), (ChangeKind::Edit, 2), (ChangeKind::Lock, 1)]
        );
    }

    #[test]
    fn test_format_change() {
        let change = PendingChange::new("$/B", ChangeKind::Rename)
            .with_item_type(ItemType::Folder)
            .with_source_server_item("$/A")
            .with_local_item("/ws/B");

        assert_eq!(format_change(&change), "rename             $/B/ (from $/A) → /ws/B");
    }

    #[test]
    fn test_format_encoding() {
        assert_eq!(format_encoding(ENCODING_UNCHANGED), "unchanged");
        assert_eq!(format_encoding(ENCODING_BINARY), "binary");
        assert_eq!(format_encoding(65001), "65001");
    }
}
