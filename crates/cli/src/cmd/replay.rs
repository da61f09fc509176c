//! Replay a scripted sequence of engine events against a snapshot

use crate::config::Config;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use pendmap_cache::{PendingChangeCache, PendingChangeCacheListener};
use pendmap_core::PendingChange;
use pendmap_events::EngineEvent;
use std::path::Path;
use std::sync::Arc;

/// Records every cache notification as a line of text
#[derive(Default)]
struct Transcript {
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    fn push(&self, line: String) {
        self.lines.lock().push(line);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl PendingChangeCacheListener for Transcript {
    fn on_before_update(&self, _cache: &PendingChangeCache) {
        self.push("begin update".to_string());
    }

    fn on_after_update(&self, _cache: &PendingChangeCache, modified: bool) {
        let state = if modified { "modified" } else { "unchanged" };
        self.push(format!("end update ({})", state));
    }

    fn on_added(&self, _cache: &PendingChangeCache, change: &Arc<PendingChange>) {
        self.push(format!("+ {}", util::format_change(change)));
    }

    fn on_removed(&self, _cache: &PendingChangeCache, change: &Arc<PendingChange>) {
        self.push(format!("- {}", change.server_item));
    }

    fn on_modified(&self, _cache: &PendingChangeCache, old: &Arc<PendingChange>, new: &Arc<PendingChange>) {
        self.push(format!("~ {} => {}", old.server_item, util::format_change(new)));
    }

    fn on_cleared(&self, _cache: &PendingChangeCache) {
        self.push("cleared".to_string());
    }
}

/// Outcome of a replay
#[derive(Debug)]
pub struct ReplayReport {
    /// Event markers (`» name`) and notifications, in the order recorded
    pub transcript: Vec<String>,
    pub events: usize,
    /// Pending changes left in the cache
    pub pending: usize,
}

pub fn load_script(path: &Path) -> Result<Vec<EngineEvent>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event script {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid event script {}", path.display()))
}

/// Load the snapshot, then publish each scripted event to the cache
///
/// With queued dispatch, notifications may trail the event markers.
pub fn replay(config: &Config, snapshot: &Path, script: &Path) -> Result<ReplayReport> {
    let events = load_script(script)?;
    let (engine, cache) = util::open_cache(config, snapshot)?;

    let transcript = Arc::new(Transcript::default());
    cache.add_listener(transcript.clone());

    cache
        .try_refresh()
        .with_context(|| format!("Failed to load pending changes from {}", snapshot.display()))?;

    for event in &events {
        transcript.push(format!("» {}", event.name()));
        engine.publish(event);
    }

    // Drains any queued events
    cache.dispose();

    Ok(ReplayReport {
        transcript: transcript.take(),
        events: events.len(),
        pending: cache.len(),
    })
}

pub fn run(config: &Config, snapshot: &Path, script: &Path) -> Result<()> {
    let report = replay(config, snapshot, script)?;

    println!("{}", "Replay".bold());
    println!("{}", util::RULE);

    for line in &report.transcript {
        match line.chars().next() {
            Some('»') => println!("{}", line.bold()),
            Some('+') => println!("  {}", line.green()),
            Some('-') => println!("  {}", line.red()),
            Some('~') => println!("  {}", line.yellow()),
            _ => println!("  {}", line.dimmed()),
        }
    }

    println!();
    println!(
        "Replayed {} events, {} pending changes remain",
        report.events,
        report.pending.to_string().green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendmap_cache::Dispatch;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
        "workspace": "dev-ws",
        "mappings": { "style": "unix", "folders": [{ "server_item": "$/", "local_item": "/ws" }] },
        "changes": [
            { "server_item": "$/B", "change_type": ["rename"], "item_type": "folder",
              "source_server_item": "$/A", "pending_change_id": 1 },
            { "server_item": "$/B/x.txt", "local_item": "/ws/B/x.txt",
              "change_type": ["edit"], "pending_change_id": 2 }
        ]
    }"#;

    const SCRIPT: &str = r#"[
        { "event": "operation_started", "workspace": "dev-ws" },
        { "event": "undone_pending_change", "workspace": "dev-ws",
          "change": { "server_item": "$/B", "change_type": ["rename"], "item_type": "folder",
                      "source_server_item": "$/A", "pending_change_id": 1 } },
        { "event": "new_pending_change", "workspace": "other-ws",
          "change": { "server_item": "$/ignored.txt", "change_type": ["add"], "pending_change_id": 9 } },
        { "event": "operation_completed", "workspace": "dev-ws" }
    ]"#;

    fn fixture() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let snapshot = temp.path().join("snapshot.json");
        let script = temp.path().join("events.json");
        std::fs::write(&snapshot, SNAPSHOT).unwrap();
        std::fs::write(&script, SCRIPT).unwrap();
        (temp, snapshot, script)
    }

    #[test]
    fn test_replay_transcript() {
        let (_temp, snapshot, script) = fixture();

        let report = replay(&Config::default(), &snapshot, &script).unwrap();

        assert_eq!(report.events, 4);
        assert_eq!(report.pending, 1);
        assert_eq!(
            report.transcript,
            vec![
                "begin update",
                "cleared",
                "+ rename             $/B/ (from $/A)",
                "+ edit               $/B/x.txt → /ws/B/x.txt",
                "end update (modified)",
                "» operation_started",
                "begin update",
                "» undone_pending_change",
                "- $/B",
                "» new_pending_change",
                "» operation_completed",
                "end update (modified)",
            ]
        );
    }

    #[test]
    fn test_replay_with_queued_dispatch() {
        let (_temp, snapshot, script) = fixture();
        let mut config = Config::default();
        config.cache.dispatch = Dispatch::Queued;

        let report = replay(&config, &snapshot, &script).unwrap();

        assert_eq!(report.pending, 1);
        assert!(report.transcript.iter().any(|line| line == "- $/B"));
        assert_eq!(report.transcript.last().map(String::as_str), Some("end update (modified)"));
    }

    #[test]
    fn test_invalid_script() {
        let (temp, snapshot, _script) = fixture();
        let bad = temp.path().join("bad.json");
        std::fs::write(&bad, r#"[{ "event": "teleported", "workspace": "dev-ws" }]"#).unwrap();

        assert!(replay(&Config::default(), &snapshot, &bad).is_err());
    }
}
