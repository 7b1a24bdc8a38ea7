//! Run events - JSONL log of item failures and cell summaries.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pipeline event for post-mortem inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub item: Option<String>,
    pub step: Option<String>,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Appends run events to `events.jsonl` under the run's output directory.
pub struct EventEmitter {
    events_path: PathBuf,
}

impl EventEmitter {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            events_path: run_dir.join("events.jsonl"),
        }
    }

    /// Emit an event.
    pub fn emit(&self, event: RunEvent) -> Result<()> {
        if let Some(parent) = self.events_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)?;

        let line = serde_json::to_string(&event)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// Emit a simple event.
    pub fn emit_simple(&self, event_type: &str, message: &str) -> Result<()> {
        self.emit(RunEvent {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            item: None,
            step: None,
            message: message.to_string(),
            metadata: serde_json::Value::Null,
        })
    }

    /// Emit an item failure.
    pub fn emit_failure(&self, item: &str, step: &str, message: &str) -> Result<()> {
        self.emit(RunEvent {
            timestamp: Utc::now(),
            event_type: "item_failed".to_string(),
            item: Some(item.to_string()),
            step: Some(step.to_string()),
            message: message.to_string(),
            metadata: serde_json::Value::Null,
        })
    }

    /// Read recent events.
    pub fn read_recent(&self, limit: usize) -> Vec<RunEvent> {
        let file = match std::fs::File::open(&self.events_path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let mut events: Vec<RunEvent> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if events.len() > limit {
            events.drain(0..events.len() - limit);
        }

        events
    }
}
