//! Append-only JSONL provenance event log.

use crate::core::types::{ProvenanceEvent, TimestampedEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current UTC time as an ISO 8601 timestamp.
pub fn now_iso8601() -> String {
    format_iso8601(Utc::now())
}

/// `YYYY-MM-DDTHH:MM:SSZ`, second precision.
fn format_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Derive the event log path for a host.
pub fn event_log_path(state_dir: &Path, host: &str) -> PathBuf {
    state_dir.join(host).join("events.jsonl")
}

/// Append an event to the host's event log.
pub fn append_event(state_dir: &Path, host: &str, event: ProvenanceEvent) -> Result<(), String> {
    let path = event_log_path(state_dir, host);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("cannot create state dir: {}", e))?;
    }

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;

    writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))?;

    Ok(())
}

/// Read all events for a host, oldest first. A missing log is empty.
pub fn read_events(state_dir: &Path, host: &str) -> Result<Vec<TimestampedEvent>, String> {
    let path = event_log_path(state_dir, host);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| format!("{} line {}: {}", path.display(), i + 1, e))
        })
        .collect()
}

/// Event sink bound to one state directory and host.
#[derive(Debug, Clone)]
pub struct EventLog {
    pub state_dir: PathBuf,
    pub host: String,
}

impl EventLog {
    pub fn new(state_dir: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        Self {
            state_dir: state_dir.into(),
            host: host.into(),
        }
    }

    /// Append an event. Write failures are logged, never propagated.
    pub fn record(&self, event: ProvenanceEvent) {
        if let Err(e) = append_event(&self.state_dir, &self.host, event) {
            tracing::warn!(host = %self.host, "event log write failed: {}", e);
        }
    }
}
