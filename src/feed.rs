use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Entries beyond this are evicted oldest-first.
pub const MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Warning => "warn",
            Severity::Error => "err",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl LogEntry {
    pub fn render(&self) -> String {
        format!(
            "[{}] {:<4} {}",
            self.timestamp.format("%H:%M:%S"),
            self.severity.label(),
            self.message
        )
    }
}

/// User-visible activity feed: a bounded FIFO of timestamped entries.
///
/// Every entry is also mirrored to the `log` facade at the matching level, so
/// the feed is the single place capture outcomes get reported.
#[derive(Clone)]
pub struct ActivityFeed {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl ActivityFeed {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_ENTRIES))),
        }
    }

    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        };

        match severity {
            Severity::Info | Severity::Success => log::info!("{}", entry.message),
            Severity::Warning => log::warn!("{}", entry.message),
            Severity::Error => log::error!("{}", entry.message),
        }

        let mut entries = self.entries.lock().unwrap();
        entries.push_back(entry);
        while entries.len() > MAX_ENTRIES {
            entries.pop_front();
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Severity::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Entries oldest-first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let feed = ActivityFeed::new();
        for i in 0..MAX_ENTRIES + 1 {
            feed.info(format!("entry {i}"));
        }

        let entries = feed.snapshot();
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries[0].message, "entry 1"); // entry 0 evicted
        assert_eq!(entries.last().unwrap().message, format!("entry {MAX_ENTRIES}"));
    }

    #[test]
    fn preserves_insertion_order() {
        let feed = ActivityFeed::new();
        feed.info("first");
        feed.error("second");
        feed.success("third");

        let entries = feed.snapshot();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(entries[1].severity, Severity::Error);
    }

    #[test]
    fn render_includes_severity_label() {
        let feed = ActivityFeed::new();
        feed.warning("upload rejected");

        let rendered = feed.snapshot()[0].render();
        assert!(rendered.contains("warn"));
        assert!(rendered.contains("upload rejected"));
    }
}
