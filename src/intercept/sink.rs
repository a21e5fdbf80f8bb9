use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::LogEntry;
use crate::room::ClientId;

/// Destination for finished request records. Recording cannot fail from the
/// caller's point of view.
pub trait LogSink: Send + Sync + 'static {
    fn record(&self, entry: LogEntry);
}

/// Keeps every record in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<LogEntry> {
        self.read(|entries| entries.to_vec())
    }

    /// Records whose client id equals `client_id` or whose start time equals
    /// `start_time`. Either filter may be absent.
    pub fn query(
        &self,
        client_id: Option<&ClientId>,
        start_time: Option<DateTime<Utc>>,
    ) -> Vec<LogEntry> {
        self.read(|entries| {
            entries
                .iter()
                .filter(|entry| {
                    let by_client =
                        client_id.is_some_and(|id| entry.client_id.as_ref() == Some(id));
                    let by_time = start_time.is_some_and(|t| entry.start_time == t);
                    by_client || by_time
                })
                .cloned()
                .collect()
        })
    }

    // push cannot leave a half-written entry, so poisoning is ignored
    fn read<T>(&self, f: impl FnOnce(&Vec<LogEntry>) -> T) -> T {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, entry: LogEntry) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }
}
