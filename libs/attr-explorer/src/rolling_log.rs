//! Fixed-capacity, insertion-ordered log
//!
//! Backs both the write history and the passive report log. Oldest entries
//! are evicted first once capacity is exceeded.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity of the passive report log
pub const REPORT_LOG_CAPACITY: usize = 50;

/// Default capacity of the write history
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// A timestamped free-text line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl HistoryEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollingLog<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> RollingLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one entry, then evict from the front down to capacity
    pub fn append(&mut self, entry: T) {
        self.entries.push_back(entry);
        self.truncate();
    }

    /// Append all entries, truncating once at the end
    pub fn extend(&mut self, entries: impl IntoIterator<Item = T>) {
        self.entries.extend(entries);
        self.truncate();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    fn truncate(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

impl<T: fmt::Display> RollingLog<T> {
    /// One line per entry, oldest first
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<T> Default for RollingLog<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_keeps_last_entries_in_order() {
        for capacity in [1usize, 3, 20, 50] {
            let mut log = RollingLog::new(capacity);
            let total = capacity * 2 + 3;
            for i in 0..total {
                log.append(i);
                assert!(log.len() <= capacity);
            }
            let kept: Vec<usize> = log.iter().copied().collect();
            let expected: Vec<usize> = (total - capacity..total).collect();
            assert_eq!(kept, expected, "capacity {capacity}");
        }
    }

    #[test]
    fn test_extend_truncates_once() {
        let mut log = RollingLog::new(3);
        log.append("a");
        log.extend(["b", "c", "d", "e"]);
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec!["c", "d", "e"]);
        assert_eq!(log.last(), Some(&"e"));
    }

    #[test]
    fn test_clear() {
        let mut log = RollingLog::new(5);
        log.extend([1, 2, 3]);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 5);
    }

    #[test]
    fn test_render_history() {
        let mut log = RollingLog::new(DEFAULT_HISTORY_CAPACITY);
        log.append(HistoryEntry::new("Write 0x0524 = 0014 (uint16) ok"));
        log.append(HistoryEntry::new("Write 0x0000 failed"));
        let text = log.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Write 0x0524 = 0014 (uint16) ok"));
        assert!(lines[0].starts_with('['));
        assert!(lines[1].ends_with("Write 0x0000 failed"));
    }
}
