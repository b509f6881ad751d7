//! Notification sink consumed by the dashboard header
//!
//! Append-only entry list plus an unread counter. The alert bridge is the
//! only writer; readers snapshot entries for rendering.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity class a notification renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEntry {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreInner {
    entries: Vec<NotificationEntry>,
    unread: usize,
}

/// Process-wide notification list with an unread counter
#[derive(Default)]
pub struct NotificationStore {
    inner: Mutex<StoreInner>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry and bump the unread counter
    pub fn add_notification(&self, entry: NotificationEntry) {
        let mut inner = self.inner.lock();
        inner.entries.push(entry);
        inner.unread += 1;
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().unread
    }

    pub fn mark_all_read(&self) {
        self.inner.lock().unread = 0;
    }

    /// Snapshot of all entries, oldest first
    pub fn entries(&self) -> Vec<NotificationEntry> {
        self.inner.lock().entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> NotificationEntry {
        NotificationEntry {
            severity: Severity::Warning,
            title: title.to_string(),
            message: "test".to_string(),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_increments_unread() {
        let store = NotificationStore::new();
        store.add_notification(entry("one"));
        store.add_notification(entry("two"));

        assert_eq!(store.unread_count(), 2);
        assert_eq!(store.entries().len(), 2);
        assert_eq!(store.entries()[0].title, "one");
    }

    #[test]
    fn test_mark_all_read_keeps_entries() {
        let store = NotificationStore::new();
        store.add_notification(entry("one"));
        store.mark_all_read();

        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.entries().len(), 1);
    }
}
