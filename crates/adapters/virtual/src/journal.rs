//! Shared record of every command the virtual devices received.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comfortzone_app::ports::{IndicatorState, Notice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Fan(bool),
    Indicator(IndicatorState),
    Notice(Notice),
    Published { topic: String, payload: Vec<u8> },
    Disconnected,
}

#[derive(Debug, Default)]
struct Entries {
    entries: VecDeque<JournalEntry>,
    limit: Option<usize>,
}

/// Cheap to clone; all clones append to the same list.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Entries>>);

impl Journal {
    /// A journal that keeps everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A journal that keeps the latest `limit` entries only.
    #[must_use]
    pub fn bounded(limit: usize) -> Self {
        Self(Arc::new(Mutex::new(Entries {
            entries: VecDeque::new(),
            limit: Some(limit),
        })))
    }

    pub fn record(&self, entry: JournalEntry) {
        let mut inner = self.lock();
        if let Some(limit) = inner.limit {
            while inner.entries.len() >= limit {
                inner.entries.pop_front();
            }
            if limit == 0 {
                return;
            }
        }
        inner.entries.push_back(entry);
    }

    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Fan commands in the order they were issued.
    #[must_use]
    pub fn fan_commands(&self) -> Vec<bool> {
        self.lock()
            .entries
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Fan(on) => Some(*on),
                _ => None,
            })
            .collect()
    }

    /// Payloads published on `topic`, oldest first.
    #[must_use]
    pub fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.lock()
            .entries
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Published { topic: t, payload } if t == topic => {
                    Some(payload.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
