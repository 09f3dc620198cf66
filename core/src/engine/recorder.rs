//! Bounded event history for diagnostics
//!
//! Keeps the most recent events seen by the sequencer; not part of any
//! decision logic.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::events::GameEvent;

pub const DEFAULT_EVENT_HISTORY: usize = 1000;

#[derive(Debug, Clone)]
pub struct EventLogEntry {
    pub time: DateTime<Utc>,
    pub category: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct EventRecorder {
    capacity: usize,
    history: VecDeque<EventLogEntry>,
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_HISTORY)
    }
}

impl EventRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            history: VecDeque::with_capacity(capacity.max(1).min(64)),
        }
    }

    pub fn record(&mut self, event: &GameEvent) {
        self.history.push_back(EventLogEntry {
            time: Utc::now(),
            category: event.category(),
            message: event.describe(),
        });
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Oldest-first view of the retained history.
    pub fn entries(&self) -> impl Iterator<Item = &EventLogEntry> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
