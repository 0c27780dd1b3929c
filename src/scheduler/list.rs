//! Unsorted vector scheduler.
//!
//! Insertion is a push; finding the next event scans the whole list. Good
//! for very small queues and as a reference for the other backends.

use super::{EventKey, ScheduledEvent, Scheduler};

/// Scheduler backed by an unsorted `Vec`.
#[derive(Debug, Default)]
pub struct ListScheduler {
    events: Vec<ScheduledEvent>,
}

impl ListScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn min_index(&self) -> Option<usize> {
        self.events
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.key)
            .map(|(i, _)| i)
    }
}

impl Scheduler for ListScheduler {
    fn insert(&mut self, entry: ScheduledEvent) {
        self.events.push(entry);
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn peek_next(&self) -> Option<&ScheduledEvent> {
        self.events.iter().min_by_key(|e| e.key)
    }

    fn remove_next(&mut self) -> Option<ScheduledEvent> {
        let index = self.min_index()?;
        Some(self.events.swap_remove(index))
    }

    fn remove(&mut self, key: EventKey) -> Option<ScheduledEvent> {
        let index = self.events.iter().position(|e| e.key == key)?;
        Some(self.events.swap_remove(index))
    }

    fn name(&self) -> &'static str {
        "list"
    }
}
