//! Ordered-map scheduler.
//!
//! Keys are unique, so a `BTreeMap` keyed by [`EventKey`] gives ordered
//! iteration plus logarithmic removal by key.

use std::collections::BTreeMap;

use super::{EventKey, ScheduledEvent, Scheduler};

/// Scheduler backed by a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MapScheduler {
    events: BTreeMap<EventKey, ScheduledEvent>,
}

impl MapScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for MapScheduler {
    fn insert(&mut self, entry: ScheduledEvent) {
        let key = entry.key;
        if self.events.insert(key, entry).is_some() {
            tracing::warn!(ts = key.ts, uid = key.uid, "duplicate event key replaced");
        }
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn peek_next(&self) -> Option<&ScheduledEvent> {
        self.events.first_key_value().map(|(_, e)| e)
    }

    fn remove_next(&mut self) -> Option<ScheduledEvent> {
        self.events.pop_first().map(|(_, e)| e)
    }

    fn remove(&mut self, key: EventKey) -> Option<ScheduledEvent> {
        self.events.remove(&key)
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing;

    #[test]
    fn test_empty() {
        testing::check_empty(&mut MapScheduler::new());
    }

    #[test]
    fn test_ordering() {
        testing::check_ordering(&mut MapScheduler::new());
    }

    #[test]
    fn test_remove() {
        testing::check_remove(&mut MapScheduler::new());
    }

    #[test]
    fn test_interleaved() {
        testing::check_interleaved(&mut MapScheduler::new());
    }
}
