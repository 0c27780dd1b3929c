//! Scoped cancellation of a group of events.

use crate::event::EventId;

const CLEANUP_CHUNK_MIN: usize = 8;
const CLEANUP_CHUNK_MAX: usize = 1024;

/// Tracks event ids and cancels every one still pending when dropped.
///
/// Expired ids are pruned whenever the tracked count reaches a threshold.
/// The threshold starts at 8 and doubles while it is below 1024, then grows
/// in steps of 1024. When a prune frees most of the list, the threshold
/// shrinks back toward the live count.
#[derive(Debug)]
pub struct EventCollector {
    events: Vec<EventId>,
    next_cleanup: usize,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_cleanup: CLEANUP_CHUNK_MIN,
        }
    }

    /// Adds an event to the group.
    pub fn track(&mut self, id: EventId) {
        self.events.push(id);
        if self.events.len() >= self.next_cleanup {
            self.cleanup();
        }
    }

    /// Number of tracked ids, expired ones not yet pruned included.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Tracked ids that are still pending.
    pub fn running(&self) -> usize {
        self.events.iter().filter(|id| id.is_running()).count()
    }

    /// Count at which the next prune happens.
    pub fn cleanup_threshold(&self) -> usize {
        self.next_cleanup
    }

    /// Cancels every tracked event now and forgets them.
    pub fn cancel_all(&mut self) {
        for id in self.events.drain(..) {
            id.cancel();
        }
    }

    fn cleanup(&mut self) {
        let before = self.events.len();
        self.events.retain(|id| id.is_running());
        if self.events.len() >= self.next_cleanup {
            self.grow();
        } else {
            self.shrink();
        }
        tracing::trace!(
            pruned = before - self.events.len(),
            live = self.events.len(),
            next_cleanup = self.next_cleanup,
            "event collector cleanup"
        );
    }

    fn grow(&mut self) {
        self.next_cleanup += self.next_cleanup.min(CLEANUP_CHUNK_MAX);
    }

    fn shrink(&mut self) {
        while self.next_cleanup > CLEANUP_CHUNK_MIN && self.next_cleanup / 2 > self.events.len() {
            self.next_cleanup /= 2;
        }
        if self.events.len() >= self.next_cleanup {
            self.grow();
        }
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventCollector {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::Simulator;
    use crate::time::seconds;

    #[test]
    fn test_drop_cancels_running() {
        let mut sim = Simulator::new();
        let ids: Vec<EventId> = (1..=3)
            .map(|i| sim.schedule(seconds(i as f64), |_| {}).unwrap())
            .collect();

        {
            let mut collector = EventCollector::new();
            for id in &ids {
                collector.track(id.clone());
            }
            assert_eq!(collector.running(), 3);
        }

        assert!(ids.iter().all(EventId::is_expired));
        sim.run().unwrap();
        assert_eq!(sim.stats().events_executed, 0);
        assert_eq!(sim.stats().events_cancelled, 3);
    }

    #[test]
    fn test_threshold_grows_with_live_events() {
        let mut sim = Simulator::new();
        let mut collector = EventCollector::new();
        assert_eq!(collector.cleanup_threshold(), 8);

        for i in 0..8 {
            collector.track(sim.schedule(seconds(i as f64), |_| {}).unwrap());
        }
        // All eight are live, so the prune keeps them and the threshold doubles.
        assert_eq!(collector.len(), 8);
        assert_eq!(collector.cleanup_threshold(), 16);
    }

    #[test]
    fn test_expired_ids_are_pruned() {
        let mut sim = Simulator::new();
        let mut collector = EventCollector::new();

        for i in 0..7 {
            let id = sim.schedule(seconds(i as f64), |_| {}).unwrap();
            id.cancel();
            collector.track(id);
        }
        assert_eq!(collector.len(), 7);

        collector.track(sim.schedule(seconds(10.0), |_| {}).unwrap());
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.cleanup_threshold(), 8);
    }

    #[test]
    fn test_growth_is_capped() {
        let mut collector = EventCollector::new();
        collector.next_cleanup = CLEANUP_CHUNK_MAX;
        collector.grow();
        assert_eq!(collector.cleanup_threshold(), 2 * CLEANUP_CHUNK_MAX);
        collector.grow();
        assert_eq!(collector.cleanup_threshold(), 3 * CLEANUP_CHUNK_MAX);
    }
}
