//! Pending-event queues.
//!
//! A `Scheduler` keeps the simulator's future events ordered by
//! [`EventKey`]: earliest timestamp first, and insertion order (uid) among
//! events at the same timestamp. Every backend produces exactly the same
//! dequeue order; they differ only in cost.
//!
//! | backend | insert   | remove_next | remove(key) |
//! |---------|----------|-------------|-------------|
//! | list    | O(1)     | O(n)        | O(n)        |
//! | heap    | O(log n) | O(log n)    | O(n)        |
//! | map     | O(log n) | O(log n)    | O(log n)    |

pub mod heap;
pub mod list;
pub mod map;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::event::Event;

pub use heap::HeapScheduler;
pub use list::ListScheduler;
pub use map::MapScheduler;

/// Ordering key of a queued event.
///
/// Compares by timestamp, then by uid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    /// Expiry time in time steps.
    pub ts: u64,
    /// Unique, monotonically assigned event id.
    pub uid: u64,
}

/// A queued event together with its key.
#[derive(Clone, Debug)]
pub struct ScheduledEvent {
    pub key: EventKey,
    pub event: Arc<Event>,
}

impl ScheduledEvent {
    pub fn new(key: EventKey, event: Arc<Event>) -> Self {
        Self { key, event }
    }
}

/// Priority queue of pending events.
///
/// # Contract
///
/// - `remove_next` returns the entry with the smallest key.
/// - `remove(key)` must only be asked for keys that are currently queued;
///   backends return `None` otherwise.
/// - Keys are unique; inserting a duplicate key is a caller error.
pub trait Scheduler: Send {
    /// Adds an entry.
    fn insert(&mut self, entry: ScheduledEvent);

    fn is_empty(&self) -> bool;

    /// Number of queued entries, cancelled ones included.
    fn len(&self) -> usize;

    /// Entry with the smallest key, without removing it.
    fn peek_next(&self) -> Option<&ScheduledEvent>;

    /// Key of the entry with the smallest key.
    fn peek_next_key(&self) -> Option<EventKey> {
        self.peek_next().map(|entry| entry.key)
    }

    /// Removes and returns the entry with the smallest key.
    fn remove_next(&mut self) -> Option<ScheduledEvent>;

    /// Removes the entry with exactly this key.
    fn remove(&mut self, key: EventKey) -> Option<ScheduledEvent>;

    /// Short backend name, used in logs and stats.
    fn name(&self) -> &'static str;
}

/// Selects a scheduler backend, typically from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    List,
    #[default]
    Heap,
    Map,
}

impl SchedulerKind {
    /// Builds an empty scheduler of this kind.
    pub fn create(self) -> Box<dyn Scheduler> {
        match self {
            SchedulerKind::List => Box::new(ListScheduler::new()),
            SchedulerKind::Heap => Box::new(HeapScheduler::new()),
            SchedulerKind::Map => Box::new(MapScheduler::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SchedulerKind::List => "list",
            SchedulerKind::Heap => "heap",
            SchedulerKind::Map => "map",
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_ordering() {
        let a = EventKey { ts: 1, uid: 9 };
        let b = EventKey { ts: 2, uid: 1 };
        let c = EventKey { ts: 2, uid: 2 };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_kind_factory() {
        assert_eq!(SchedulerKind::default(), SchedulerKind::Heap);
        for kind in [SchedulerKind::List, SchedulerKind::Heap, SchedulerKind::Map] {
            let s = kind.create();
            assert_eq!(s.name(), kind.name());
            assert!(s.is_empty());
        }
    }

    #[test]
    fn test_kind_serde() {
        let kind: SchedulerKind = serde_yaml::from_str("map").unwrap();
        assert_eq!(kind, SchedulerKind::Map);
        assert_eq!(serde_json::to_string(&SchedulerKind::List).unwrap(), "\"list\"");
    }
}
