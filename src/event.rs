//! Events and event handles.
//!
//! An [`Event`] is a one-shot callback plus a small state machine. The
//! simulator owns every pending event through the scheduler; callers only
//! ever hold an [`EventId`], a weak handle that can cancel the event or ask
//! whether it is still going to run.

use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::scheduler::EventKey;
use crate::simulator::Simulator;
use crate::time::Time;

/// The work an event performs when it expires.
pub type EventCallback = Box<dyn FnOnce(&mut Simulator) + Send>;

/// Lifecycle of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventState {
    /// Queued and will run when its time comes.
    Pending,
    /// Still queued, but will be skipped.
    Cancelled,
    /// The callback has been invoked.
    Invoked,
    /// Taken out of the queue without running.
    Removed,
}

struct EventInner {
    state: EventState,
    callback: Option<EventCallback>,
}

/// A scheduled unit of work.
pub struct Event {
    inner: Mutex<EventInner>,
}

impl Event {
    pub fn new(callback: EventCallback) -> Self {
        Self {
            inner: Mutex::new(EventInner {
                state: EventState::Pending,
                callback: Some(callback),
            }),
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> EventState {
        self.inner.lock().state
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == EventState::Cancelled
    }

    /// Marks the event so that it is skipped when dequeued.
    ///
    /// The callback and whatever it captured are released right away. Has
    /// no effect once the event has run or been removed.
    pub fn cancel(&self) {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.state != EventState::Pending {
                return;
            }
            inner.state = EventState::Cancelled;
            inner.callback.take()
        };
        // Dropped outside the lock; captured values may own other handles.
        drop(callback);
    }

    /// Runs the callback if the event is still pending.
    ///
    /// Returns false for cancelled or removed events.
    pub(crate) fn invoke(&self, sim: &mut Simulator) -> bool {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.state != EventState::Pending {
                return false;
            }
            inner.state = EventState::Invoked;
            inner.callback.take()
        };
        match callback {
            Some(callback) => {
                callback(sim);
                true
            }
            None => false,
        }
    }

    /// Marks the event as taken out of the queue and drops its callback.
    pub(crate) fn mark_removed(&self) {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.state == EventState::Invoked {
                return;
            }
            inner.state = EventState::Removed;
            inner.callback.take()
        };
        drop(callback);
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("state", &self.state()).finish()
    }
}

/// Handle to a scheduled event.
///
/// Cloning is cheap and every clone refers to the same event. The handle
/// does not keep the event alive. The default handle refers to no event
/// and reports itself as expired.
#[derive(Clone, Default)]
pub struct EventId {
    event: Weak<Event>,
    ts: u64,
    uid: u64,
}

impl EventId {
    pub(crate) fn new(event: &Arc<Event>, ts: u64, uid: u64) -> Self {
        Self {
            event: Arc::downgrade(event),
            ts,
            uid,
        }
    }

    /// Cancels the event if it is still pending. Idempotent.
    pub fn cancel(&self) {
        if let Some(event) = self.event.upgrade() {
            event.cancel();
        }
    }

    /// True when the event has run, was cancelled or removed, or the id
    /// never referred to an event.
    pub fn is_expired(&self) -> bool {
        match self.event.upgrade() {
            Some(event) => event.state() != EventState::Pending,
            None => true,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.is_expired()
    }

    /// Time the event is scheduled to run at.
    pub fn time(&self) -> Time {
        Time::from_time_step(self.ts as i64)
    }

    /// Scheduled time in time steps.
    pub fn ts(&self) -> u64 {
        self.ts
    }

    /// Unique id of the event. Zero only for the default handle.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub(crate) fn key(&self) -> EventKey {
        EventKey {
            ts: self.ts,
            uid: self.uid,
        }
    }

    pub(crate) fn event(&self) -> Option<Arc<Event>> {
        self.event.upgrade()
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts && self.uid == other.uid
    }
}

impl Eq for EventId {}

impl Hash for EventId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ts.hash(state);
        self.uid.hash(state);
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventId")
            .field("ts", &self.ts)
            .field("uid", &self.uid)
            .field("expired", &self.is_expired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_event(count: &Arc<AtomicUsize>) -> Arc<Event> {
        let count = count.clone();
        Arc::new(Event::new(Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })))
    }

    #[test]
    fn test_default_id_is_expired() {
        let id = EventId::default();
        assert!(id.is_expired());
        assert!(!id.is_running());
        assert_eq!(id.uid(), 0);
        // Cancelling an empty handle is a no-op.
        id.cancel();
    }

    #[test]
    fn test_cancel_through_id() {
        let count = Arc::new(AtomicUsize::new(0));
        let event = counting_event(&count);
        let id = EventId::new(&event, 10, 1);

        assert!(id.is_running());
        id.cancel();
        assert!(id.is_expired());
        assert_eq!(event.state(), EventState::Cancelled);

        id.cancel();
        assert_eq!(event.state(), EventState::Cancelled);
    }

    #[test]
    fn test_invoke_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let event = counting_event(&count);
        let mut sim = Simulator::new();

        assert!(event.invoke(&mut sim));
        assert!(!event.invoke(&mut sim));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(event.state(), EventState::Invoked);
    }

    #[test]
    fn test_cancelled_event_does_not_run() {
        let count = Arc::new(AtomicUsize::new(0));
        let event = counting_event(&count);
        let mut sim = Simulator::new();

        event.cancel();
        assert!(!event.invoke(&mut sim));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_removed_event_state() {
        let count = Arc::new(AtomicUsize::new(0));
        let event = counting_event(&count);
        event.mark_removed();
        assert_eq!(event.state(), EventState::Removed);
        // Cancel after removal keeps the removed state.
        event.cancel();
        assert_eq!(event.state(), EventState::Removed);
    }

    #[test]
    fn test_dropped_event_expires_id() {
        let count = Arc::new(AtomicUsize::new(0));
        let event = counting_event(&count);
        let id = EventId::new(&event, 5, 2);
        drop(event);
        assert!(id.is_expired());
    }

    #[test]
    fn test_id_equality() {
        let count = Arc::new(AtomicUsize::new(0));
        let a = counting_event(&count);
        let b = counting_event(&count);
        let id_a = EventId::new(&a, 5, 7);
        let id_a2 = id_a.clone();
        let id_b = EventId::new(&b, 5, 8);

        assert_eq!(id_a, id_a2);
        assert_ne!(id_a, id_b);
        assert_eq!(id_a.time(), Time::from_time_step(5));
    }
}
