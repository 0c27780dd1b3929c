//! The simulation context and its run loop.
//!
//! A [`Simulator`] owns the virtual clock, the pending-event queue and the
//! stop condition. There is no global instance: models hold or borrow the
//! simulator and every callback receives `&mut Simulator` when it runs,
//! which is how events schedule further events.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --run()--> Running --(stop / empty / stop time)--> Stopped
//!   ^                                                        |
//!   +---------------------- run() again <--------------------+
//! any state --destroy()--> Destroyed (terminal)
//! ```
//!
//! The clock only moves when the run loop dequeues an event; between two
//! dequeues `now()` is constant.

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventCallback, EventId, EventState};
use crate::scheduler::{EventKey, HeapScheduler, ScheduledEvent, Scheduler, SchedulerKind};
use crate::stats::KernelStats;
use crate::time::{Precision, Time};
use crate::trace::{TraceLog, TraceRecord};

/// Run-loop state of a [`Simulator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulatorState {
    /// Never run.
    Idle,
    /// Inside `run`.
    Running,
    /// `run` returned; may be run again.
    Stopped,
    /// `destroy` was called; nothing can be scheduled any more.
    Destroyed,
}

impl SimulatorState {
    pub fn as_str(self) -> &'static str {
        match self {
            SimulatorState::Idle => "idle",
            SimulatorState::Running => "running",
            SimulatorState::Stopped => "stopped",
            SimulatorState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for SimulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete-event simulation context.
///
/// # Example
///
/// ```
/// use chronon::{seconds, Simulator};
///
/// let mut sim = Simulator::new();
/// sim.schedule(seconds(1.0), |sim| {
///     assert_eq!(sim.now(), seconds(1.0));
///     sim.schedule_now(|sim| sim.stop()).unwrap();
/// })
/// .unwrap();
/// sim.run().unwrap();
/// assert_eq!(sim.now(), seconds(1.0));
/// ```
pub struct Simulator {
    scheduler: Box<dyn Scheduler>,
    destroy_events: VecDeque<ScheduledEvent>,
    current_ts: u64,
    /// Uid of the event being (or last) executed; 0 before the first.
    current_uid: u64,
    next_uid: u64,
    stop: bool,
    stop_at: Option<u64>,
    state: SimulatorState,
    trace: Option<TraceLog>,
    stats: KernelStats,
}

impl Simulator {
    /// Creates a simulator with the default heap scheduler.
    pub fn new() -> Self {
        Self::with_scheduler(Box::new(HeapScheduler::new()))
    }

    pub fn with_scheduler(scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            destroy_events: VecDeque::new(),
            current_ts: 0,
            current_uid: 0,
            next_uid: 1,
            stop: false,
            stop_at: None,
            state: SimulatorState::Idle,
            trace: None,
            stats: KernelStats::default(),
        }
    }

    pub fn with_scheduler_kind(kind: SchedulerKind) -> Self {
        Self::with_scheduler(kind.create())
    }

    /// Builds a simulator from a validated configuration.
    ///
    /// Applies the time precision, scheduler backend, stop time and trace
    /// file.
    pub fn from_config(config: &SimConfig) -> SimResult<Self> {
        config.validate()?;
        let params = &config.simulation;

        Precision::set(params.precision)?;
        let mut sim = Self::with_scheduler_kind(params.scheduler);
        if let Some(stop) = params.stop_time {
            sim.stop_at(Time::seconds(stop));
        }
        if let Some(ref path) = params.trace_file {
            sim.enable_trace_to(path)?;
        }

        tracing::debug!(
            name = %params.name,
            scheduler = params.scheduler.name(),
            precision = params.precision.suffix(),
            "simulator configured"
        );
        Ok(sim)
    }

    /// Current virtual time.
    pub fn now(&self) -> Time {
        Time::from_time_step(self.current_ts as i64)
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn stats(&self) -> &KernelStats {
        &self.stats
    }

    pub fn scheduler_name(&self) -> &'static str {
        self.scheduler.name()
    }

    /// Number of queued events, cancelled ones included.
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }

    /// The largest representable time, used to mean "never".
    pub fn get_maximum_simulation_time(&self) -> Time {
        Time::max()
    }

    fn ensure_alive(&self) -> SimResult<()> {
        if self.state == SimulatorState::Destroyed {
            return Err(SimError::Destroyed);
        }
        Ok(())
    }

    fn alloc_uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// Schedules `f` to run at the absolute time `time`.
    ///
    /// Fails with [`SimError::ScheduleInPast`] if `time` is earlier than
    /// [`now`](Self::now) and with [`SimError::Destroyed`] after
    /// [`destroy`](Self::destroy).
    pub fn schedule<F>(&mut self, time: Time, f: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.schedule_event(time, Box::new(f))
    }

    /// Like [`schedule`](Self::schedule) with an already boxed callback.
    pub fn schedule_event(&mut self, time: Time, callback: EventCallback) -> SimResult<EventId> {
        self.ensure_alive()?;
        let steps = time.get_time_step();
        if steps < self.current_ts as i64 {
            return Err(SimError::ScheduleInPast {
                requested: time,
                now: self.now(),
            });
        }
        let ts = steps as u64;

        Precision::lock();
        let uid = self.alloc_uid();
        let event = Arc::new(Event::new(callback));
        let id = EventId::new(&event, ts, uid);
        self.scheduler.insert(ScheduledEvent::new(EventKey { ts, uid }, event));

        self.stats.events_scheduled += 1;
        self.stats.observe_queue(self.scheduler.len());
        self.record(TraceRecord::Insert {
            cur_uid: self.current_uid,
            cur_ts: self.current_ts,
            uid,
            ts,
        });
        tracing::trace!(uid, ts, "event scheduled");
        Ok(id)
    }

    /// Schedules `f` to run `delay` after the current time.
    pub fn schedule_after<F>(&mut self, delay: Time, f: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        let time = self.delay_to_time(delay)?;
        self.schedule(time, f)
    }

    /// Schedules `f` at the current time, after every event already queued
    /// for this timestamp.
    pub fn schedule_now<F>(&mut self, f: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        let now = self.now();
        self.schedule(now, f)
    }

    /// Registers `f` to run once during [`destroy`](Self::destroy).
    ///
    /// Destroy events run in registration order after all regular events
    /// have been discarded.
    pub fn schedule_destroy<F>(&mut self, f: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.ensure_alive()?;
        Precision::lock();
        let uid = self.alloc_uid();
        let ts = self.current_ts;
        let event = Arc::new(Event::new(Box::new(f)));
        let id = EventId::new(&event, ts, uid);
        self.destroy_events
            .push_back(ScheduledEvent::new(EventKey { ts, uid }, event));
        self.stats.events_scheduled += 1;
        tracing::trace!(uid, "destroy event registered");
        Ok(id)
    }

    pub(crate) fn delay_to_time(&self, delay: Time) -> SimResult<Time> {
        if delay.is_strictly_negative() {
            return Err(SimError::NegativeDelay(delay));
        }
        self.now().checked_add(delay).ok_or(SimError::TimeOverflow)
    }

    /// Cancels a pending event. The event stays queued and is skipped when
    /// its time comes. No-op for expired ids.
    pub fn cancel(&mut self, id: &EventId) {
        id.cancel();
    }

    /// Takes a pending (or cancelled) event out of the queue. No-op for
    /// events that already ran or were removed, and for ids issued by
    /// another simulator.
    pub fn remove(&mut self, id: &EventId) {
        let Some(event) = id.event() else {
            return;
        };
        if matches!(event.state(), EventState::Invoked | EventState::Removed) {
            return;
        }
        let key = id.key();
        let entry = match self.scheduler.remove(key) {
            Some(entry) if Arc::ptr_eq(&entry.event, &event) => Some(entry),
            // Same key, different event: the id belongs to another simulator.
            Some(other) => {
                self.scheduler.insert(other);
                None
            }
            None => self.take_destroy_event(key, &event),
        };
        if let Some(entry) = entry {
            entry.event.mark_removed();
            self.stats.events_removed += 1;
            self.record(TraceRecord::Remove {
                cur_uid: self.current_uid,
                cur_ts: self.current_ts,
                uid: key.uid,
                ts: key.ts,
            });
            tracing::trace!(uid = key.uid, ts = key.ts, "event removed");
        }
    }

    fn take_destroy_event(&mut self, key: EventKey, event: &Arc<Event>) -> Option<ScheduledEvent> {
        let index = self
            .destroy_events
            .iter()
            .position(|e| e.key == key && Arc::ptr_eq(&e.event, event))?;
        self.destroy_events.remove(index)
    }

    /// True once the event has run, was cancelled or removed.
    pub fn is_expired(&self, id: &EventId) -> bool {
        id.is_expired()
    }

    /// Time left until the event runs; zero once it has expired.
    pub fn get_delay_left(&self, id: &EventId) -> Time {
        if id.is_expired() {
            return Time::ZERO;
        }
        Time::from_time_step(id.ts().saturating_sub(self.current_ts) as i64)
    }

    /// Timestamp of the earliest queued event.
    pub fn next(&self) -> Option<Time> {
        self.scheduler
            .peek_next_key()
            .map(|key| Time::from_time_step(key.ts as i64))
    }

    /// True when no event is queued.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }

    /// Runs events until the queue is empty, [`stop`](Self::stop) is
    /// called, or the next event lies beyond the stop time.
    pub fn run(&mut self) -> SimResult<()> {
        match self.state {
            SimulatorState::Destroyed => return Err(SimError::Destroyed),
            SimulatorState::Running => return Err(SimError::AlreadyRunning),
            SimulatorState::Idle | SimulatorState::Stopped => {}
        }
        self.state = SimulatorState::Running;
        tracing::debug!(
            now = self.current_ts,
            pending = self.scheduler.len(),
            scheduler = self.scheduler.name(),
            "run started"
        );

        while !self.stop {
            let Some(next) = self.scheduler.peek_next_key() else {
                break;
            };
            if matches!(self.stop_at, Some(limit) if next.ts > limit) {
                break;
            }
            let Some(entry) = self.scheduler.remove_next() else {
                break;
            };
            self.process_one(entry);
        }

        self.stop = false;
        if self.state == SimulatorState::Running {
            self.state = SimulatorState::Stopped;
        }
        self.stats.runs += 1;
        tracing::debug!(
            now = self.current_ts,
            pending = self.scheduler.len(),
            executed = self.stats.events_executed,
            "run finished"
        );
        Ok(())
    }

    fn process_one(&mut self, entry: ScheduledEvent) {
        debug_assert!(entry.key.ts >= self.current_ts, "event queue went back in time");
        self.current_ts = entry.key.ts;
        self.current_uid = entry.key.uid;

        if entry.event.is_cancelled() {
            self.stats.events_cancelled += 1;
            return;
        }

        self.record(TraceRecord::Execute {
            uid: entry.key.uid,
            ts: entry.key.ts,
        });
        tracing::trace!(uid = entry.key.uid, ts = entry.key.ts, "event executing");
        if entry.event.invoke(self) {
            self.stats.events_executed += 1;
        }
    }

    /// Stops the run loop after the current event.
    pub fn stop(&mut self) {
        self.stop = true;
    }

    /// Stops the run loop before the first event later than `time`.
    ///
    /// Events at exactly `time` still run. The limit stays in force for
    /// later calls to `run`.
    pub fn stop_at(&mut self, time: Time) {
        let ts = time.get_time_step().max(0) as u64;
        self.stop_at = Some(ts);
        tracing::debug!(stop_at = ts, "stop time set");
    }

    /// Removes a stop time set by [`stop_at`](Self::stop_at).
    pub fn clear_stop_at(&mut self) {
        self.stop_at = None;
    }

    /// Replaces the scheduler backend, moving every queued event across.
    pub fn set_scheduler(&mut self, mut scheduler: Box<dyn Scheduler>) {
        let mut moved = 0usize;
        while let Some(entry) = self.scheduler.remove_next() {
            scheduler.insert(entry);
            moved += 1;
        }
        tracing::debug!(
            from = self.scheduler.name(),
            to = scheduler.name(),
            moved,
            "scheduler replaced"
        );
        self.scheduler = scheduler;
    }

    /// Tears the simulator down.
    ///
    /// Discards every queued event without running it, then runs the
    /// destroy events in registration order. Afterwards nothing can be
    /// scheduled and `run` fails. Calling it again is a no-op.
    pub fn destroy(&mut self) {
        if self.state == SimulatorState::Destroyed {
            return;
        }
        self.state = SimulatorState::Destroyed;

        while let Some(entry) = self.scheduler.remove_next() {
            entry.event.mark_removed();
            self.stats.events_discarded += 1;
        }

        while let Some(entry) = self.destroy_events.pop_front() {
            self.current_uid = entry.key.uid;
            if entry.event.invoke(self) {
                self.stats.destroy_events_executed += 1;
            }
        }

        if let Some(mut trace) = self.trace.take() {
            if let Err(e) = trace.flush() {
                tracing::warn!(error = %e, "failed to flush trace log");
            }
        }
        tracing::debug!(
            discarded = self.stats.events_discarded,
            destroy_events = self.stats.destroy_events_executed,
            "simulator destroyed"
        );
    }

    /// Starts logging kernel activity to `writer`.
    pub fn enable_trace(&mut self, writer: Box<dyn Write + Send>) {
        self.trace = Some(TraceLog::new(writer));
    }

    /// Starts logging kernel activity to the file at `path`.
    pub fn enable_trace_to<P: AsRef<Path>>(&mut self, path: P) -> SimResult<()> {
        self.trace = Some(TraceLog::to_file(path)?);
        Ok(())
    }

    /// Flushes the trace log, if any.
    pub fn flush_trace(&mut self) -> SimResult<()> {
        if let Some(trace) = self.trace.as_mut() {
            trace.flush()?;
        }
        Ok(())
    }

    fn record(&mut self, record: TraceRecord) {
        let failed = match self.trace.as_mut() {
            Some(trace) => trace.write(&record).err(),
            None => None,
        };
        if let Some(e) = failed {
            tracing::warn!(error = %e, "trace log write failed, disabling trace");
            self.trace = None;
        }
    }

    /// Exports the clock and kernel counters as JSON.
    pub fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "now_seconds": self.now().get_seconds(),
            "now_steps": self.now().get_time_step(),
            "scheduler": self.scheduler.name(),
            "state": self.state.as_str(),
            "pending": self.scheduler.len(),
            "kernel": self.stats,
        })
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("now", &self.current_ts)
            .field("state", &self.state)
            .field("scheduler", &self.scheduler.name())
            .field("pending", &self.scheduler.len())
            .field("destroy_events", &self.destroy_events.len())
            .finish()
    }
}
