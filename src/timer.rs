//! Re-armable delayed callbacks.
//!
//! A [`Timer`] remembers a function and a default delay, and holds the id
//! of the event it last scheduled. It can be re-armed, cancelled,
//! suspended and resumed. What happens to an outstanding event when the
//! timer is re-armed or dropped is set by [`SchedulePolicy`] and
//! [`DestroyPolicy`].
//!
//! ```
//! use chronon::{seconds, Simulator, Timer};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let mut sim = Simulator::new();
//! let fired = Arc::new(AtomicUsize::new(0));
//! let f = fired.clone();
//!
//! let mut timer = Timer::new();
//! timer.set_function(move |_| {
//!     f.fetch_add(1, Ordering::SeqCst);
//! });
//! timer.set_delay(seconds(2.0));
//! timer.schedule(&mut sim).unwrap();
//!
//! sim.run().unwrap();
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! assert!(timer.is_expired());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{SimError, SimResult};
use crate::event::EventId;
use crate::simulator::Simulator;
use crate::time::Time;

/// Function run when a timer or watchdog expires. Shared, so that every
/// arming schedules a fresh event around the same function.
pub type TimerFunction = Arc<dyn Fn(&mut Simulator) + Send + Sync>;

/// What `schedule` does with an event that is still pending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Refuse with [`SimError::TimerRunning`].
    #[default]
    CheckOnSchedule,
    /// Cancel the old event, then schedule.
    CancelOnSchedule,
    /// Take the old event out of the queue, then schedule.
    RemoveOnSchedule,
}

/// What happens to a pending event when the timer goes away.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DestroyPolicy {
    #[default]
    CancelOnDestroy,
    /// Take the event out of the queue. Needs [`Timer::destroy`]; a plain
    /// drop has no simulator at hand and cancels instead.
    RemoveOnDestroy,
    /// The event must already have expired.
    CheckOnDestroy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Expired,
    Suspended,
}

pub struct Timer {
    delay: Time,
    delay_left: Time,
    event: EventId,
    suspended: bool,
    function: Option<TimerFunction>,
    schedule_policy: SchedulePolicy,
    destroy_policy: DestroyPolicy,
}

impl Timer {
    /// A timer with the default policies: check on schedule, cancel on
    /// destroy.
    pub fn new() -> Self {
        Self::with_policies(SchedulePolicy::default(), DestroyPolicy::default())
    }

    pub fn with_policies(schedule_policy: SchedulePolicy, destroy_policy: DestroyPolicy) -> Self {
        Self {
            delay: Time::ZERO,
            delay_left: Time::ZERO,
            event: EventId::default(),
            suspended: false,
            function: None,
            schedule_policy,
            destroy_policy,
        }
    }

    /// Sets the function run on expiry. Does not affect an event that is
    /// already scheduled.
    pub fn set_function<F>(&mut self, f: F)
    where
        F: Fn(&mut Simulator) + Send + Sync + 'static,
    {
        self.function = Some(Arc::new(f));
    }

    /// Sets the delay used by [`schedule`](Self::schedule).
    pub fn set_delay(&mut self, delay: Time) {
        self.delay = delay;
    }

    pub fn get_delay(&self) -> Time {
        self.delay
    }

    pub fn schedule_policy(&self) -> SchedulePolicy {
        self.schedule_policy
    }

    pub fn destroy_policy(&self) -> DestroyPolicy {
        self.destroy_policy
    }

    /// Id of the most recently scheduled event.
    pub fn event_id(&self) -> &EventId {
        &self.event
    }

    /// Arms the timer with its configured delay.
    pub fn schedule(&mut self, sim: &mut Simulator) -> SimResult<()> {
        let delay = self.delay;
        self.schedule_with(sim, delay)
    }

    /// Arms the timer to expire `delay` from now.
    ///
    /// Re-arming clears a suspension.
    pub fn schedule_with(&mut self, sim: &mut Simulator, delay: Time) -> SimResult<()> {
        let function = self.function.clone().ok_or(SimError::TimerFunctionUnset)?;
        if self.schedule_policy == SchedulePolicy::CheckOnSchedule && self.event.is_running() {
            return Err(SimError::TimerRunning);
        }
        // A failed schedule leaves the old event armed.
        let event = sim.schedule_after(delay, move |sim| function(sim))?;
        match self.schedule_policy {
            SchedulePolicy::CheckOnSchedule => {}
            SchedulePolicy::CancelOnSchedule => self.event.cancel(),
            SchedulePolicy::RemoveOnSchedule => sim.remove(&self.event),
        }
        self.event = event;
        self.suspended = false;
        Ok(())
    }

    /// Cancels the pending event, if any.
    pub fn cancel(&mut self) {
        self.event.cancel();
    }

    /// Takes the pending event out of the queue, if any.
    pub fn remove(&mut self, sim: &mut Simulator) {
        sim.remove(&self.event);
    }

    /// True when no event is pending, which includes a suspended timer.
    pub fn is_expired(&self) -> bool {
        self.event.is_expired()
    }

    pub fn is_running(&self) -> bool {
        !self.suspended && self.event.is_running()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn get_state(&self) -> TimerState {
        if self.suspended {
            TimerState::Suspended
        } else if self.event.is_running() {
            TimerState::Running
        } else {
            TimerState::Expired
        }
    }

    /// Time until expiry; the frozen remainder while suspended, zero once
    /// expired.
    pub fn get_delay_left(&self, sim: &Simulator) -> Time {
        match self.get_state() {
            TimerState::Running => sim.get_delay_left(&self.event),
            TimerState::Suspended => self.delay_left,
            TimerState::Expired => Time::ZERO,
        }
    }

    /// Pauses a running timer, remembering the time left.
    pub fn suspend(&mut self, sim: &mut Simulator) -> SimResult<()> {
        if !self.is_running() {
            return Err(SimError::TimerNotRunning);
        }
        self.delay_left = sim.get_delay_left(&self.event);
        sim.remove(&self.event);
        self.suspended = true;
        Ok(())
    }

    /// Re-arms a suspended timer with the remembered time left.
    pub fn resume(&mut self, sim: &mut Simulator) -> SimResult<()> {
        if !self.suspended {
            return Err(SimError::TimerNotSuspended);
        }
        let function = self.function.clone().ok_or(SimError::TimerFunctionUnset)?;
        self.event = sim.schedule_after(self.delay_left, move |sim| function(sim))?;
        self.suspended = false;
        Ok(())
    }

    /// Applies the destroy policy with full access to the simulator.
    ///
    /// Under [`DestroyPolicy::CheckOnDestroy`] a still-pending event is
    /// cancelled and reported as [`SimError::TimerRunning`].
    pub fn destroy(mut self, sim: &mut Simulator) -> SimResult<()> {
        let result = match self.destroy_policy {
            DestroyPolicy::CancelOnDestroy => {
                self.event.cancel();
                Ok(())
            }
            DestroyPolicy::RemoveOnDestroy => {
                sim.remove(&self.event);
                Ok(())
            }
            DestroyPolicy::CheckOnDestroy => {
                if self.event.is_running() {
                    self.event.cancel();
                    Err(SimError::TimerRunning)
                } else {
                    Ok(())
                }
            }
        };
        self.event = EventId::default();
        result
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        match self.destroy_policy {
            DestroyPolicy::CancelOnDestroy | DestroyPolicy::RemoveOnDestroy => self.event.cancel(),
            DestroyPolicy::CheckOnDestroy => {
                if self.event.is_running() && !std::thread::panicking() {
                    panic!("timer dropped while its event is still pending");
                }
            }
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("state", &self.get_state())
            .field("delay", &self.delay)
            .field("event", &self.event)
            .field("schedule_policy", &self.schedule_policy)
            .field("destroy_policy", &self.destroy_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::seconds;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_timer(count: &Arc<AtomicUsize>) -> Timer {
        let mut timer = Timer::new();
        let c = count.clone();
        timer.set_function(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        timer
    }

    #[test]
    fn test_unset_function() {
        let mut sim = Simulator::new();
        let mut timer = Timer::new();
        assert!(matches!(
            timer.schedule(&mut sim),
            Err(SimError::TimerFunctionUnset)
        ));
    }

    #[test]
    fn test_fresh_timer_is_expired() {
        let timer = Timer::new();
        assert_eq!(timer.get_state(), TimerState::Expired);
        assert!(timer.is_expired());
    }

    #[test]
    fn test_check_on_schedule_rejects_rearm() {
        let mut sim = Simulator::new();
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = counting_timer(&count);

        timer.schedule_with(&mut sim, seconds(1.0)).unwrap();
        assert!(matches!(
            timer.schedule_with(&mut sim, seconds(2.0)),
            Err(SimError::TimerRunning)
        ));
        sim.run().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(sim.now(), seconds(1.0));
    }

    #[test]
    fn test_cancel() {
        let mut sim = Simulator::new();
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = counting_timer(&count);

        timer.schedule_with(&mut sim, seconds(1.0)).unwrap();
        timer.cancel();
        assert!(timer.is_expired());
        sim.run().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_suspend_errors() {
        let mut sim = Simulator::new();
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = counting_timer(&count);

        assert!(matches!(timer.suspend(&mut sim), Err(SimError::TimerNotRunning)));
        assert!(matches!(timer.resume(&mut sim), Err(SimError::TimerNotSuspended)));
    }

    #[test]
    #[should_panic(expected = "still pending")]
    fn test_check_on_destroy_panics() {
        let mut sim = Simulator::new();
        let mut timer =
            Timer::with_policies(SchedulePolicy::CheckOnSchedule, DestroyPolicy::CheckOnDestroy);
        timer.set_function(|_| {});
        timer.schedule_with(&mut sim, seconds(1.0)).unwrap();
        drop(timer);
    }

    #[test]
    fn test_check_on_destroy_explicit() {
        let mut sim = Simulator::new();
        let mut timer =
            Timer::with_policies(SchedulePolicy::CheckOnSchedule, DestroyPolicy::CheckOnDestroy);
        timer.set_function(|_| {});
        timer.schedule_with(&mut sim, seconds(1.0)).unwrap();
        let id = timer.event_id().clone();

        assert!(matches!(timer.destroy(&mut sim), Err(SimError::TimerRunning)));
        assert!(id.is_expired());
    }
}
