//! "Fire unless pinged" liveness timer.

use std::fmt;
use std::sync::Arc;

use crate::error::{SimError, SimResult};
use crate::event::EventId;
use crate::simulator::Simulator;
use crate::time::Time;
use crate::timer::TimerFunction;

/// Runs its function once no [`ping`](Watchdog::ping) has arrived for the
/// last requested delay.
///
/// Each ping cancels the pending expiry and schedules a new one `delay`
/// from now, so a shorter delay moves the expiry earlier. Dropping the
/// watchdog cancels the pending expiry.
#[derive(Default)]
pub struct Watchdog {
    event: EventId,
    function: Option<TimerFunction>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_function<F>(&mut self, f: F)
    where
        F: Fn(&mut Simulator) + Send + Sync + 'static,
    {
        self.function = Some(Arc::new(f));
    }

    /// Postpones expiry to `delay` from now.
    pub fn ping(&mut self, sim: &mut Simulator, delay: Time) -> SimResult<()> {
        let function = self.function.clone().ok_or(SimError::TimerFunctionUnset)?;
        let event = sim.schedule_after(delay, move |sim| function(sim))?;
        self.event.cancel();
        self.event = event;
        tracing::trace!(expiry = self.event.ts(), "watchdog pinged");
        Ok(())
    }

    /// Disarms the watchdog.
    pub fn cancel(&mut self) {
        self.event.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.event.is_running()
    }

    /// When the watchdog will fire, if armed.
    pub fn expiry(&self) -> Option<Time> {
        self.is_running().then(|| self.event.time())
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.event.cancel();
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("event", &self.event)
            .field("has_function", &self.function.is_some())
            .finish()
    }
}
