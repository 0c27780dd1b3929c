//! Error types for the simulation kernel.
//!
//! Contract violations (scheduling into the past, scheduling after
//! `destroy`, re-arming a running timer) are reported as `SimError`
//! values instead of aborting the process. Cancelling or removing an
//! already-expired event is never an error.

use thiserror::Error;

use crate::config::ConfigError;
use crate::time::Time;

/// Errors returned by the simulator, timers and configuration helpers.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("cannot schedule event at {requested} when current time is {now}")]
    ScheduleInPast { requested: Time, now: Time },

    #[error("negative delay: {0}")]
    NegativeDelay(Time),

    #[error("simulator has been destroyed")]
    Destroyed,

    #[error("simulator is already running")]
    AlreadyRunning,

    #[error("time arithmetic overflow")]
    TimeOverflow,

    #[error("timer is still running")]
    TimerRunning,

    #[error("timer is not running")]
    TimerNotRunning,

    #[error("timer is not suspended")]
    TimerNotSuspended,

    #[error("timer has no function set")]
    TimerFunctionUnset,

    #[error("time precision cannot change once events have been scheduled")]
    PrecisionLocked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for kernel operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{nano_seconds, seconds};

    #[test]
    fn test_display_schedule_in_past() {
        let e = SimError::ScheduleInPast {
            requested: nano_seconds(3),
            now: seconds(1.0),
        };
        let msg = e.to_string();
        assert!(msg.contains("3ns"));
        assert!(msg.contains("1000000000ns"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: SimError = io.into();
        assert!(matches!(e, SimError::Io(_)));
    }

    #[test]
    fn test_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::Destroyed);
        assert_eq!(e.to_string(), "simulator has been destroyed");
    }
}
