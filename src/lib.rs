//! # Chronon
//!
//! A discrete-event simulation kernel: a virtual clock, a time-ordered queue
//! of cancellable callbacks, and a run loop that advances the clock from one
//! event to the next.
//!
//! ## Design Principles
//!
//! - **Explicit context**: there is no global simulator. A [`Simulator`]
//!   owns the clock and the queue, and every callback receives
//!   `&mut Simulator`, which is how events schedule further events.
//! - **Deterministic order**: events run in timestamp order, and events
//!   sharing a timestamp run in the order they were scheduled.
//! - **Pluggable queues**: list, binary-heap and ordered-map schedulers
//!   produce identical event orders and differ only in cost.
//! - **Exact time**: [`Time`] counts steps of a process-wide unit
//!   ([`Precision`], nanoseconds by default) on a 128-bit fixed-point
//!   [`HighPrecision`] value, so mixed-unit arithmetic does not drift.
//!
//! ## Quick Start
//!
//! ```rust
//! use chronon::{milli_seconds, seconds, Simulator};
//!
//! let mut sim = Simulator::new();
//!
//! sim.schedule(seconds(1.0), |sim| {
//!     println!("ping at {}", sim.now());
//!     sim.schedule_after(milli_seconds(250), |sim| {
//!         println!("pong at {}", sim.now());
//!     })
//!     .unwrap();
//! })
//! .unwrap();
//!
//! sim.run().unwrap();
//! assert_eq!(sim.now(), seconds(1.25));
//!
//! let stats = sim.export_stats();
//! assert_eq!(stats["kernel"]["events_executed"], 2);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use chronon::{SimConfig, Simulator};
//!
//! let config = SimConfig::from_yaml_file("simulation.yaml")?;
//! chronon::init_logging(&config.simulation.log_level);
//! let mut sim = Simulator::from_config(&config)?;
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod high_precision;
pub mod scheduler;
pub mod simulator;
pub mod stats;
pub mod time;
pub mod timer;
pub mod trace;
pub mod watchdog;

// Re-export commonly used types
pub use collector::EventCollector;
pub use config::{ConfigError, SimConfig, SimConfigBuilder, SimulationParams};
pub use error::{SimError, SimResult};
pub use event::{Event, EventCallback, EventId, EventState};
pub use high_precision::HighPrecision;
pub use scheduler::{
    EventKey, HeapScheduler, ListScheduler, MapScheduler, ScheduledEvent, Scheduler, SchedulerKind,
};
pub use simulator::{Simulator, SimulatorState};
pub use stats::{KernelStats, SimulationStats, StatsCollector, Stopwatch};
pub use time::{
    femto_seconds, micro_seconds, milli_seconds, nano_seconds, pico_seconds, seconds, time_step,
    Precision, Time,
};
pub use timer::{DestroyPolicy, SchedulePolicy, Timer, TimerFunction, TimerState};
pub use trace::{TraceLog, TraceRecord};
pub use watchdog::Watchdog;

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` overrides `level` when set. Later calls are ignored.
///
/// # Example
///
/// ```rust,ignore
/// chronon::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
