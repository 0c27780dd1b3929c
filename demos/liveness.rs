//! Liveness Monitor Example
//!
//! A worker emits a heartbeat every 250ms from a periodic timer and a
//! watchdog expects one at least every second. After a configurable
//! number of beats the worker hangs, the watchdog expires and raises an
//! alarm that stops the run. A destroy event prints the final report.
//!
//! The simulation showcases:
//! - A periodic `Timer` re-arming itself through a weak handle
//! - A `Watchdog` postponed by every heartbeat
//! - An `EventCollector` owning the probe events of the monitor
//! - `stop`, `next` and destroy events
//!
//! Run with: `cargo run --example liveness`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chronon::{
    milli_seconds, EventCollector, SchedulerKind, Simulator, StatsCollector, Time, Timer,
    Watchdog,
};
use parking_lot::Mutex;

// ============================================================================
// Model Configuration
// ============================================================================

const HEARTBEAT_MS: i64 = 250;
const WATCHDOG_TIMEOUT_MS: i64 = 1_000;
const BEATS_BEFORE_HANG: u32 = 12;
const PROBES: i64 = 20;

struct Monitor {
    watchdog: Mutex<Watchdog>,
    beats: AtomicU32,
    alarm_at: Mutex<Option<Time>>,
}

fn build(sim: &mut Simulator) -> (Arc<Monitor>, Arc<Mutex<Timer>>, EventCollector) {
    let monitor = Arc::new(Monitor {
        watchdog: Mutex::new(Watchdog::new()),
        beats: AtomicU32::new(0),
        alarm_at: Mutex::new(None),
    });
    {
        let m = Arc::downgrade(&monitor);
        monitor.watchdog.lock().set_function(move |sim| {
            if let Some(m) = m.upgrade() {
                *m.alarm_at.lock() = Some(sim.now());
            }
            tracing::warn!(at = %sim.now(), "heartbeat missed");
            sim.stop();
        });
    }

    let heartbeat = Arc::new(Mutex::new(Timer::new()));
    {
        let weak = Arc::downgrade(&heartbeat);
        let m = monitor.clone();
        let mut timer = heartbeat.lock();
        timer.set_delay(milli_seconds(HEARTBEAT_MS));
        timer.set_function(move |sim| {
            let n = m.beats.fetch_add(1, Ordering::SeqCst) + 1;
            if let Err(e) = m
                .watchdog
                .lock()
                .ping(sim, milli_seconds(WATCHDOG_TIMEOUT_MS))
            {
                tracing::error!(error = %e, "failed to ping watchdog");
            }
            if n >= BEATS_BEFORE_HANG {
                return;
            }
            if let Some(timer) = weak.upgrade() {
                if let Err(e) = timer.lock().schedule(sim) {
                    tracing::error!(error = %e, "failed to re-arm heartbeat");
                }
            }
        });
    }

    // Periodic probes the monitor would use to sample the worker; the
    // collector cancels whatever is left when the monitor goes away.
    let mut probes = EventCollector::new();
    for i in 1..=PROBES {
        let id = sim
            .schedule(milli_seconds(500 * i), |_| {})
            .expect("probe");
        probes.track(id);
    }

    (monitor, heartbeat, probes)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    chronon::init_logging("info");

    let mut sim = Simulator::with_scheduler_kind(SchedulerKind::Map);
    let (monitor, heartbeat, probes) = build(&mut sim);

    monitor
        .watchdog
        .lock()
        .ping(&mut sim, milli_seconds(WATCHDOG_TIMEOUT_MS))?;
    heartbeat.lock().schedule(&mut sim)?;

    let m = monitor.clone();
    sim.schedule_destroy(move |sim| {
        println!(
            "destroy: {} heartbeats seen, clock at {}",
            m.beats.load(Ordering::SeqCst),
            sim.now()
        );
    })?;

    let mut collector = StatsCollector::new();
    collector.set_name("liveness");
    collector.start();
    sim.run()?;
    collector.stop(&sim);

    println!("╔════════════════════════════════════════╗");
    println!("║          Liveness Monitor Report       ║");
    println!("╚════════════════════════════════════════╝");
    println!();
    println!("Heartbeats:        {}", monitor.beats.load(Ordering::SeqCst));
    match *monitor.alarm_at.lock() {
        Some(at) => println!("Alarm raised at:   {:.3} s", at.get_seconds()),
        None => println!("Alarm raised at:   never"),
    }
    println!("Probes pending:    {}", probes.running());
    if let Some(next) = sim.next() {
        println!("Next event at:     {:.3} s", next.get_seconds());
    }
    println!("Expected alarm at: {:.3} s", expected_alarm().get_seconds());
    println!();
    println!("{}", collector.stats().summary());

    drop(probes);
    sim.destroy();
    Ok(())
}

/// Last heartbeat plus the watchdog timeout.
fn expected_alarm() -> Time {
    milli_seconds(HEARTBEAT_MS * BEATS_BEFORE_HANG as i64) + milli_seconds(WATCHDOG_TIMEOUT_MS)
}
