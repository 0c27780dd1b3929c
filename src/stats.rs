//! Statistics collection and export.
//!
//! The simulator keeps a [`KernelStats`] of counters while it runs.
//! [`SimulationStats`] wraps those counters with run metadata and
//! wall-clock timing and exports them as JSON, CSV or a text summary.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::simulator::Simulator;

/// Counters maintained by the simulator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelStats {
    /// Events accepted by `schedule*`, destroy events included
    pub events_scheduled: u64,

    /// Callbacks invoked by the run loop
    pub events_executed: u64,

    /// Cancelled events skipped when popped
    pub events_cancelled: u64,

    /// Events taken out of the queue by `remove`
    pub events_removed: u64,

    /// Pending events dropped by `destroy`
    pub events_discarded: u64,

    /// Destroy-time callbacks invoked
    pub destroy_events_executed: u64,

    /// Largest queue length observed
    pub peak_queue_size: usize,

    /// Completed calls to `run`
    pub runs: u64,
}

impl KernelStats {
    /// Records a new queue length, keeping the peak.
    pub(crate) fn observe_queue(&mut self, len: usize) {
        if len > self.peak_queue_size {
            self.peak_queue_size = len;
        }
    }
}

/// Aggregate statistics for a simulation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Run metadata
    pub metadata: SimulationMetadata,

    /// Kernel counters
    pub kernel: KernelStats,

    /// Final virtual time in seconds
    pub final_time: f64,

    /// Final virtual time in time steps
    pub final_time_steps: i64,

    /// Wall-clock timing
    pub timing: TimingStats,
}

/// Metadata about the simulation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationMetadata {
    /// Simulation name
    pub name: String,

    /// Start time (wall clock, unix seconds)
    pub start_time: Option<String>,

    /// End time (wall clock, unix seconds)
    pub end_time: Option<String>,

    /// Crate version
    pub version: String,

    /// Scheduler backend in use
    pub scheduler: String,

    /// Configuration file used (if any)
    pub config_file: Option<String>,
}

/// Timing/performance statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimingStats {
    /// Total wall-clock time in milliseconds
    pub total_wall_time_ms: f64,

    /// Virtual seconds simulated per wall-clock second
    pub sim_time_per_second: f64,

    /// Events executed per wall-clock second
    pub events_per_second: f64,
}

impl SimulationStats {
    pub fn new() -> Self {
        Self {
            metadata: SimulationMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..SimulationMetadata::default()
            },
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    pub fn record_start(&mut self) {
        self.metadata.start_time = Some(unix_now());
    }

    pub fn record_end(&mut self) {
        self.metadata.end_time = Some(unix_now());
    }

    /// Copies the counters and clock of a simulator.
    pub fn capture(&mut self, sim: &Simulator) {
        self.kernel = sim.stats().clone();
        self.final_time = sim.now().get_seconds();
        self.final_time_steps = sim.now().get_time_step();
        self.metadata.scheduler = sim.scheduler_name().to_string();
    }

    /// Updates timing statistics based on wall clock time.
    pub fn compute_timing(&mut self, wall_time_ms: f64) {
        self.timing.total_wall_time_ms = wall_time_ms;

        if wall_time_ms > 0.0 {
            let seconds = wall_time_ms / 1000.0;
            self.timing.sim_time_per_second = self.final_time / seconds;
            self.timing.events_per_second = self.kernel.events_executed as f64 / seconds;
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let k = &self.kernel;
        let mut csv = String::new();

        csv.push_str("metric,value\n");

        csv.push_str(&format!("final_time,{}\n", self.final_time));
        csv.push_str(&format!("final_time_steps,{}\n", self.final_time_steps));
        csv.push_str(&format!("events_scheduled,{}\n", k.events_scheduled));
        csv.push_str(&format!("events_executed,{}\n", k.events_executed));
        csv.push_str(&format!("events_cancelled,{}\n", k.events_cancelled));
        csv.push_str(&format!("events_removed,{}\n", k.events_removed));
        csv.push_str(&format!("events_discarded,{}\n", k.events_discarded));
        csv.push_str(&format!("destroy_events_executed,{}\n", k.destroy_events_executed));
        csv.push_str(&format!("peak_queue_size,{}\n", k.peak_queue_size));
        csv.push_str(&format!("runs,{}\n", k.runs));

        csv.push_str(&format!("wall_time_ms,{:.2}\n", self.timing.total_wall_time_ms));
        csv.push_str(&format!("sim_time_per_second,{:.2}\n", self.timing.sim_time_per_second));
        csv.push_str(&format!("events_per_second,{:.2}\n", self.timing.events_per_second));

        csv
    }

    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        let k = &self.kernel;

        writeln!(w, "=== Simulation Statistics ===")?;
        writeln!(w)?;

        if !self.metadata.name.is_empty() {
            writeln!(w, "Name: {}", self.metadata.name)?;
        }
        if !self.metadata.scheduler.is_empty() {
            writeln!(w, "Scheduler: {}", self.metadata.scheduler)?;
        }
        if let Some(ref start) = self.metadata.start_time {
            writeln!(w, "Started: {}", start)?;
        }
        if let Some(ref end) = self.metadata.end_time {
            writeln!(w, "Ended: {}", end)?;
        }
        writeln!(w)?;

        writeln!(w, "--- Kernel ---")?;
        writeln!(w, "Final simulation time: {} s ({} steps)", self.final_time, self.final_time_steps)?;
        writeln!(w, "Events scheduled: {}", k.events_scheduled)?;
        writeln!(w, "Events executed: {}", k.events_executed)?;
        writeln!(w, "Events cancelled: {}", k.events_cancelled)?;
        writeln!(w, "Events removed: {}", k.events_removed)?;
        writeln!(w, "Events discarded: {}", k.events_discarded)?;
        writeln!(w, "Destroy events executed: {}", k.destroy_events_executed)?;
        writeln!(w, "Peak queue size: {}", k.peak_queue_size)?;
        writeln!(w, "Runs: {}", k.runs)?;
        writeln!(w)?;

        writeln!(w, "--- Timing ---")?;
        writeln!(w, "Wall time: {:.2} ms", self.timing.total_wall_time_ms)?;
        writeln!(w, "Sim time/sec: {:.2}", self.timing.sim_time_per_second)?;
        writeln!(w, "Events/sec: {:.2}", self.timing.events_per_second)?;

        Ok(())
    }

    /// Returns the summary as a string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Measures elapsed wall-clock time.
#[derive(Debug)]
pub struct Stopwatch {
    start: std::time::Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

fn unix_now() -> String {
    let now = std::time::SystemTime::now();
    let duration = now.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    format!("{}s", duration.as_secs())
}

/// Wraps a simulation run with wall-clock timing.
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: SimulationStats,
    stopwatch: Option<Stopwatch>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            stats: SimulationStats::new(),
            stopwatch: None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.stats.metadata.name = name.into();
    }

    pub fn set_config_file(&mut self, path: impl Into<String>) {
        self.stats.metadata.config_file = Some(path.into());
    }

    /// Starts timing.
    pub fn start(&mut self) {
        self.stopwatch = Some(Stopwatch::start());
        self.stats.record_start();
    }

    /// Captures the simulator state and computes timing.
    pub fn stop(&mut self, sim: &Simulator) {
        self.stats.record_end();
        self.stats.capture(sim);
        if let Some(ref stopwatch) = self.stopwatch {
            self.stats.compute_timing(stopwatch.elapsed_ms());
        }
    }

    /// Updates kernel statistics from `Simulator::export_stats` output.
    pub fn update_from_json(&mut self, json: &serde_json::Value) {
        if let Some(kernel) = json.get("kernel") {
            if let Ok(k) = serde_json::from_value::<KernelStats>(kernel.clone()) {
                self.stats.kernel = k;
            }
        }
        if let Some(now) = json.get("now_seconds").and_then(|v| v.as_f64()) {
            self.stats.final_time = now;
        }
        if let Some(steps) = json.get("now_steps").and_then(|v| v.as_i64()) {
            self.stats.final_time_steps = steps;
        }
        if let Some(name) = json.get("scheduler").and_then(|v| v.as_str()) {
            self.stats.metadata.scheduler = name.to_string();
        }
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn into_stats(self) -> SimulationStats {
        self.stats
    }
}
