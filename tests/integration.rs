//! Integration tests for configuration files, trace logs and statistics
//! export.

use std::io::Write;

use chronon::{
    seconds, ConfigError, SchedulerKind, SimConfig, SimConfigBuilder, SimError, Simulator,
    SimulationStats, StatsCollector, TraceRecord,
};

// ============================================================================
// Helpers
// ============================================================================

/// A small model: a source that emits a packet every second until t=5,
/// each packet being "received" 200ms later.
fn build_model(sim: &mut Simulator) {
    fn emit(sim: &mut Simulator, n: u32) {
        sim.schedule_after(chronon::milli_seconds(200), |_| {}).unwrap();
        if n < 5 {
            sim.schedule_after(seconds(1.0), move |sim| emit(sim, n + 1))
                .unwrap();
        }
    }
    sim.schedule(seconds(1.0), |sim| emit(sim, 1)).unwrap();
}

fn read_trace(path: &std::path::Path) -> Vec<TraceRecord> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| TraceRecord::parse(l).unwrap())
        .collect()
}

// ============================================================================
// Configuration files
// ============================================================================

#[test]
fn test_yaml_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "simulation:\n  name: yaml-run\n  scheduler: list\n  stop_time: 3.5\n"
    )
    .unwrap();

    let config = SimConfig::from_file(&path).unwrap();
    assert_eq!(config.simulation.name, "yaml-run");

    let mut sim = Simulator::from_config(&config).unwrap();
    assert_eq!(sim.scheduler_name(), "list");

    build_model(&mut sim);
    sim.run().unwrap();
    // Emissions at 1, 2, 3 and receptions at 1.2, 2.2, 3.2 fit before 3.5.
    assert_eq!(sim.stats().events_executed, 6);
    assert_eq!(sim.now(), seconds(3.2));
}

#[test]
fn test_json_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.json");

    let config = SimConfigBuilder::new()
        .name("json-run")
        .scheduler(SchedulerKind::Map)
        .collect_stats(true)
        .build()
        .unwrap();
    config.to_json_file(&path).unwrap();

    let restored = SimConfig::from_file(&path).unwrap();
    assert_eq!(restored, config);
}

#[test]
fn test_invalid_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yml");
    std::fs::write(&path, "simulation:\n  stop_time: -3\n").unwrap();

    assert!(matches!(
        SimConfig::from_file(&path),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = SimConfig::from_file(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_invalid_config_rejected_by_simulator() {
    let mut config = SimConfig::new();
    config.simulation.log_level = "chatty".to_string();

    let err = Simulator::from_config(&config).unwrap_err();
    assert!(matches!(err, SimError::Config(ConfigError::Validation(_))));
}

// ============================================================================
// Trace log
// ============================================================================

#[test]
fn test_trace_file_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("run.trace");

    let config = SimConfigBuilder::new()
        .trace_file(trace_path.to_string_lossy())
        .build()
        .unwrap();
    let mut sim = Simulator::from_config(&config).unwrap();

    let a = sim.schedule(seconds(1.0), |_| {}).unwrap();
    let b = sim.schedule(seconds(2.0), |sim| {
        sim.schedule_now(|_| {}).unwrap();
    })
    .unwrap();
    let c = sim.schedule(seconds(3.0), |_| {}).unwrap();
    sim.remove(&c);
    sim.run().unwrap();
    sim.destroy();

    let records = read_trace(&trace_path);
    let (a, b, c) = (a.uid(), b.uid(), c.uid());
    let s = 1_000_000_000u64;
    assert_eq!(
        records,
        vec![
            TraceRecord::Insert { cur_uid: 0, cur_ts: 0, uid: a, ts: s },
            TraceRecord::Insert { cur_uid: 0, cur_ts: 0, uid: b, ts: 2 * s },
            TraceRecord::Insert { cur_uid: 0, cur_ts: 0, uid: c, ts: 3 * s },
            TraceRecord::Remove { cur_uid: 0, cur_ts: 0, uid: c, ts: 3 * s },
            TraceRecord::Execute { uid: a, ts: s },
            TraceRecord::Execute { uid: b, ts: 2 * s },
            TraceRecord::Insert { cur_uid: b, cur_ts: 2 * s, uid: c + 1, ts: 2 * s },
            TraceRecord::Execute { uid: c + 1, ts: 2 * s },
        ]
    );
}

#[test]
fn test_trace_is_deterministic_across_backends() {
    let dir = tempfile::tempdir().unwrap();
    let mut traces = Vec::new();

    for kind in [SchedulerKind::List, SchedulerKind::Heap, SchedulerKind::Map] {
        let path = dir.path().join(format!("{}.trace", kind.name()));
        let mut sim = Simulator::with_scheduler_kind(kind);
        sim.enable_trace_to(&path).unwrap();
        build_model(&mut sim);
        sim.run().unwrap();
        sim.flush_trace().unwrap();
        traces.push(std::fs::read_to_string(&path).unwrap());
    }

    assert!(!traces[0].is_empty());
    assert_eq!(traces[0], traces[1]);
    assert_eq!(traces[0], traces[2]);
}

#[test]
fn test_trace_to_unwritable_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulator::new();
    let result = sim.enable_trace_to(dir.path().join("missing").join("run.trace"));
    assert!(matches!(result, Err(SimError::Io(_))));
}

// ============================================================================
// Statistics export
// ============================================================================

#[test]
fn test_stats_export_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulator::new();
    build_model(&mut sim);

    let mut collector = StatsCollector::new();
    collector.set_name("export");
    collector.start();
    sim.run().unwrap();
    collector.stop(&sim);

    let stats = collector.into_stats();
    assert_eq!(stats.kernel.events_executed, 10);
    assert_eq!(stats.final_time, 5.2);

    let json_path = dir.path().join("stats.json");
    stats.to_json_file(&json_path).unwrap();
    let restored: SimulationStats =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(restored.kernel, stats.kernel);
    assert_eq!(restored.metadata.name, "export");

    let csv_path = dir.path().join("stats.csv");
    stats.to_csv_file(&csv_path).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains("events_executed,10"));

    let summary = stats.summary();
    assert!(summary.contains("Scheduler: heap"));
}
