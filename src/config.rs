//! Configuration for a simulator instance.
//!
//! Settings can come from YAML or JSON files, or be built in code with
//! [`SimConfigBuilder`]. Every loader validates before returning.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! simulation:
//!   name: ping-pong
//!   scheduler: map          # list | heap | map
//!   precision: nanoseconds  # seconds .. femtoseconds
//!   stop_time: 10.0         # seconds, optional
//!   log_level: debug
//!   trace_file: run.trace   # optional
//!   collect_stats: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::scheduler::SchedulerKind;
use crate::time::Precision;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Simulator parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Name used in logs and statistics
    #[serde(default = "default_name")]
    pub name: String,

    /// Scheduler backend
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Unit of one time step
    #[serde(default)]
    pub precision: Precision,

    /// Absolute stop time in seconds
    #[serde(default)]
    pub stop_time: Option<f64>,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path of the kernel trace log
    #[serde(default)]
    pub trace_file: Option<String>,

    /// Whether to collect detailed statistics
    #[serde(default)]
    pub collect_stats: bool,
}

fn default_name() -> String {
    "simulation".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            scheduler: SchedulerKind::default(),
            precision: Precision::default(),
            stop_time: None,
            log_level: default_log_level(),
            trace_file: None,
            collect_stats: false,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation("simulation name is empty".to_string()));
        }
        if let Some(stop) = self.stop_time {
            if !stop.is_finite() || stop < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "stop_time must be a finite, non-negative number of seconds, got {}",
                    stop
                )));
            }
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown log level: {}",
                self.log_level
            )));
        }
        if matches!(self.trace_file, Some(ref p) if p.trim().is_empty()) {
            return Err(ConfigError::Validation("trace_file is empty".to_string()));
        }
        Ok(())
    }
}

/// Complete simulator configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationParams,
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.simulation.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating a [`SimConfig`] in code.
#[derive(Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.simulation.name = name.into();
        self
    }

    pub fn scheduler(mut self, kind: SchedulerKind) -> Self {
        self.config.simulation.scheduler = kind;
        self
    }

    pub fn precision(mut self, precision: Precision) -> Self {
        self.config.simulation.precision = precision;
        self
    }

    /// Sets the absolute stop time in seconds.
    pub fn stop_time(mut self, seconds: f64) -> Self {
        self.config.simulation.stop_time = Some(seconds);
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.simulation.log_level = level.into();
        self
    }

    pub fn trace_file(mut self, path: impl Into<String>) -> Self {
        self.config.simulation.trace_file = Some(path.into());
        self
    }

    pub fn collect_stats(mut self, enable: bool) -> Self {
        self.config.simulation.collect_stats = enable;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<SimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::new();
        assert_eq!(config.simulation.name, "simulation");
        assert_eq!(config.simulation.scheduler, SchedulerKind::Heap);
        assert_eq!(config.simulation.precision, Precision::NanoSeconds);
        assert_eq!(config.simulation.stop_time, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
simulation:
  name: ping-pong
  scheduler: list
  precision: microseconds
  stop_time: 2.5
  log_level: debug
  collect_stats: true
"#;

        let config = SimConfig::from_yaml(yaml).unwrap();
        let p = &config.simulation;
        assert_eq!(p.name, "ping-pong");
        assert_eq!(p.scheduler, SchedulerKind::List);
        assert_eq!(p.precision, Precision::MicroSeconds);
        assert_eq!(p.stop_time, Some(2.5));
        assert_eq!(p.log_level, "debug");
        assert!(p.collect_stats);
    }

    #[test]
    fn test_json_parsing() {
        let json = r#"{
            "simulation": {
                "scheduler": "map",
                "trace_file": "out.trace"
            }
        }"#;

        let config = SimConfig::from_json(json).unwrap();
        assert_eq!(config.simulation.scheduler, SchedulerKind::Map);
        assert_eq!(config.simulation.trace_file.as_deref(), Some("out.trace"));
        assert_eq!(config.simulation.log_level, "info");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SimConfig::from_json("{}").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = SimConfigBuilder::new()
            .name("bench")
            .scheduler(SchedulerKind::Map)
            .stop_time(10.0)
            .collect_stats(true)
            .build()
            .unwrap();

        assert_eq!(config.simulation.name, "bench");
        assert_eq!(config.simulation.scheduler, SchedulerKind::Map);
        assert_eq!(config.simulation.stop_time, Some(10.0));
    }

    #[test]
    fn test_validation_negative_stop_time() {
        let yaml = r#"
simulation:
  stop_time: -1.0
"#;
        assert!(matches!(
            SimConfig::from_yaml(yaml),
            Err(ConfigError::Validation(_))
        ));
        assert!(SimConfigBuilder::new().stop_time(f64::NAN).build().is_err());
    }

    #[test]
    fn test_validation_log_level() {
        assert!(SimConfigBuilder::new().log_level("WARN").build().is_ok());
        assert!(SimConfigBuilder::new().log_level("loud").build().is_err());
    }

    #[test]
    fn test_validation_empty_name() {
        assert!(SimConfigBuilder::new().name("  ").build().is_err());
    }

    #[test]
    fn test_unknown_scheduler_rejected() {
        let yaml = r#"
simulation:
  scheduler: calendar
"#;
        assert!(matches!(SimConfig::from_yaml(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            SimConfig::from_file("config.toml"),
            Err(ConfigError::UnknownFormat(ext)) if ext == "toml"
        ));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = SimConfigBuilder::new()
            .scheduler(SchedulerKind::List)
            .precision(Precision::PicoSeconds)
            .build()
            .unwrap();

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("picoseconds"));
        let restored = SimConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config, restored);
    }
}
