//! Planner configuration.
//!
//! Loaded once per deployment, typically from a TOML file:
//!
//! ```toml
//! slot_minutes = 15
//! capacity_policy = "warn"
//! overflow_policy = "allow"
//! high_load_threshold = 85.0
//!
//! [working_hours]
//! start_hour = 8
//! end_hour = 18
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.
//! The AW length is not part of the configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::grid::{TimeGrid, WorkingHours, DEFAULT_SLOT_MINUTES};

/// What happens when a placement pushes a lane past its capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// Allow and attach a capacity warning.
    #[default]
    Warn,
    /// Reject with `CapacityExceeded`.
    Block,
}

/// What happens when an assignment would end after closing time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the computed end time.
    #[default]
    Allow,
    /// Reject with `OutsideWorkingHours`.
    Reject,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub working_hours: WorkingHours,
    /// Placement granularity in minutes. Must divide 60.
    pub slot_minutes: u32,
    pub capacity_policy: CapacityPolicy,
    pub overflow_policy: OverflowPolicy,
    /// Utilization (%) from which a lane is reported as highly loaded.
    pub high_load_threshold: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            working_hours: WorkingHours::default(),
            slot_minutes: DEFAULT_SLOT_MINUTES,
            capacity_policy: CapacityPolicy::default(),
            overflow_policy: OverflowPolicy::default(),
            high_load_threshold: 85.0,
        }
    }
}

impl PlannerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let hours = self.working_hours;
        if hours.start_hour >= hours.end_hour || hours.end_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "working hours {}-{} are not a valid window",
                hours.start_hour, hours.end_hour
            )));
        }
        if self.slot_minutes == 0 || 60 % self.slot_minutes != 0 {
            return Err(ConfigError::Invalid(format!(
                "slot_minutes {} must divide 60",
                self.slot_minutes
            )));
        }
        if !self.high_load_threshold.is_finite() || self.high_load_threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "high_load_threshold {} must be positive",
                self.high_load_threshold
            )));
        }
        Ok(())
    }

    /// The time grid described by this configuration.
    pub fn grid(&self) -> TimeGrid {
        TimeGrid::new(self.working_hours, self.slot_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.working_hours, WorkingHours::new(8, 18));
        assert_eq!(config.slot_minutes, 15);
        assert_eq!(config.capacity_policy, CapacityPolicy::Warn);
        assert_eq!(config.overflow_policy, OverflowPolicy::Allow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = PlannerConfig::from_toml_str("").unwrap();
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let config = PlannerConfig::from_toml_str(
            r#"
            slot_minutes = 30
            capacity_policy = "block"
            overflow_policy = "reject"

            [working_hours]
            start_hour = 7
            end_hour = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.slot_minutes, 30);
        assert_eq!(config.capacity_policy, CapacityPolicy::Block);
        assert_eq!(config.overflow_policy, OverflowPolicy::Reject);
        assert_eq!(config.grid().working_hours(), WorkingHours::new(7, 16));
        assert!((config.high_load_threshold - 85.0).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_values() {
        let bad_hours = PlannerConfig::from_toml_str(
            "[working_hours]\nstart_hour = 18\nend_hour = 8\n",
        );
        assert!(matches!(bad_hours, Err(ConfigError::Invalid(_))));

        let bad_slot = PlannerConfig::from_toml_str("slot_minutes = 7");
        assert!(matches!(bad_slot, Err(ConfigError::Invalid(_))));

        let bad_policy = PlannerConfig::from_toml_str("capacity_policy = \"maybe\"");
        assert!(matches!(bad_policy, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = PlannerConfig::from_file("/nonexistent/planner.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
