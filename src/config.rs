//! Planner configuration.
//!
//! Everything the pipeline needs is carried in one explicit value; nothing
//! is read from ambient state. Missing JSON fields fall back to defaults.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::osrm::OsrmConfig;
use crate::partition::PartitionOptions;
use crate::sequencer::SequencerOptions;
use crate::tiler::DEFAULT_BATCH_SIZE;
use crate::traits::TableOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub osrm: OsrmConfig,
    /// Locations per axis in one table query.
    pub batch_size: usize,
    /// Forwarded to every matrix tile.
    pub table: TableOptions,
    pub partition: PartitionOptions,
    pub sequencing: SequencerOptions,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            osrm: OsrmConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            table: TableOptions::default(),
            partition: PartitionOptions::default(),
            sequencing: SequencerOptions::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Rejects settings that would fail only after requests were issued.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.partition.routes == 0 {
            return Err(ConfigError::Invalid("partition.routes must be at least 1".into()));
        }
        if self.sequencing.max_stops < 2 {
            return Err(ConfigError::Invalid(format!(
                "sequencing.max_stops must be at least 2, got {}",
                self.sequencing.max_stops
            )));
        }
        if self.osrm.base_url.is_empty() {
            return Err(ConfigError::Invalid("osrm.base_url must be set".into()));
        }
        self.table
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Metric;
    use crate::partition::{Scaling, UnreachablePolicy};
    use crate::sequencer::OverCapPolicy;

    #[test]
    fn empty_json_gives_defaults() {
        let config = PlannerConfig::from_json("{}").unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.sequencing.max_stops, 100);
        assert_eq!(config.partition.scaling, Scaling::PerColumn);
        assert_eq!(config.osrm.version, "v1");
    }

    #[test]
    fn parses_nested_sections() {
        let config = PlannerConfig::from_json(
            r#"{
                "osrm": {"base_url": "http://osrm:5000", "profile": "bicycle"},
                "batch_size": 50,
                "table": {"fallback_speed": 8.3, "fallback_coordinate": "snapped"},
                "partition": {
                    "routes": 4,
                    "metric": "distance",
                    "scaling": "global_symmetric",
                    "unreachable": "max_dissimilarity"
                },
                "sequencing": {"max_stops": 25, "over_cap": "reject"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.osrm.profile, "bicycle");
        assert_eq!(config.osrm.timeout_secs, 10);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.table.fallback_speed, Some(8.3));
        assert_eq!(config.partition.routes, 4);
        assert_eq!(config.partition.metric, Metric::Distance);
        assert_eq!(config.partition.scaling, Scaling::GlobalSymmetric);
        assert_eq!(config.partition.unreachable, UnreachablePolicy::MaxDissimilarity);
        assert_eq!(config.sequencing.over_cap, OverCapPolicy::Reject);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            PlannerConfig::from_json(r#"{"batch_size": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(PlannerConfig::from_json(r#"{"sequencing": {"max_stops": 1}}"#).is_err());
        assert!(PlannerConfig::from_json(r#"{"table": {"scale_factor": 0.0}}"#).is_err());
        assert!(matches!(
            PlannerConfig::from_json(r#"{"partition": {"metric": "weight"}}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
