//! Configuration types for the scheduling engine.

use serde::{Deserialize, Serialize};

/// Configuration for a scheduling pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// An activity is critical when its total float is at or below this many working days.
    pub critical_float_threshold: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            critical_float_threshold: 0,
        }
    }
}

/// Configuration for baseline variance classification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceConfig {
    /// Finish variance (working days) beyond which an activity counts as slipped.
    /// The same magnitude in the other direction counts as ahead.
    pub slip_threshold_days: i64,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            slip_threshold_days: 0,
        }
    }
}

/// Engine-wide configuration as supplied by the host application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub variance: VarianceConfig,
}

impl EngineConfig {
    /// Parse a JSON configuration document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.scheduler.verbosity, 0);
        assert_eq!(config.scheduler.critical_float_threshold, 0);
        assert_eq!(config.variance.slip_threshold_days, 0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"scheduler": {"verbosity": 2}}"#).unwrap();
        assert_eq!(config.scheduler.verbosity, 2);
        assert_eq!(config.scheduler.critical_float_threshold, 0);
        assert_eq!(config.variance, VarianceConfig::default());
    }

    #[test]
    fn test_empty_json_object() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(EngineConfig::from_json_str("{\"scheduler\": 3}").is_err());
    }
}
