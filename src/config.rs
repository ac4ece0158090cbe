//! Engine configuration.
//!
//! An explicit value handed to [`crate::Engine::new`]; nothing about a run
//! lives in global state.

use serde::{Deserialize, Serialize};

use crate::model::EdgeDir;
use crate::{Error, Result};

/// Run parameters shared by every vertex program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lane count K. Must equal the program's lane count.
    pub lanes: usize,
    /// Superstep cap; 0 runs until quiescence.
    pub max_iterations: usize,
    /// Treat edges as directed when the program asks for it.
    pub directed: bool,
    /// Propagate track masks so only changed lanes travel. When off, every
    /// message carries all lanes.
    pub tracking: bool,
    /// Override the program's gather edge set.
    pub gather: Option<EdgeDir>,
    /// Override the program's scatter edge set.
    pub scatter: Option<EdgeDir>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lanes: 8,
            max_iterations: 0,
            directed: true,
            tracking: true,
            gather: None,
            scatter: None,
        }
    }
}

impl EngineConfig {
    pub fn with_lanes(lanes: usize) -> Self {
        Self { lanes, ..Self::default() }
    }

    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    pub fn tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lanes == 0 {
            return Err(Error::Config("lanes must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_fills_defaults() {
        let cfg = EngineConfig::from_json(r#"{ "lanes": 2, "gather": "all" }"#).unwrap();
        assert_eq!(
            cfg,
            EngineConfig { lanes: 2, gather: Some(EdgeDir::All), ..EngineConfig::default() }
        );
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "scatter": "diagonal" }"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().contains("diagonal"));
    }

    #[test]
    fn zero_lanes_is_a_config_error() {
        let err = EngineConfig::from_json(r#"{ "lanes": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
