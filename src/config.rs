use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::error::{FeatureError, Result};

/// Tunables of the lifecycle manager and the proximity query engine.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Buffer radius used when processing without an explicit radius, in meters.
    pub default_buffer_m: f64,
    /// Largest accepted buffer radius, in meters.
    pub max_buffer_m: f64,
    /// Number of vertices of a buffer polygon.
    pub buffer_segments: usize,
    /// Query radius used when a proximity query gives none, in meters.
    pub default_radius_m: f64,
}

pub const MIN_BUFFER_SEGMENTS: usize = 8;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_buffer_m: 500.0,
            max_buffer_m: 100_000.0,
            buffer_segments: 64,
            default_radius_m: 1_000.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_buffer_m.is_finite() && self.max_buffer_m > 0.0) {
            return Err(FeatureError::validation(format!(
                "max_buffer_m must be positive, got {}",
                self.max_buffer_m
            )));
        }
        if !(self.default_buffer_m > 0.0 && self.default_buffer_m <= self.max_buffer_m) {
            return Err(FeatureError::validation(format!(
                "default_buffer_m must be in (0, {}], got {}",
                self.max_buffer_m, self.default_buffer_m
            )));
        }
        if self.buffer_segments < MIN_BUFFER_SEGMENTS {
            return Err(FeatureError::validation(format!(
                "buffer_segments must be at least {}, got {}",
                MIN_BUFFER_SEGMENTS, self.buffer_segments
            )));
        }
        if !(self.default_radius_m.is_finite() && self.default_radius_m > 0.0) {
            return Err(FeatureError::validation(format!(
                "default_radius_m must be positive, got {}",
                self.default_radius_m
            )));
        }
        Ok(())
    }
}

fn default_process() -> bool {
    true
}

/// A feature to create when running a scenario.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioFeature {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub buffer_m: Option<f64>,
    #[serde(default = "default_process")]
    pub process: bool,
}

/// A proximity query to run once all scenario features are created and processed.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: Option<f64>,
}

/// Input file of the command line tool.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub features: Vec<ScenarioFeature>,
    #[serde(default)]
    pub queries: Vec<ScenarioQuery>,
    pub output_geojson: Option<PathBuf>,
    pub report_filepath: Option<PathBuf>,
}

impl ScenarioConfig {
    pub fn load(filepath: &Path) -> anyhow::Result<Self> {
        if !filepath.exists() {
            return Err(anyhow!("Config file {:?} not found", filepath));
        }
        let contents =
            read_to_string(filepath).with_context(|| format!("Reading {:?}", filepath))?;
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Parsing scenario config {:?}", filepath))?;
        config.engine.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use testdir::testdir;

    use super::{EngineConfig, ScenarioConfig};

    #[test]
    fn test_load_scenario_with_defaults() {
        let test_dir = testdir!();
        let filepath = test_dir.join("scenario.yaml");
        fs::write(
            &filepath,
            r#"
engine:
  buffer_segments: 32
features:
  - name: Depot
    lat: 47.4979
    lon: 19.0402
  - name: Warehouse
    lat: 47.5
    lon: 19.05
    buffer_m: 250
    process: false
queries:
  - lat: 47.4979
    lon: 19.0402
"#,
        )
        .unwrap();

        let config = ScenarioConfig::load(&filepath).unwrap();
        assert_eq!(32, config.engine.buffer_segments);
        assert_eq!(500.0, config.engine.default_buffer_m);
        assert_eq!(2, config.features.len());
        assert!(config.features[0].process);
        assert_eq!(None, config.features[0].buffer_m);
        assert!(!config.features[1].process);
        assert_eq!(Some(250.0), config.features[1].buffer_m);
        assert_eq!(None, config.queries[0].radius_m);
        assert!(config.output_geojson.is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let test_dir = testdir!();
        assert!(ScenarioConfig::load(&test_dir.join("missing.yaml")).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_engine_config() {
        let test_dir = testdir!();
        let filepath = test_dir.join("scenario.yaml");
        fs::write(&filepath, "engine:\n  buffer_segments: 3\n").unwrap();
        assert!(ScenarioConfig::load(&filepath).is_err());
    }

    #[rstest]
    #[case(EngineConfig::default(), true)]
    #[case(EngineConfig { default_buffer_m: 0.0, ..EngineConfig::default() }, false)]
    #[case(EngineConfig { default_buffer_m: 200_000.0, ..EngineConfig::default() }, false)]
    #[case(EngineConfig { max_buffer_m: f64::INFINITY, ..EngineConfig::default() }, false)]
    #[case(EngineConfig { buffer_segments: 7, ..EngineConfig::default() }, false)]
    #[case(EngineConfig { default_radius_m: -1.0, ..EngineConfig::default() }, false)]
    fn test_validate(#[case] config: EngineConfig, #[case] valid: bool) {
        assert_eq!(valid, config.validate().is_ok());
    }
}
