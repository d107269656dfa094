//! Configuration parsing and validation for solver runs

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use sph2d::{DomainLayout, PhysicalParams, SearchMode, TimeScheme};

/// Errors raised while loading or validating a [`SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration JSON.
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything needed to set up and drive one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Human-readable run name
    #[serde(default = "default_name")]
    pub name: String,
    /// Smoothing length over particle spacing
    #[serde(default = "default_h_factor")]
    pub h_factor: f64,
    /// Initial lattice spacing (meters)
    pub particle_spacing: f64,
    /// Stop once this much simulated time has elapsed (seconds)
    pub max_time: f64,
    /// Integrator; accepts `0`/`1` as well as the scheme name
    #[serde(default, deserialize_with = "deserialize_scheme")]
    pub scheme: TimeScheme,
    /// Smooth densities every this many steps
    #[serde(default = "default_smoothing_interval")]
    pub smoothing_interval: u64,
    /// Neighbor enumeration for force sweeps
    #[serde(default)]
    pub search: SearchMode,
    /// Log progress and emit a snapshot every this many steps
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
    /// Physical constants
    #[serde(default)]
    pub physics: PhysicalParams,
    /// Tank and initial fluid layout
    #[serde(default)]
    pub layout: DomainLayout,
}

// Default values
fn default_name() -> String {
    "dam_break".to_string()
}

fn default_h_factor() -> f64 {
    1.3
}

fn default_smoothing_interval() -> u64 {
    20
}

fn default_report_interval() -> u64 {
    50
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemeRepr {
    Selector(u8),
    Named(TimeScheme),
}

fn deserialize_scheme<'de, D>(deserializer: D) -> Result<TimeScheme, D::Error>
where
    D: Deserializer<'de>,
{
    match SchemeRepr::deserialize(deserializer)? {
        SchemeRepr::Selector(selector) => TimeScheme::from_selector(selector).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown scheme selector {selector}, expected 0 (forward euler) or 1 (predictor-corrector)"
            ))
        }),
        SchemeRepr::Named(scheme) => Ok(scheme),
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            h_factor: default_h_factor(),
            particle_spacing: 0.2,
            max_time: 1.0,
            scheme: TimeScheme::default(),
            smoothing_interval: default_smoothing_interval(),
            search: SearchMode::default(),
            report_interval: default_report_interval(),
            physics: PhysicalParams::default(),
            layout: DomainLayout::default(),
        }
    }
}

impl SimulationConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.particle_spacing > 0.0 && self.particle_spacing.is_finite()) {
            return invalid("particle_spacing must be positive");
        }
        if !(self.h_factor > 0.0 && self.h_factor.is_finite()) {
            return invalid("h_factor must be positive");
        }
        if !(self.max_time > 0.0 && self.max_time.is_finite()) {
            return invalid("max_time must be positive");
        }
        if self.smoothing_interval == 0 {
            return invalid("smoothing_interval must be at least 1");
        }
        if self.report_interval == 0 {
            return invalid("report_interval must be at least 1");
        }

        // Physics
        if self.physics.speed_of_sound <= 0.0 {
            return invalid("speed_of_sound must be positive");
        }
        if self.physics.rest_density <= 0.0 {
            return invalid("rest_density must be positive");
        }
        if self.physics.gamma <= 0.0 {
            return invalid("gamma must be positive");
        }
        if self.physics.viscosity < 0.0 {
            return invalid("viscosity must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.physics.velocity_lost_rate) {
            return invalid("velocity_lost_rate must be in [0, 1]");
        }

        // Layout
        if !self.layout.inner.is_valid() {
            return invalid("layout.inner must have min < max on both axes");
        }
        if let Some(i) = self.layout.voids.iter().position(|v| !v.is_valid()) {
            return Err(ConfigError::Invalid(format!(
                "layout.voids[{i}] must have min < max on both axes"
            )));
        }

        Ok(())
    }

    /// Smoothing length implied by spacing and factor
    pub fn smoothing_length(&self) -> f64 {
        self.h_factor * self.particle_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sph2d::Rect;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config =
            SimulationConfig::from_json(r#"{ "particle_spacing": 0.1, "max_time": 2.0 }"#).unwrap();
        assert_eq!(config.h_factor, 1.3);
        assert_eq!(config.scheme, TimeScheme::ForwardEuler);
        assert_eq!(config.search, SearchMode::Symmetric);
        assert_eq!(config.smoothing_interval, 20);
        assert_eq!(config.report_interval, 50);
        assert_eq!(config.physics, PhysicalParams::default());
        assert_eq!(config.layout, DomainLayout::dam_break());
        assert!((config.smoothing_length() - 0.13).abs() < 1e-12);
    }

    #[test]
    fn test_scheme_selector_and_name() {
        let by_index = SimulationConfig::from_json(
            r#"{ "particle_spacing": 0.1, "max_time": 1.0, "scheme": 1 }"#,
        )
        .unwrap();
        assert_eq!(by_index.scheme, TimeScheme::PredictorCorrector);

        let by_name = SimulationConfig::from_json(
            r#"{ "particle_spacing": 0.1, "max_time": 1.0, "scheme": "predictor_corrector", "search": "full" }"#,
        )
        .unwrap();
        assert_eq!(by_name.scheme, TimeScheme::PredictorCorrector);
        assert_eq!(by_name.search, SearchMode::Full);

        let err = SimulationConfig::from_json(
            r#"{ "particle_spacing": 0.1, "max_time": 1.0, "scheme": 2 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn test_partial_physics_override() {
        let config = SimulationConfig::from_json(
            r#"{ "particle_spacing": 0.1, "max_time": 1.0, "physics": { "gravity": 0.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.physics.gravity, 0.0);
        assert_eq!(config.physics.speed_of_sound, 20.0);
    }

    #[test]
    fn test_validation_particle_spacing() {
        let mut config = SimulationConfig {
            particle_spacing: -0.01,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        config.particle_spacing = 0.01;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_intervals_and_time() {
        let mut config = SimulationConfig {
            smoothing_interval: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
        config.smoothing_interval = 20;
        config.max_time = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_inverted_void() {
        let mut config = SimulationConfig::default();
        config.layout.voids.push(Rect::new([5.0, 5.0], [1.0, 1.0]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("voids[2]"), "{err}");
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimulationConfig::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
