//! Application configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::logging::LogConfig;
use crate::types::{Laterality, Resolution};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub capture: CaptureConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Distance at which calibration frames are taken.
    pub reference_distance_cm: f64,
    /// Distances below this raise the proximity warning.
    pub warning_distance_cm: f64,
    /// Eye tracked when the session starts.
    pub laterality: Laterality,
    pub fps_window_ms: u64,
}

impl SessionConfig {
    pub fn reference_distance_mm(&self) -> f64 {
        self.reference_distance_cm * 10.0
    }

    pub fn warning_distance_mm(&self) -> f64 {
        self.warning_distance_cm * 10.0
    }

    pub fn fps_window(&self) -> Duration {
        Duration::from_millis(self.fps_window_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reference_distance_cm: 40.0,
            warning_distance_cm: 30.0,
            laterality: Laterality::Left,
            fps_window_ms: 2000,
        }
    }
}

/// Resolution asked of the capture device. Devices treat it as a preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub preferred_width: u32,
    pub preferred_height: u32,
}

impl CaptureConfig {
    pub fn preferred_resolution(&self) -> Resolution {
        Resolution::new(self.preferred_width, self.preferred_height)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_width: 3840,
            preferred_height: 2160,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{name} must be a positive number, got {v}")))
            }
        };
        positive("session.reference_distance_cm", self.session.reference_distance_cm)?;
        positive("session.warning_distance_cm", self.session.warning_distance_cm)?;

        if self.session.fps_window_ms == 0 {
            return Err(Error::InvalidConfig(
                "session.fps_window_ms must be greater than zero".to_string(),
            ));
        }
        if self.capture.preferred_width == 0 || self.capture.preferred_height == 0 {
            return Err(Error::InvalidConfig(
                "capture resolution must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.session.reference_distance_mm(), 400.0);
        assert_eq!(config.session.warning_distance_mm(), 300.0);
        assert_eq!(config.session.fps_window(), Duration::from_millis(2000));
        assert_eq!(
            config.capture.preferred_resolution(),
            Resolution::new(3840, 2160)
        );
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"session": {"laterality": "od", "warning_distance_cm": 25}}"#)
                .unwrap();
        assert_eq!(config.session.laterality, Laterality::Right);
        assert_eq!(config.session.warning_distance_cm, 25.0);
        assert_eq!(config.session.reference_distance_cm, 40.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_non_positive_distances() {
        let mut config = AppConfig::default();
        config.session.reference_distance_cm = 0.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.session.fps_window_ms = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn load_reads_and_validates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"session": {"reference_distance_cm": -1}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(Error::InvalidConfig(_))));

        fs::write(&path, r#"{"capture": {"preferred_width": 1280, "preferred_height": 720}}"#)
            .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.capture.preferred_resolution(), Resolution::new(1280, 720));
    }
}
