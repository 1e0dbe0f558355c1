#![forbid(unsafe_code)]

//! Tunables for a Verdant map as data.
//!
//! [`MapConfig`] collects the throttle and debounce intervals, the layer
//! zoom threshold, and the initial camera. It can be loaded from TOML or
//! JSON when the `config` feature is enabled; every field has a default, so
//! a file only needs the values it changes.
//!
//! ```toml
//! [sync]
//! throttle_ms = 100
//!
//! [camera]
//! zoom = 15
//! max_bounds = [54.7, 9.3, 54.9, 9.6]
//! ```
//!
//! ```rust,ignore
//! let config = MapConfig::from_toml_file("verdant-map.toml")?;
//! ```
//!
//! `MapConfig::default()` reproduces the built-in constants exactly.

#[cfg(feature = "config")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{
    DEFAULT_CENTER, DEFAULT_DEBOUNCE, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_ZOOM, MapCamera,
};
use crate::layers::DEFAULT_ZOOM_THRESHOLD;
use crate::throttle::DEFAULT_THROTTLE;
use verdant_core::geometry::{LatLng, LatLngBounds};

/// Top-level map configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct MapConfig {
    pub sync: SyncPolicyConfig,
    pub layers: LayerPolicyConfig,
    pub camera: CameraPolicyConfig,
}

/// Marker reconciliation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SyncPolicyConfig {
    /// Minimum gap between reconciliations during a pan, in milliseconds.
    pub throttle_ms: u64,
}

impl Default for SyncPolicyConfig {
    fn default() -> Self {
        Self {
            throttle_ms: DEFAULT_THROTTLE.as_millis() as u64,
        }
    }
}

/// Layer switching.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct LayerPolicyConfig {
    /// Zoom from which trees replace clusters.
    pub zoom_threshold: f64,
}

impl Default for LayerPolicyConfig {
    fn default() -> Self {
        Self {
            zoom_threshold: DEFAULT_ZOOM_THRESHOLD,
        }
    }
}

/// Initial camera and its persistence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CameraPolicyConfig {
    /// `[latitude, longitude]`.
    pub center: [f64; 2],
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// `[south, west, north, east]`.
    pub max_bounds: Option<[f64; 4]>,
    /// Quiet period before a camera change is committed, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for CameraPolicyConfig {
    fn default() -> Self {
        Self {
            center: [DEFAULT_CENTER.lat, DEFAULT_CENTER.lng],
            zoom: DEFAULT_ZOOM,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            max_bounds: None,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl MapConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize as pretty JSON.
    #[cfg(feature = "config")]
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every parameter. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let cam = &self.camera;

        if self.sync.throttle_ms == 0 {
            errors.push("sync.throttle_ms must be > 0".into());
        }
        if cam.debounce_ms == 0 {
            errors.push("camera.debounce_ms must be > 0".into());
        }
        if !self.layers.zoom_threshold.is_finite() || self.layers.zoom_threshold < 0.0 {
            errors.push(format!(
                "layers.zoom_threshold must be >= 0, got {}",
                self.layers.zoom_threshold
            ));
        }
        let zooms = [
            ("camera.zoom", cam.zoom),
            ("camera.min_zoom", cam.min_zoom),
            ("camera.max_zoom", cam.max_zoom),
        ];
        let mut zooms_finite = true;
        for (name, value) in zooms {
            if !value.is_finite() {
                errors.push(format!("{name} must be finite, got {value}"));
                zooms_finite = false;
            }
        }
        // Ordering checks need finite values.
        if zooms_finite && cam.min_zoom > cam.max_zoom {
            errors.push(format!(
                "camera.min_zoom ({}) must be <= camera.max_zoom ({})",
                cam.min_zoom, cam.max_zoom
            ));
        }
        if zooms_finite && (cam.zoom < cam.min_zoom || cam.zoom > cam.max_zoom) {
            errors.push(format!(
                "camera.zoom must be in [{}, {}], got {}",
                cam.min_zoom, cam.max_zoom, cam.zoom
            ));
        }
        let [lat, lng] = cam.center;
        if !(-90.0..=90.0).contains(&lat) {
            errors.push(format!("camera.center latitude must be in [-90, 90], got {lat}"));
        }
        if !(-180.0..=180.0).contains(&lng) {
            errors.push(format!(
                "camera.center longitude must be in [-180, 180], got {lng}"
            ));
        }
        if let Some([south, west, north, east]) = cam.max_bounds {
            if south > north || west > east {
                errors.push(format!(
                    "camera.max_bounds must be [south, west, north, east], \
                     got [{south}, {west}, {north}, {east}]"
                ));
            } else if !LatLngBounds::from_bbox([south, west, north, east])
                .contains(LatLng::new(lat, lng))
            {
                errors.push("camera.center must lie inside camera.max_bounds".into());
            }
        }

        errors
    }

    /// Fail with every violation if the config is invalid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.sync.throttle_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.camera.debounce_ms)
    }

    /// The initial camera described by this config.
    pub fn to_camera(&self) -> MapCamera {
        let cam = &self.camera;
        MapCamera {
            center: LatLng::new(cam.center[0], cam.center[1]),
            zoom: cam.zoom,
            min_zoom: cam.min_zoom,
            max_zoom: cam.max_zoom,
            max_bounds: cam.max_bounds.map(LatLngBounds::from_bbox),
        }
    }
}

/// Errors loading a map configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[cfg(feature = "config")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid map config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_built_in_constants() {
        let config = MapConfig::default();
        assert_eq!(config.throttle(), DEFAULT_THROTTLE);
        assert_eq!(config.debounce(), DEFAULT_DEBOUNCE);
        assert_eq!(config.layers.zoom_threshold, 17.0);
        assert_eq!(config.to_camera(), MapCamera::default());
    }

    #[test]
    fn default_validates_clean() {
        let errors = MapConfig::default().validate();
        assert!(errors.is_empty(), "default should validate: {errors:?}");
    }

    #[test]
    fn validate_reports_every_violation() {
        let mut config = MapConfig::default();
        config.sync.throttle_ms = 0;
        config.camera.debounce_ms = 0;
        config.camera.zoom = 20.0;
        config.camera.center = [95.0, 200.0];
        let errors = config.validate();
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("sync.throttle_ms")));
        assert!(errors.iter().any(|e| e.contains("camera.debounce_ms")));
        assert!(errors.iter().any(|e| e.contains("camera.zoom")));
        assert!(errors.iter().any(|e| e.contains("latitude")));
        assert!(errors.iter().any(|e| e.contains("longitude")));
    }

    #[test]
    fn inverted_zoom_limits() {
        let mut config = MapConfig::default();
        config.camera.min_zoom = 18.0;
        config.camera.max_zoom = 13.0;
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("camera.min_zoom")));
    }

    #[test]
    fn non_finite_zoom_fields_are_rejected() {
        let mut config = MapConfig::default();
        config.camera.zoom = f64::NAN;
        config.camera.max_zoom = f64::INFINITY;
        let errors = config.validate();
        assert_eq!(
            errors,
            vec![
                "camera.zoom must be finite, got NaN".to_owned(),
                "camera.max_zoom must be finite, got inf".to_owned(),
            ]
        );
        assert!(config.validated().is_err());

        let mut config = MapConfig::default();
        config.camera.min_zoom = f64::NEG_INFINITY;
        assert_eq!(
            config.validate(),
            vec!["camera.min_zoom must be finite, got -inf".to_owned()]
        );
    }

    #[test]
    fn center_outside_max_bounds() {
        let mut config = MapConfig::default();
        config.camera.max_bounds = Some([0.0, 0.0, 1.0, 1.0]);
        let errors = config.validate();
        assert_eq!(errors, vec!["camera.center must lie inside camera.max_bounds".to_owned()]);
    }

    #[test]
    fn validated_wraps_errors() {
        let mut config = MapConfig::default();
        config.sync.throttle_ms = 0;
        let err = config.validated().unwrap_err();
        assert!(err.to_string().contains("sync.throttle_ms"));
    }

    #[cfg(feature = "config")]
    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MapConfig::from_toml_str("[sync]\nthrottle_ms = 90\n").unwrap();
        assert_eq!(config.sync.throttle_ms, 90);
        assert_eq!(config.camera, CameraPolicyConfig::default());
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_round_trip() {
        let mut config = MapConfig::default();
        config.camera.max_bounds = Some([54.7, 9.3, 54.9, 9.6]);
        let json = config.to_json_pretty().unwrap();
        assert_eq!(MapConfig::from_json_str(&json).unwrap(), config);
    }
}
