use std::fs;
use std::path::Path;

use directory::DEFAULT_DEBOUNCE_MS;
use focus::FocusConfig;
use foundation::coord::LatLng;
use markers::ClusterOptions;
use markers::palette::DepartmentPalette;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Every tunable of the engine. Missing fields take their reference values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Filter quiet period.
    pub debounce_ms: u64,
    /// `[lat, lng]` of the initial viewport; its zoom is `focus.default_zoom`.
    pub default_center: [f64; 2],
    pub popup_offset_px: [f64; 2],
    pub clustering: ClusterOptions,
    pub focus: FocusConfig,
    pub palette: DepartmentPalette,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            default_center: [39.8283, -98.5795],
            popup_offset_px: [0.0, -25.0],
            clustering: ClusterOptions::default(),
            focus: FocusConfig::default(),
            palette: DepartmentPalette::reference(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(text).map_err(EngineError::MalformedConfig)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn default_center(&self) -> LatLng {
        LatLng::new(self.default_center[0], self.default_center[1])
    }

    pub fn default_zoom(&self) -> f64 {
        self.focus.default_zoom
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if LatLng::checked(self.default_center[0], self.default_center[1]).is_none() {
            return Err(EngineError::InvalidConfig(format!(
                "default_center {:?} is not a valid coordinate",
                self.default_center
            )));
        }
        if !(self.focus.default_zoom.is_finite() && self.focus.max_zoom.is_finite()) {
            return Err(EngineError::InvalidConfig("zoom levels must be finite".to_string()));
        }
        if self.focus.max_zoom < self.focus.default_zoom {
            return Err(EngineError::InvalidConfig(format!(
                "focus.max_zoom ({}) is below focus.default_zoom ({})",
                self.focus.max_zoom, self.focus.default_zoom
            )));
        }
        if self.clustering.max_cluster_radius_px < 0.0 {
            return Err(EngineError::InvalidConfig(
                "clustering.max_cluster_radius_px must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
