//! Configuration for overlay queries.

use serde::{Deserialize, Serialize};

/// Resolution policy for overlay queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Full resolution divided by this gives the quick resolution.
    pub quick_factor: usize,

    /// Lower bound on the quick grid width.
    pub min_quick_x: usize,

    /// Lower bound on the quick grid height.
    pub min_quick_y: usize,

    /// Map resolution (m/px) above which only quick queries run.
    pub quick_only_resolution: f64,

    /// Map resolution (m/px) above which the heatmap is cleared.
    pub clear_resolution: f64,

    /// Edge of the square viewshed grid.
    pub viewshed_samples: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            quick_factor: 5,
            min_quick_x: 14,
            min_quick_y: 10,
            quick_only_resolution: 30.0,
            clear_resolution: 1000.0,
            viewshed_samples: 201,
        }
    }
}

impl OverlayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("OVERLAY_QUICK_FACTOR") {
            if let Ok(n) = val.parse() {
                config.quick_factor = n;
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_MIN_QUICK_X") {
            if let Ok(n) = val.parse() {
                config.min_quick_x = n;
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_MIN_QUICK_Y") {
            if let Ok(n) = val.parse() {
                config.min_quick_y = n;
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_QUICK_ONLY_RESOLUTION") {
            if let Ok(res) = val.parse() {
                config.quick_only_resolution = res;
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_CLEAR_RESOLUTION") {
            if let Ok(res) = val.parse() {
                config.clear_resolution = res;
            }
        }

        if let Ok(val) = std::env::var("VIEWSHED_SAMPLES") {
            if let Ok(n) = val.parse() {
                config.viewshed_samples = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.quick_factor == 0 {
            return Err("quick_factor must be > 0".to_string());
        }

        if self.min_quick_x == 0 || self.min_quick_y == 0 {
            return Err("minimum quick resolution must be > 0".to_string());
        }

        if !(self.quick_only_resolution > 0.0) {
            return Err("quick_only_resolution must be > 0".to_string());
        }

        if self.clear_resolution < self.quick_only_resolution {
            return Err("clear_resolution must be >= quick_only_resolution".to_string());
        }

        if self.viewshed_samples < 3 {
            return Err("viewshed_samples must be >= 3".to_string());
        }

        if self.viewshed_samples % 2 == 0 {
            return Err("viewshed_samples must be odd".to_string());
        }

        Ok(())
    }
}
