//! Viewport state and the resolution policy derived from it.

use serde::{Deserialize, Serialize};
use terrain_common::{Aoi, Hemisphere};

use crate::config::OverlayConfig;

/// Output grid size in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Reduced grid used while the map moves.
    pub fn quick(&self, config: &OverlayConfig) -> Self {
        let factor = config.quick_factor.max(1);
        Self {
            width: (self.width / factor).max(config.min_quick_x),
            height: (self.height / factor).max(config.min_quick_y),
        }
    }
}

/// Snapshot of the viewport a heatmap query renders for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Viewport corners as the map reports them, longitudes in
    /// `[-180, 180]`.
    pub corners: Aoi,
    /// Longitude at the center of the viewport.
    pub draw_lng: f64,
    pub crosses_idl: bool,
    /// The map has stopped moving.
    pub settled: bool,
    /// Bumped by the map on every redraw.
    pub draw_version: u64,
    /// Map resolution in meters per pixel.
    pub map_resolution: f64,
    /// Grid size for full-resolution queries.
    pub full_resolution: Resolution,
}

impl ViewState {
    /// North-up, settled view over `corners`.
    pub fn settled(corners: Aoi, full_resolution: Resolution, map_resolution: f64) -> Self {
        let bounds = corners.bounds();
        Self {
            corners,
            draw_lng: (bounds.min_lon + bounds.max_lon) / 2.0,
            crosses_idl: false,
            settled: true,
            draw_version: 0,
            map_resolution,
            full_resolution,
        }
    }

    /// The AOI to query. Across the antimeridian the corners are unwrapped
    /// into the hemisphere of the view center.
    pub fn query_aoi(&self) -> Aoi {
        if self.crosses_idl {
            self.corners.wrapped_to(Hemisphere::of(self.draw_lng))
        } else {
            self.corners
        }
    }
}

/// Grid size and flags for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePlan {
    pub quick: bool,
    pub needs_refresh: bool,
    pub resolution: Resolution,
}

/// Choose between a quick and a full query.
///
/// A moving map gets quick queries. Once it settles the first query for a
/// new draw version is still quick but asks for a refresh; the refresh
/// runs at full resolution unless the map is zoomed out past
/// `quick_only_resolution`.
pub fn plan_query(config: &OverlayConfig, view: &ViewState, last_draw_version: Option<u64>) -> SamplePlan {
    let quick_only = view.map_resolution > config.quick_only_resolution;

    let (quick, needs_refresh) = if !view.settled {
        (true, false)
    } else if last_draw_version != Some(view.draw_version) {
        (true, true)
    } else {
        (quick_only, false)
    };

    let resolution = if quick {
        view.full_resolution.quick(config)
    } else {
        view.full_resolution
    };

    SamplePlan {
        quick,
        needs_refresh,
        resolution,
    }
}
