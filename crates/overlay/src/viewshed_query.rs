//! Viewshed queries with incremental recomputation.
//!
//! A query moves through [`ViewshedStage::NeedsElevation`] (terrain load
//! and slope grid), [`ViewshedStage::NeedsVisibility`] (sweep and
//! coloring) and [`ViewshedStage::Done`]. A follow-up request only redoes
//! the stages its changes touch: opacity rewrites the alpha channel, the
//! circle mask re-runs the sweep, anything else starts over.

use std::sync::Arc;
use std::time::Instant;

use grid_processor::{ElevationGridService, QueryOutcome, QueryParams};
use serde::{Deserialize, Serialize};
use terrain_common::{Aoi, CancelToken, GeoPoint};
use tracing::{debug, info};
use viewshed::{ViewshedCalculator, ViewshedCell, ViewshedOutcome, ViewshedParams};

use crate::error::{OverlayError, Result};
use crate::worker::OverlayTask;

/// Observer and display parameters for one viewshed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewshedRequest {
    pub observer: GeoPoint,
    /// Eye height above the terrain in meters.
    pub observer_height_m: f64,
    pub radius_m: f64,
    /// `[0, 1]`.
    pub opacity: f32,
    /// Mask cells beyond `radius_m`.
    pub circle: bool,
    /// Edge of the square elevation grid.
    pub samples: usize,
}

impl ViewshedRequest {
    /// Request with a 2 m eye height, half opacity and no circle mask.
    pub fn new(observer: GeoPoint, radius_m: f64, samples: usize) -> Self {
        Self {
            observer,
            observer_height_m: 2.0,
            radius_m,
            opacity: 0.5,
            circle: false,
            samples,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples < 3 {
            return Err(OverlayError::invalid_request(format!(
                "viewshed needs at least 3 samples, got {}",
                self.samples
            )));
        }
        // The observer sits on the center post only for odd edges.
        if self.samples % 2 == 0 {
            return Err(OverlayError::invalid_request(format!(
                "viewshed samples must be odd, got {}",
                self.samples
            )));
        }
        if !(self.radius_m > 0.0 && self.radius_m.is_finite()) {
            return Err(OverlayError::invalid_request(format!(
                "radius must be positive, got {}",
                self.radius_m
            )));
        }
        if !self.observer_height_m.is_finite() {
            return Err(OverlayError::invalid_request("observer height must be finite"));
        }
        Ok(())
    }

    /// Square AOI centered on the observer whose outermost sample centers
    /// lie `radius_m` from it.
    pub fn aoi(&self) -> Aoi {
        let n = self.samples as f64;
        let half = self.radius_m * n / (n - 1.0);
        let o = self.observer;
        Aoi::new(
            o.offset(half, -half),
            o.offset(half, half),
            o.offset(-half, half),
            o.offset(-half, -half),
        )
    }

    pub fn params(&self) -> ViewshedParams {
        ViewshedParams {
            observer_height_m: self.observer_height_m,
            opacity: self.opacity,
            circle: self.circle,
            ..ViewshedParams::square(self.samples, self.radius_m)
        }
    }

    /// Same terrain and slope grid.
    fn same_terrain(&self, other: &Self) -> bool {
        self.observer == other.observer
            && self.observer_height_m == other.observer_height_m
            && self.radius_m == other.radius_m
            && self.samples == other.samples
    }

    /// Same classification; only the opacity may differ.
    fn same_visibility(&self, other: &Self) -> bool {
        self.same_terrain(other) && self.circle == other.circle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewshedStage {
    NeedsElevation,
    NeedsVisibility,
    Done,
}

/// Viewshed state for one overlay. Keeps the elevation grid, the slope
/// grid and the colored output between requests.
pub struct ViewshedQuery {
    service: Arc<ElevationGridService>,
    stage: ViewshedStage,
    calculator: ViewshedCalculator,
    grid: QueryParams,
    /// Request the current slope grid was computed for.
    slopes_for: Option<ViewshedRequest>,
    /// Request the current RGBA buffer shows.
    rendered: Option<ViewshedRequest>,
}

impl ViewshedQuery {
    pub fn new(service: Arc<ElevationGridService>) -> Self {
        Self {
            service,
            stage: ViewshedStage::NeedsElevation,
            calculator: ViewshedCalculator::new(),
            grid: QueryParams::default(),
            slopes_for: None,
            rendered: None,
        }
    }

    pub fn stage(&self) -> ViewshedStage {
        self.stage
    }

    /// Elevation grid and RGBA output of the last run.
    pub fn grid(&self) -> &QueryParams {
        &self.grid
    }

    pub fn calculator(&self) -> &ViewshedCalculator {
        &self.calculator
    }

    /// Bring the output up to date with `request`.
    pub fn run(&mut self, request: &ViewshedRequest, cancel: &CancelToken) -> Result<QueryOutcome> {
        request.validate()?;
        if cancel.is_canceled() {
            return Ok(QueryOutcome::Canceled);
        }

        if self.stage == ViewshedStage::Done {
            if let Some(rendered) = self.rendered.filter(|r| r.same_visibility(request)) {
                if rendered.opacity != request.opacity {
                    self.calculator.rewrite_alpha(request.opacity, &mut self.grid.rgba)?;
                    debug!(opacity = request.opacity, "Viewshed opacity updated");
                }
                self.rendered = Some(*request);
                return Ok(QueryOutcome::Complete);
            }
        }

        let start = Instant::now();
        let params = request.params();
        self.rendered = None;
        self.grid.valid = false;
        self.stage = match self.slopes_for {
            Some(previous) if previous.same_terrain(request) => ViewshedStage::NeedsVisibility,
            _ => ViewshedStage::NeedsElevation,
        };

        if self.stage == ViewshedStage::NeedsElevation {
            self.slopes_for = None;
            self.grid.aoi = request.aoi();
            self.grid.quick = false;
            self.grid.needs_refresh = false;
            self.grid.cancel = cancel.clone();
            self.grid.resize(request.samples, request.samples);

            if self.service.query_chunks(&mut self.grid)? == QueryOutcome::Canceled {
                return Ok(QueryOutcome::Canceled);
            }
            let outcome = self
                .calculator
                .calculate_slope_grid(&self.grid.elevation, &params, cancel)?;
            if outcome == ViewshedOutcome::Canceled {
                return Ok(QueryOutcome::Canceled);
            }
            self.slopes_for = Some(*request);
            self.stage = ViewshedStage::NeedsVisibility;
        }

        if self.calculator.sweep(&params, cancel)? == ViewshedOutcome::Canceled {
            return Ok(QueryOutcome::Canceled);
        }
        self.calculator.write_rgba(request.opacity, &mut self.grid.rgba)?;
        self.grid.valid = true;
        self.stage = ViewshedStage::Done;
        self.rendered = Some(*request);

        info!(
            samples = request.samples,
            radius_m = request.radius_m,
            seen = self.calculator.count(ViewshedCell::Seen),
            unseen = self.calculator.count(ViewshedCell::Unseen),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Viewshed query complete"
        );

        Ok(QueryOutcome::Complete)
    }
}

impl OverlayTask for ViewshedQuery {
    type Request = ViewshedRequest;

    fn execute(&mut self, request: &ViewshedRequest, output: &mut QueryParams) -> Result<QueryOutcome> {
        let cancel = output.cancel.clone();
        let outcome = self.run(request, &cancel)?;
        if outcome == QueryOutcome::Complete {
            let grid = &self.grid;
            output.resize(grid.width, grid.height);
            output.aoi = grid.aoi;
            output.quick = false;
            output.needs_refresh = false;
            output.min_elev = grid.min_elev;
            output.max_elev = grid.max_elev;
            output.num_samples = grid.num_samples;
            output.elevation.copy_from_slice(&grid.elevation[..grid.len()]);
            output.rgba.copy_from_slice(&grid.rgba[..4 * grid.len()]);
            output.valid = grid.valid;
        }
        Ok(outcome)
    }
}
