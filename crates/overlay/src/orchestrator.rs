//! Heatmap query orchestration.
//!
//! Picks the grid resolution from the view state, builds the AOI, decides
//! between the DTED reader and a fallback elevation source, and colors the
//! resulting elevation grid.

use std::sync::Arc;
use std::time::Instant;

use grid_processor::{
    is_primary_only, query_fallback, ElevationGridService, ElevationSource, Geoid, QueryOutcome,
    QueryParams,
};
use renderer::{update_rgba, HeatmapSettings, HsvLut};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::state::{plan_query, SamplePlan, ViewState};
use crate::worker::OverlayTask;

/// Generic elevation source used where DTED does not cover the AOI.
#[derive(Clone)]
pub struct Fallback {
    pub source: Arc<dyn ElevationSource>,
    pub geoid: Arc<dyn Geoid>,
}

/// One heatmap render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapRequest {
    pub view: ViewState,
    pub settings: HeatmapSettings,
}

/// Runs heatmap queries for one overlay.
pub struct QueryOrchestrator {
    config: OverlayConfig,
    service: Arc<ElevationGridService>,
    fallback: Option<Fallback>,
    lut: HsvLut,
    last_draw_version: Option<u64>,
}

impl QueryOrchestrator {
    pub fn new(config: OverlayConfig, service: Arc<ElevationGridService>) -> Result<Self> {
        config.validate().map_err(OverlayError::Config)?;
        Ok(Self {
            config,
            service,
            fallback: None,
            lut: HsvLut::default(),
            last_draw_version: None,
        })
    }

    pub fn with_fallback(mut self, source: Arc<dyn ElevationSource>, geoid: Arc<dyn Geoid>) -> Self {
        self.fallback = Some(Fallback { source, geoid });
        self
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Size the buffers and set the query flags and AOI for `view`.
    pub fn prepare(&mut self, view: &ViewState, params: &mut QueryParams) -> SamplePlan {
        let plan = plan_query(&self.config, view, self.last_draw_version);
        self.last_draw_version = Some(view.draw_version);

        params.quick = plan.quick;
        params.needs_refresh = plan.needs_refresh;
        params.draw_version = view.draw_version;
        params.aoi = view.query_aoi();
        params.resize(plan.resolution.width, plan.resolution.height);
        plan
    }

    /// Whether every source under the AOI is DTED. Always true without a
    /// fallback.
    pub fn is_primary(&self, params: &QueryParams) -> bool {
        match &self.fallback {
            None => true,
            Some(fallback) => is_primary_only(&fallback.source.covering_types(&params.aoi)),
        }
    }

    /// Fill the elevation grid from DTED, or from the fallback source when
    /// DTED does not cover the whole AOI.
    pub fn query_elevation(&self, params: &mut QueryParams) -> Result<QueryOutcome> {
        match &self.fallback {
            Some(fallback) if !self.is_primary(params) => {
                if params.cancel.is_canceled() {
                    return Ok(QueryOutcome::Canceled);
                }
                debug!(aoi = ?params.aoi, "AOI not fully covered by DTED, using fallback source");
                params.reset();
                Ok(query_fallback(
                    params,
                    fallback.source.as_ref(),
                    fallback.geoid.as_ref(),
                    self.service.config().fallback_max_samples,
                )?)
            }
            _ => Ok(self.service.query(params)?),
        }
    }

    /// Full heatmap pass: plan, elevation query, coloring.
    ///
    /// On completion `params.valid` is set and `params.rgba` holds the
    /// colored grid. A canceled or failed query leaves `valid` unset.
    pub fn query_heatmap(&mut self, request: &HeatmapRequest, params: &mut QueryParams) -> Result<QueryOutcome> {
        let start = Instant::now();
        self.prepare(&request.view, params);

        if request.view.map_resolution > self.config.clear_resolution {
            if params.cancel.is_canceled() {
                return Ok(QueryOutcome::Canceled);
            }
            // Zoomed too far out to show terrain: publish an empty overlay.
            params.reset();
        } else {
            match self.query_elevation(params) {
                Ok(QueryOutcome::Complete) => {}
                Ok(QueryOutcome::Canceled) => return Ok(QueryOutcome::Canceled),
                Err(e) => {
                    params.valid = false;
                    return Err(e);
                }
            }
        }

        self.lut.validate(request.settings);
        let n = params.len();
        update_rgba(
            &self.lut,
            &params.elevation[..n],
            params.min_elev,
            params.max_elev,
            &mut params.rgba[..4 * n],
        );
        params.valid = true;

        info!(
            width = params.width,
            height = params.height,
            quick = params.quick,
            samples = params.num_samples,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Heatmap query complete"
        );

        Ok(QueryOutcome::Complete)
    }
}

impl OverlayTask for QueryOrchestrator {
    type Request = HeatmapRequest;

    fn execute(&mut self, request: &HeatmapRequest, output: &mut QueryParams) -> Result<QueryOutcome> {
        self.query_heatmap(request, output)
    }
}
