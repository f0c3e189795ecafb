//! Terrain overlay renderer.
//!
//! Renders one elevation heatmap or viewshed from local DTED cells into a
//! PNG, optionally with a JSON summary of the query.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use grid_processor::{ElevationGridService, GridProcessorConfig, QueryOutcome, QueryParams};
use overlay::{
    HeatmapRequest, OverlayConfig, QueryOrchestrator, Resolution, ViewState, ViewshedQuery,
    ViewshedRequest,
};
use renderer::{create_png_auto, HeatmapSettings};
use terrain_common::{Aoi, BoundingBox, CancelToken, GeoPoint};
use viewshed::ViewshedCell;

#[derive(Parser, Debug)]
#[command(name = "terrain-render")]
#[command(about = "Render DTED terrain overlays to PNG")]
struct Args {
    /// DTED storage root; repeat for several. Defaults to DTED_PATHS.
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Output PNG path
    #[arg(short, long)]
    output: PathBuf,

    /// Also write a JSON summary here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Elevation heatmap over a bounding box
    Heatmap {
        /// minlon,minlat,maxlon,maxlat
        #[arg(long, allow_hyphen_values = true)]
        bbox: String,

        #[arg(long, default_value = "256")]
        width: usize,

        #[arg(long, default_value = "256")]
        height: usize,

        /// Stop after the quick low-resolution pass
        #[arg(long)]
        quick: bool,

        #[arg(long, default_value = "0.5")]
        alpha: f32,

        #[arg(long, default_value = "1.0")]
        saturation: f32,

        #[arg(long, default_value = "1.0")]
        value: f32,
    },

    /// Line-of-sight visibility around an observer
    Viewshed {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Radius in meters
        #[arg(long, default_value = "5000")]
        radius: f64,

        /// Grid edge in samples, odd. Defaults to VIEWSHED_SAMPLES or 201.
        #[arg(long)]
        samples: Option<usize>,

        /// Eye height above the terrain in meters
        #[arg(long, default_value = "2.0")]
        observer_height: f64,

        #[arg(long, default_value = "0.5")]
        opacity: f32,

        /// Mask cells beyond the radius
        #[arg(long)]
        circle: bool,
    },
}

#[derive(Serialize, Debug)]
struct RenderSummary {
    kind: &'static str,
    width: usize,
    height: usize,
    corners: Aoi,
    num_samples: usize,
    min_elev: f32,
    max_elev: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seen: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unseen: Option<usize>,
    elapsed_ms: u64,
}

impl RenderSummary {
    fn from_params(kind: &'static str, params: &QueryParams, start: Instant) -> Self {
        Self {
            kind,
            width: params.width,
            height: params.height,
            corners: params.aoi,
            num_samples: params.num_samples,
            min_elev: params.min_elev,
            max_elev: params.max_elev,
            seen: None,
            unseen: None,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut grid_config = GridProcessorConfig::from_env();
    if !args.roots.is_empty() {
        grid_config = grid_config.with_search_roots(args.roots.clone());
    }
    if grid_config.search_roots.is_empty() {
        bail!("no DTED roots given; pass --root or set DTED_PATHS");
    }
    let overlay_config = OverlayConfig::from_env();

    info!(roots = ?grid_config.search_roots, "Scanning DTED coverage");
    let service = Arc::new(ElevationGridService::with_scanned_coverage(grid_config)?);

    let start = Instant::now();
    let (params, summary) = match args.command {
        Command::Heatmap {
            ref bbox,
            width,
            height,
            quick,
            alpha,
            saturation,
            value,
        } => {
            let bbox = BoundingBox::parse(bbox).with_context(|| format!("invalid bbox '{bbox}'"))?;
            let settings = HeatmapSettings {
                alpha,
                saturation,
                value,
            };
            render_heatmap(overlay_config, service, &bbox, Resolution::new(width, height), quick, settings, start)?
        }
        Command::Viewshed {
            lat,
            lon,
            radius,
            samples,
            observer_height,
            opacity,
            circle,
        } => {
            let request = ViewshedRequest {
                observer_height_m: observer_height,
                opacity,
                circle,
                ..ViewshedRequest::new(
                    GeoPoint::new(lat, lon),
                    radius,
                    samples.unwrap_or(overlay_config.viewshed_samples),
                )
            };
            render_viewshed(service, &request, start)?
        }
    };

    let png = create_png_auto(&params.rgba, params.width, params.height)?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), size = png.len(), "PNG written");

    if let Some(path) = &args.summary {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

fn render_heatmap(
    config: OverlayConfig,
    service: Arc<ElevationGridService>,
    bbox: &BoundingBox,
    resolution: Resolution,
    quick_only: bool,
    settings: HeatmapSettings,
    start: Instant,
) -> Result<(QueryParams, RenderSummary)> {
    let corners = Aoi::from_bbox(bbox);
    let map_resolution = corners.lower_left.distance_to(&corners.lower_right) / resolution.width.max(1) as f64;
    let request = HeatmapRequest {
        view: ViewState::settled(corners, resolution, map_resolution),
        settings,
    };

    let mut orchestrator = QueryOrchestrator::new(config, service)?;
    let mut params = QueryParams::default();
    loop {
        orchestrator.query_heatmap(&request, &mut params)?;
        if quick_only || !params.needs_refresh {
            break;
        }
    }

    info!(
        width = params.width,
        height = params.height,
        samples = params.num_samples,
        min_elev = params.min_elev,
        max_elev = params.max_elev,
        "Heatmap rendered"
    );

    let summary = RenderSummary::from_params("heatmap", &params, start);
    Ok((params, summary))
}

fn render_viewshed(
    service: Arc<ElevationGridService>,
    request: &ViewshedRequest,
    start: Instant,
) -> Result<(QueryParams, RenderSummary)> {
    let mut query = ViewshedQuery::new(service);
    if query.run(request, &CancelToken::new())? != QueryOutcome::Complete {
        bail!("viewshed query did not complete");
    }

    let calc = query.calculator();
    let seen = calc.count(ViewshedCell::Seen);
    let unseen = calc.count(ViewshedCell::Unseen);
    info!(seen, unseen, "Viewshed rendered");

    let params = query.grid().clone();
    let summary = RenderSummary {
        seen: Some(seen),
        unseen: Some(unseen),
        ..RenderSummary::from_params("viewshed", &params, start)
    };
    Ok((params, summary))
}
