//! Terrain overlays: heatmap and viewshed queries run on a background
//! worker per overlay.
//!
//! - [`QueryOrchestrator`]: resolution policy, AOI, DTED vs. fallback
//!   sampling and heatmap coloring
//! - [`ViewshedQuery`]: staged viewshed recomputation
//! - [`OverlayWorker`]: worker thread with result publication on `poll`

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod viewshed_query;
pub mod worker;

pub use config::OverlayConfig;
pub use error::{OverlayError, Result};
pub use orchestrator::{Fallback, HeatmapRequest, QueryOrchestrator};
pub use state::{plan_query, Resolution, SamplePlan, ViewState};
pub use viewshed_query::{ViewshedQuery, ViewshedRequest, ViewshedStage};
pub use worker::{OverlayTask, OverlayWorker};
