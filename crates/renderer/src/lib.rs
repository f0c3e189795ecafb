//! Image rendering for terrain overlays.
//!
//! - Elevation heatmap coloring through a hue lookup table
//! - PNG encoding of the resulting RGBA buffers

pub mod gradient;
pub mod png;

pub use gradient::{update_rgba, Color, HeatmapSettings, HsvLut, LUT_SIZE};
pub use png::{create_png, create_png_auto, PngError};
