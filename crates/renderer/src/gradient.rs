//! Elevation heatmap coloring through a hue lookup table.
//!
//! Low elevations map to blue-violet, high elevations to red. The table is
//! rebuilt only when the heatmap's alpha, saturation or value changes.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of LUT entries.
pub const LUT_SIZE: usize = 256;

/// Pixels per parallel work item in [`update_rgba`].
const PARALLEL_CHUNK_PIXELS: usize = 4096;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    /// From HSV: hue in degrees, saturation and value in `[0, 1]`.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32, alpha: u8) -> Self {
        let h = hue.rem_euclid(360.0);
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match h {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_byte = |f: f32| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(to_byte(r), to_byte(g), to_byte(b), alpha)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Heatmap appearance, passed with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSettings {
    /// Overall opacity in `[0, 1]`.
    pub alpha: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            saturation: 1.0,
            value: 1.0,
        }
    }
}

/// 256-entry hue table.
///
/// Entry `i` has hue `(1 - i/255) * 255` degrees, so index 0 (lowest
/// elevation) is blue-violet and index 255 is red.
#[derive(Debug, Clone)]
pub struct HsvLut {
    entries: [Color; LUT_SIZE],
    settings: Option<HeatmapSettings>,
}

impl Default for HsvLut {
    fn default() -> Self {
        Self {
            entries: [Color::transparent(); LUT_SIZE],
            settings: None,
        }
    }
}

impl HsvLut {
    pub fn new(settings: HeatmapSettings) -> Self {
        let mut lut = Self::default();
        lut.validate(settings);
        lut
    }

    /// Rebuild if `settings` differ from the ones the table was built for.
    /// Returns whether a rebuild happened.
    pub fn validate(&mut self, settings: HeatmapSettings) -> bool {
        if self.settings == Some(settings) {
            return false;
        }

        let alpha = (255.0 * settings.alpha.clamp(0.0, 1.0)) as u8;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            let hue = (1.0 - i as f32 / (LUT_SIZE - 1) as f32) * 255.0;
            *entry = Color::from_hsv(hue, settings.saturation, settings.value, alpha);
        }
        self.settings = Some(settings);
        true
    }

    pub fn settings(&self) -> Option<HeatmapSettings> {
        self.settings
    }

    pub fn entry(&self, index: usize) -> Color {
        self.entries[index.min(LUT_SIZE - 1)]
    }

    /// Color for an elevation within `[min, max]`. NaN is transparent.
    pub fn color_for(&self, elevation: f32, min: f32, max: f32) -> Color {
        if elevation.is_nan() {
            return Color::transparent();
        }
        self.entries[lut_index(elevation, min, max)]
    }
}

/// LUT index of an elevation. A degenerate range maps to 0.
fn lut_index(elevation: f32, min: f32, max: f32) -> usize {
    let t = (elevation - min) / (max - min) * (LUT_SIZE - 1) as f32;
    if t.is_nan() {
        0
    } else {
        t.clamp(0.0, (LUT_SIZE - 1) as f32) as usize
    }
}

/// Color an elevation grid into `rgba` (4 bytes per value).
///
/// NaN values become fully transparent black.
pub fn update_rgba(lut: &HsvLut, elevation: &[f32], min: f32, max: f32, rgba: &mut [u8]) {
    let n = elevation.len().min(rgba.len() / 4);

    rgba[..4 * n]
        .par_chunks_mut(4 * PARALLEL_CHUNK_PIXELS)
        .zip(elevation[..n].par_chunks(PARALLEL_CHUNK_PIXELS))
        .for_each(|(out, values)| {
            for (pixel, &e) in out.chunks_exact_mut(4).zip(values) {
                pixel.copy_from_slice(&lut.color_for(e, min, max).to_array());
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(Color::from_hsv(0.0, 1.0, 1.0, 255), Color::new(255, 0, 0, 255));
        assert_eq!(Color::from_hsv(120.0, 1.0, 1.0, 255), Color::new(0, 255, 0, 255));
        assert_eq!(Color::from_hsv(240.0, 1.0, 1.0, 255), Color::new(0, 0, 255, 255));
        assert_eq!(Color::from_hsv(60.0, 0.0, 1.0, 7), Color::new(255, 255, 255, 7));
    }

    #[test]
    fn test_lut_index_clamps() {
        assert_eq!(lut_index(-10.0, 0.0, 100.0), 0);
        assert_eq!(lut_index(1000.0, 0.0, 100.0), 255);
        assert_eq!(lut_index(100.0, 0.0, 100.0), 255);
        assert_eq!(lut_index(50.0, 50.0, 50.0), 0);
    }

    #[test]
    fn test_validate_rebuilds_only_on_change() {
        let settings = HeatmapSettings::default();
        let mut lut = HsvLut::new(settings);
        assert!(!lut.validate(settings));
        assert!(lut.validate(HeatmapSettings {
            alpha: 1.0,
            ..settings
        }));
        assert_eq!(lut.entry(0).a, 255);
    }
}
