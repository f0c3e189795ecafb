//! Radial horizon sweep.
//!
//! ```text
//!            ring R (8R perimeter cells, one ray each)
//!        ┌─────────────────────┐
//!        │  ┌───────────────┐  │
//!        │  │   ┌───────┐   │  │
//!        │  │   │   O   │   │  │   O = observer at (w/2, h/2)
//!        │  │   └───────┘   │  │
//!        │  └───────────────┘  │
//!        └─────────────────────┘
//! ```
//!
//! Pass 1 computes the [`SlopeAngle`] of every cell ring by ring. Pass 2
//! walks all rays outward one stage at a time; each ray keeps the highest
//! slope it has seen so far, and a cell is visible when its slope reaches
//! that horizon.

use serde::{Deserialize, Serialize};
use terrain_common::CancelToken;
use tracing::debug;

use crate::error::{Result, ViewshedError};
use crate::slope::SlopeAngle;
use renderer::Color;

/// Visible cell color before opacity.
pub const SEEN_COLOR: Color = Color::new(0, 255, 0, 255);

/// Hidden cell color before opacity.
pub const UNSEEN_COLOR: Color = Color::new(255, 0, 0, 255);

/// Visibility of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ViewshedCell {
    /// No data, beyond the outermost ring, or outside the circle.
    #[default]
    OutsideRange,
    Unseen,
    Seen,
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewshedOutcome {
    Complete,
    /// Results are partial and must be discarded.
    Canceled,
}

/// Observer and grid geometry for one viewshed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewshedParams {
    pub width: usize,
    pub height: usize,
    /// Meters between adjacent columns.
    pub col_spacing_m: f64,
    /// Meters between adjacent rows.
    pub row_spacing_m: f64,
    /// Eye height above the terrain at the center cell.
    pub observer_height_m: f64,
    pub radius_m: f64,
    /// `[0, 1]`, applied to seen and unseen cells.
    pub opacity: f32,
    /// Mask cells farther than `radius_m` as out of range.
    pub circle: bool,
}

impl ViewshedParams {
    /// Square grid of `samples × samples` spanning `2 * radius_m`, so that
    /// the outermost cells sit exactly `radius_m` from the center.
    pub fn square(samples: usize, radius_m: f64) -> Self {
        let spacing = if samples > 1 {
            2.0 * radius_m / (samples - 1) as f64
        } else {
            radius_m.max(1.0)
        };
        Self {
            width: samples,
            height: samples,
            col_spacing_m: spacing,
            row_spacing_m: spacing,
            observer_height_m: 2.0,
            radius_m,
            opacity: 0.5,
            circle: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ViewshedError::EmptyGrid);
        }
        if !(self.col_spacing_m > 0.0 && self.row_spacing_m > 0.0) {
            return Err(ViewshedError::InvalidSpacing {
                col: self.col_spacing_m,
                row: self.row_spacing_m,
            });
        }
        Ok(())
    }
}

/// Axis a ray advances along one cell per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Major {
    X,
    Y,
}

/// One ray from the observer to a perimeter cell of the outermost ring.
#[derive(Debug, Clone, Copy)]
struct Ray {
    major: Major,
    /// `±1` along the major axis.
    sign: i64,
    /// Minor offset per major step (`rise / run`).
    tangent: f64,
}

impl Ray {
    /// Ray towards perimeter offset `(dx, dy)` of ring `rings`.
    fn towards(dx: i64, dy: i64, rings: usize, major: Major) -> Self {
        let r = rings as f64;
        match major {
            Major::Y => Self {
                major,
                sign: dy.signum(),
                tangent: dx as f64 / r,
            },
            Major::X => Self {
                major,
                sign: dx.signum(),
                tangent: dy as f64 / r,
            },
        }
    }

    /// Offset from the center at stage `k`.
    fn offset(&self, k: usize) -> (i64, i64) {
        let major = self.sign * k as i64;
        let minor = (k as f64 * self.tangent).round() as i64;
        match self.major {
            Major::X => (major, minor),
            Major::Y => (minor, major),
        }
    }
}

/// Cells of ring `k` as offsets from the center, in four quarters of `2k`
/// cells: top (west to east), right (north to south), bottom (east to
/// west), left (south to north).
fn ring_offsets(k: usize) -> impl Iterator<Item = (i64, i64, Major)> {
    let k = k as i64;
    let top = (-k..k).map(move |i| (i, -k, Major::Y));
    let right = (-k..k).map(move |i| (k, i, Major::X));
    let bottom = (-k..k).map(move |i| (-i, k, Major::Y));
    let left = (-k..k).map(move |i| (-k, -i, Major::X));
    top.chain(right).chain(bottom).chain(left)
}

/// Reusable viewshed state for one renderable.
///
/// The slope grid survives between runs so that a change of circle mode or
/// opacity does not recompute it.
#[derive(Debug, Default)]
pub struct ViewshedCalculator {
    width: usize,
    height: usize,
    rings: usize,
    observer_alt: f64,
    slopes: Vec<Option<SlopeAngle>>,
    cells: Vec<ViewshedCell>,
    rays: Vec<Ray>,
    horizons: Vec<SlopeAngle>,
}

impl ViewshedCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of rings around the center: `min(w/2, h/2)`.
    pub fn rings(&self) -> usize {
        self.rings
    }

    /// Terrain at the center plus eye height.
    pub fn observer_altitude(&self) -> f64 {
        self.observer_alt
    }

    pub fn cells(&self) -> &[ViewshedCell] {
        &self.cells
    }

    pub fn cell(&self, x: usize, y: usize) -> ViewshedCell {
        self.cells[y * self.width + x]
    }

    pub fn slope(&self, x: usize, y: usize) -> Option<SlopeAngle> {
        self.slopes[y * self.width + x]
    }

    fn center(&self) -> (i64, i64) {
        ((self.width / 2) as i64, (self.height / 2) as i64)
    }

    /// Grid index of a center offset, if inside the grid.
    fn index_of(&self, dx: i64, dy: i64) -> Option<usize> {
        let (cx, cy) = self.center();
        let (x, y) = (cx + dx, cy + dy);
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Pass 1: slope of every cell up to ring `min(w/2, h/2)`.
    ///
    /// Cells with NaN elevation, and cells beyond the outermost ring, get
    /// no slope. Cancellation is checked before each ring.
    pub fn calculate_slope_grid(
        &mut self,
        elevation: &[f32],
        params: &ViewshedParams,
        cancel: &CancelToken,
    ) -> Result<ViewshedOutcome> {
        params.validate()?;
        let n = params.width * params.height;
        if elevation.len() < n {
            return Err(ViewshedError::GridSize {
                expected: n,
                actual: elevation.len(),
            });
        }

        self.width = params.width;
        self.height = params.height;
        self.rings = (params.width / 2).min(params.height / 2);
        self.slopes.clear();
        self.slopes.resize(n, None);

        let (cx, cy) = self.center();
        let center_elev = elevation[cy as usize * self.width + cx as usize];
        if center_elev.is_nan() {
            return Err(ViewshedError::NoObserverElevation);
        }
        self.observer_alt = center_elev as f64 + params.observer_height_m;

        for k in 1..=self.rings {
            if cancel.is_canceled() {
                return Ok(ViewshedOutcome::Canceled);
            }
            for (dx, dy, _) in ring_offsets(k) {
                let Some(index) = self.index_of(dx, dy) else {
                    continue;
                };
                let distance = (dx as f64 * params.col_spacing_m)
                    .hypot(dy as f64 * params.row_spacing_m);
                let delta = elevation[index] as f64 - self.observer_alt;
                self.slopes[index] = SlopeAngle::new(delta, distance);
            }
        }

        Ok(ViewshedOutcome::Complete)
    }

    /// Pass 2: classify every cell from the slope grid.
    ///
    /// All `8R` rays advance together one ring per stage; cancellation is
    /// checked before each stage. Must follow a completed
    /// [`calculate_slope_grid`](Self::calculate_slope_grid) for the same
    /// grid size.
    pub fn sweep(&mut self, params: &ViewshedParams, cancel: &CancelToken) -> Result<ViewshedOutcome> {
        params.validate()?;
        if params.width != self.width || params.height != self.height {
            return Err(ViewshedError::GridSize {
                expected: self.width * self.height,
                actual: params.width * params.height,
            });
        }

        self.cells.clear();
        self.cells.resize(self.width * self.height, ViewshedCell::OutsideRange);

        let rings = self.rings;
        self.rays.clear();
        if rings > 0 {
            self.rays
                .extend(ring_offsets(rings).map(|(dx, dy, major)| Ray::towards(dx, dy, rings, major)));
        }
        self.horizons.clear();
        self.horizons.resize(self.rays.len(), SlopeAngle::NADIR);

        let radius_sq = params.radius_m * params.radius_m;

        for k in 1..=rings {
            if cancel.is_canceled() {
                return Ok(ViewshedOutcome::Canceled);
            }

            for r in 0..self.rays.len() {
                let (dx, dy) = self.rays[r].offset(k);
                let Some(index) = self.index_of(dx, dy) else {
                    continue;
                };
                let Some(slope) = self.slopes[index] else {
                    continue;
                };

                if params.circle {
                    let ex = dx as f64 * params.col_spacing_m;
                    let ey = dy as f64 * params.row_spacing_m;
                    if ex * ex + ey * ey > radius_sq {
                        continue;
                    }
                }

                if slope.clears(self.horizons[r]) {
                    self.horizons[r] = slope;
                    self.cells[index] = ViewshedCell::Seen;
                } else if self.cells[index] != ViewshedCell::Seen {
                    self.cells[index] = ViewshedCell::Unseen;
                }
            }
        }

        if let Some(center) = self.index_of(0, 0) {
            self.cells[center] = if params.circle {
                ViewshedCell::OutsideRange
            } else {
                ViewshedCell::Seen
            };
        }

        let seen = self.count(ViewshedCell::Seen);
        let unseen = self.count(ViewshedCell::Unseen);
        debug!(
            width = self.width,
            height = self.height,
            rings,
            seen,
            unseen,
            circle = params.circle,
            "Viewshed sweep complete"
        );

        Ok(ViewshedOutcome::Complete)
    }

    /// Both passes followed by coloring into `rgba`.
    pub fn calculate(
        &mut self,
        elevation: &[f32],
        params: &ViewshedParams,
        cancel: &CancelToken,
        rgba: &mut [u8],
    ) -> Result<ViewshedOutcome> {
        if self.calculate_slope_grid(elevation, params, cancel)? == ViewshedOutcome::Canceled {
            return Ok(ViewshedOutcome::Canceled);
        }
        if self.sweep(params, cancel)? == ViewshedOutcome::Canceled {
            return Ok(ViewshedOutcome::Canceled);
        }
        self.write_rgba(params.opacity, rgba)?;
        Ok(ViewshedOutcome::Complete)
    }

    /// Number of cells with the given tag.
    pub fn count(&self, tag: ViewshedCell) -> usize {
        self.cells.iter().filter(|&&c| c == tag).count()
    }

    /// Color the classified cells: seen green, unseen red, both at
    /// `opacity`; out-of-range cells transparent.
    pub fn write_rgba(&self, opacity: f32, rgba: &mut [u8]) -> Result<()> {
        self.check_rgba(rgba)?;
        let alpha = opacity_to_alpha(opacity);
        for (pixel, cell) in rgba.chunks_exact_mut(4).zip(&self.cells) {
            let color = match cell {
                ViewshedCell::Seen => Color { a: alpha, ..SEEN_COLOR },
                ViewshedCell::Unseen => Color { a: alpha, ..UNSEEN_COLOR },
                ViewshedCell::OutsideRange => Color::transparent(),
            };
            pixel.copy_from_slice(&color.to_array());
        }
        Ok(())
    }

    /// Change only the alpha channel of seen and unseen cells.
    pub fn rewrite_alpha(&self, opacity: f32, rgba: &mut [u8]) -> Result<()> {
        self.check_rgba(rgba)?;
        let alpha = opacity_to_alpha(opacity);
        for (pixel, cell) in rgba.chunks_exact_mut(4).zip(&self.cells) {
            if *cell != ViewshedCell::OutsideRange {
                pixel[3] = alpha;
            }
        }
        Ok(())
    }

    fn check_rgba(&self, rgba: &[u8]) -> Result<()> {
        let expected = 4 * self.cells.len();
        if rgba.len() < expected {
            return Err(ViewshedError::GridSize {
                expected,
                actual: rgba.len(),
            });
        }
        Ok(())
    }
}

fn opacity_to_alpha(opacity: f32) -> u8 {
    (255.0 * opacity.clamp(0.0, 1.0)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn flat(w: usize, h: usize, meters: f32) -> Vec<f32> {
        vec![meters; w * h]
    }

    #[test]
    fn test_ring_offsets_cover_perimeter() {
        for k in 1..6 {
            let offsets: Vec<_> = ring_offsets(k).collect();
            assert_eq!(offsets.len(), 8 * k);

            let mut unique: Vec<_> = offsets.iter().map(|&(x, y, _)| (x, y)).collect();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), 8 * k);

            let k = k as i64;
            assert!(unique.iter().all(|&(x, y)| x.abs().max(y.abs()) == k));
        }
    }

    #[test]
    fn test_ray_reaches_its_perimeter_cell() {
        let rings = 7;
        for (dx, dy, major) in ring_offsets(rings) {
            let ray = Ray::towards(dx, dy, rings, major);
            assert_eq!(ray.offset(rings), (dx, dy));
        }
    }

    #[test]
    fn test_rays_visit_every_inner_cell() {
        let rings = 9;
        let rays: Vec<_> = ring_offsets(rings)
            .map(|(dx, dy, m)| Ray::towards(dx, dy, rings, m))
            .collect();
        for k in 1..=rings {
            let visited: std::collections::HashSet<_> = rays.iter().map(|r| r.offset(k)).collect();
            for (dx, dy, _) in ring_offsets(k) {
                assert!(visited.contains(&(dx, dy)), "ring {} cell ({}, {})", k, dx, dy);
            }
        }
    }

    #[test]
    fn test_even_grid_skips_cells_past_edge() {
        let params = ViewshedParams::square(10, 100.0);
        let mut calc = ViewshedCalculator::new();
        let cancel = CancelToken::new();
        calc.calculate_slope_grid(&flat(10, 10, 5.0), &params, &cancel).unwrap();
        calc.sweep(&params, &cancel).unwrap();

        assert_eq!(calc.rings(), 5);
        // Ring 5 only exists on the north and west sides.
        assert_eq!(calc.cell(0, 0), ViewshedCell::Seen);
        assert_eq!(calc.count(ViewshedCell::Unseen), 0);
        assert_eq!(calc.count(ViewshedCell::Seen), 100);
    }

    /// Every unseen cell is blocked on every ray through it by a strictly
    /// higher earlier slope; every seen cell has at least one ray with no
    /// such blocker.
    #[test]
    fn test_random_terrain_matches_horizon_definition() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            let (w, h) = (rng.gen_range(5..30), rng.gen_range(5..30));
            let elevation: Vec<f32> = (0..w * h).map(|_| rng.gen_range(0.0..200.0)).collect();
            let params = ViewshedParams {
                width: w,
                height: h,
                col_spacing_m: 30.0,
                row_spacing_m: 25.0,
                observer_height_m: 2.0,
                radius_m: 1e6,
                opacity: 1.0,
                circle: false,
            };

            let mut calc = ViewshedCalculator::new();
            let cancel = CancelToken::new();
            calc.calculate_slope_grid(&elevation, &params, &cancel).unwrap();
            calc.sweep(&params, &cancel).unwrap();

            let mut clear_on_some_ray = vec![false; w * h];
            for ray in calc.rays.clone() {
                let mut highest = SlopeAngle::NADIR;
                for k in 1..=calc.rings {
                    let (dx, dy) = ray.offset(k);
                    let Some(index) = calc.index_of(dx, dy) else {
                        continue;
                    };
                    let Some(slope) = calc.slopes[index] else {
                        continue;
                    };
                    if slope.clears(highest) {
                        clear_on_some_ray[index] = true;
                        highest = slope;
                    }
                }
            }

            let (cx, cy) = (w / 2, h / 2);
            for i in 0..w * h {
                if i == cy * w + cx || calc.slopes[i].is_none() {
                    continue;
                }
                let expected = if clear_on_some_ray[i] {
                    ViewshedCell::Seen
                } else {
                    ViewshedCell::Unseen
                };
                assert_eq!(calc.cells[i], expected, "cell {} of {}x{}", i, w, h);
            }
        }
    }
}
