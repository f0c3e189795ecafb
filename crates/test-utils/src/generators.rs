//! Elevation grid generators.
//!
//! Grids are row-major `Vec<f32>` with row 0 at the north edge, matching
//! the layout produced by terrain queries.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates a grid with all values set to a constant.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with NaN values at the given `(col, row)` positions and
/// `fill` elsewhere.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    fill: f32,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![fill; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Flat terrain with a north-south ridge `distance` columns east of the
/// center column.
///
/// Useful for viewshed tests: everything behind the ridge (further east)
/// is shadowed when the ridge is taller than the observer.
pub fn create_ridge_grid(
    width: usize,
    height: usize,
    base: f32,
    ridge_height: f32,
    distance: usize,
) -> Vec<f32> {
    let mut data = vec![base; width * height];
    let col = width / 2 + distance;
    if col < width {
        for row in 0..height {
            data[row * width + col] = base + ridge_height;
        }
    }
    data
}

/// Terrain rising linearly eastward by `slope` meters per column.
pub fn create_ramp_grid(width: usize, height: usize, base: f32, slope: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(base + col as f32 * slope);
        }
    }
    data
}

/// Random terrain in `[min, max)` from a fixed seed.
pub fn create_random_grid(width: usize, height: usize, min: f32, max: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height).map(|_| rng.gen_range(min..max)).collect()
}
