//! Interpolation of decoded posts onto output pixels.

use dted_parser::Chunk;

/// Fractional positions this far outside the grid are pulled back onto
/// its edge. Covers round-off from the inverse transform.
const EDGE_TOLERANCE: f64 = 1e-6;

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest grid points. Positions
/// outside the grid and blends with any NaN corner return NaN.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if width == 0 || height == 0 || !x.is_finite() || !y.is_finite() {
        return f32::NAN;
    }

    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;
    if x < -EDGE_TOLERANCE || y < -EDGE_TOLERANCE || x > max_x + EDGE_TOLERANCE || y > max_y + EDGE_TOLERANCE {
        return f32::NAN;
    }
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    // Handle NaN values - if any corner is NaN, return NaN
    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

/// Bilinear sample of a chunk at chunk-local pixel `(x, y)`.
pub fn sample_chunk(chunk: &Chunk, x: f64, y: f64) -> f32 {
    bilinear_interpolate(&chunk.values, chunk.width, chunk.height, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_at_grid_points() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 0.0), 1.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 0.0), 2.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 1.0), 3.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 1.0), 4.0);
    }

    #[test]
    fn test_center_blend() {
        let data = vec![0.0, 10.0, 20.0, 30.0];
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5), 15.0);
    }

    #[test]
    fn test_any_nan_corner_is_nan() {
        for i in 0..4 {
            let mut data = vec![5.0; 4];
            data[i] = f32::NAN;
            assert!(bilinear_interpolate(&data, 2, 2, 0.25, 0.75).is_nan());
        }
    }

    #[test]
    fn test_outside_is_nan() {
        let data = vec![1.0; 9];
        assert!(bilinear_interpolate(&data, 3, 3, -0.5, 1.0).is_nan());
        assert!(bilinear_interpolate(&data, 3, 3, 1.0, 2.5).is_nan());
        assert_eq!(bilinear_interpolate(&data, 3, 3, -1e-9, 2.0 + 1e-9), 1.0);
    }
}
