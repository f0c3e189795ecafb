//! Quad-to-quad projective transform.
//!
//! Follows Heckbert's construction: build the square-to-quad homography for
//! each quadrilateral, then compose `dst · src⁻¹`. Points use column
//! vectors `[x, y, 1]ᵀ`.

use nalgebra::{Matrix3, Vector3};
use terrain_common::{Aoi, BoundingBox};

use crate::error::ProjectionError;

/// Relative determinant below which a quad counts as collapsed.
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Projective mapping between two quadrilaterals and its inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadTransform {
    forward: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl QuadTransform {
    /// Map the corners of `src` onto the corners of `dst`, both given in
    /// the same winding order.
    pub fn quad_to_quad(src: &[(f64, f64); 4], dst: &[(f64, f64); 4]) -> Result<Self, ProjectionError> {
        let src_m = square_to_quad(src)?;
        let dst_m = square_to_quad(dst)?;

        let src_inv = src_m
            .try_inverse()
            .ok_or_else(|| ProjectionError::NonInvertible("source quad".to_string()))?;
        let forward = dst_m * src_inv;
        let inverse = forward
            .try_inverse()
            .ok_or_else(|| ProjectionError::NonInvertible("composed transform".to_string()))?;

        if !forward.iter().chain(inverse.iter()).all(|v| v.is_finite()) {
            return Err(ProjectionError::NonInvertible(
                "non-finite transform coefficients".to_string(),
            ));
        }

        Ok(Self { forward, inverse })
    }

    /// Geographic → image transform for an AOI drawn into a
    /// `width × height` grid. The upper-left corner lands on `(0, 0)` and
    /// the lower-right on `(width, height)`; `x` is longitude, `y` latitude.
    pub fn geo_to_image(aoi: &Aoi, width: usize, height: usize) -> Result<Self, ProjectionError> {
        let src = aoi.corners().map(|p| (p.longitude, p.latitude));
        let (w, h) = (width as f64, height as f64);
        let dst = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        Self::quad_to_quad(&src, &dst)
    }

    /// Apply the forward mapping.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.forward, x, y)
    }

    /// Apply the inverse mapping.
    pub fn inverse_transform(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.inverse, x, y)
    }

    /// Forward-map the corners of a box and return the axis-aligned
    /// `(min_x, min_y, max_x, max_y)` of the result.
    pub fn transform_bounds(&self, bbox: &BoundingBox) -> (f64, f64, f64, f64) {
        let corners = [
            (bbox.min_lon, bbox.min_lat),
            (bbox.max_lon, bbox.min_lat),
            (bbox.max_lon, bbox.max_lat),
            (bbox.min_lon, bbox.max_lat),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                let (tx, ty) = self.transform(x, y);
                (min_x.min(tx), min_y.min(ty), max_x.max(tx), max_y.max(ty))
            },
        )
    }
}

fn apply(m: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let p = m * Vector3::new(x, y, 1.0);
    (p.x / p.z, p.y / p.z)
}

/// Homography taking the unit square `(0,0) (1,0) (1,1) (0,1)` onto `q`.
fn square_to_quad(q: &[(f64, f64); 4]) -> Result<Matrix3<f64>, ProjectionError> {
    let [(x0, y0), (x1, y1), (x2, y2), (x3, y3)] = *q;

    let scale = q
        .iter()
        .map(|&(x, y)| (x - x0).abs().max((y - y0).abs()))
        .fold(0.0, f64::max);
    if !scale.is_finite() || scale == 0.0 {
        return Err(ProjectionError::NonInvertible(format!(
            "collapsed quad {:?}",
            q
        )));
    }

    let dx1 = x1 - x2;
    let dx2 = x3 - x2;
    let dx3 = x0 - x1 + x2 - x3;
    let dy1 = y1 - y2;
    let dy2 = y3 - y2;
    let dy3 = y0 - y1 + y2 - y3;

    let det = dx1 * dy2 - dx2 * dy1;
    if det.abs() <= DEGENERATE_EPSILON * scale * scale {
        return Err(ProjectionError::NonInvertible(format!(
            "collinear quad {:?}",
            q
        )));
    }

    let g = (dx3 * dy2 - dx2 * dy3) / det;
    let h = (dx1 * dy3 - dx3 * dy1) / det;

    #[rustfmt::skip]
    let m = Matrix3::new(
        x1 - x0 + g * x1, x3 - x0 + h * x3, x0,
        y1 - y0 + g * y1, y3 - y0 + h * y3, y0,
        g,                h,                1.0,
    );
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain_common::GeoPoint;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_north_up_aoi_is_linear() {
        let aoi = Aoi::from_bbox(&BoundingBox::new(-107.0, 35.0, -106.0, 36.0));
        let t = QuadTransform::geo_to_image(&aoi, 100, 50).unwrap();

        assert!(close(t.transform(-107.0, 36.0), (0.0, 0.0)));
        assert!(close(t.transform(-106.0, 35.0), (100.0, 50.0)));
        assert!(close(t.transform(-106.5, 35.5), (50.0, 25.0)));
        assert!(close(t.inverse_transform(25.0, 10.0), (-106.75, 35.8)));
    }

    #[test]
    fn test_trapezoid_corners_roundtrip() {
        let aoi = Aoi::new(
            GeoPoint::new(36.0, -106.8),
            GeoPoint::new(36.0, -106.2),
            GeoPoint::new(35.0, -106.0),
            GeoPoint::new(35.0, -107.0),
        );
        let t = QuadTransform::geo_to_image(&aoi, 64, 64).unwrap();

        assert!(close(t.transform(-106.8, 36.0), (0.0, 0.0)));
        assert!(close(t.transform(-106.2, 36.0), (64.0, 0.0)));
        assert!(close(t.transform(-106.0, 35.0), (64.0, 64.0)));
        assert!(close(t.transform(-107.0, 35.0), (0.0, 64.0)));

        let (x, y) = t.transform(-106.4, 35.3);
        assert!(close(t.inverse_transform(x, y), (-106.4, 35.3)));
    }

    #[test]
    fn test_duplicate_corners_fail() {
        let p = GeoPoint::new(10.0, 10.0);
        let aoi = Aoi::new(p, p, p, p);
        assert!(matches!(
            QuadTransform::geo_to_image(&aoi, 10, 10),
            Err(ProjectionError::NonInvertible(_))
        ));
    }

    #[test]
    fn test_collinear_corners_fail() {
        let aoi = Aoi::new(
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(11.0, 11.0),
            GeoPoint::new(12.0, 12.0),
            GeoPoint::new(13.0, 13.0),
        );
        assert!(QuadTransform::geo_to_image(&aoi, 10, 10).is_err());
    }

    #[test]
    fn test_zero_sized_image_fails() {
        let aoi = Aoi::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(QuadTransform::geo_to_image(&aoi, 0, 10).is_err());
    }

    #[test]
    fn test_transform_bounds() {
        let aoi = Aoi::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let t = QuadTransform::geo_to_image(&aoi, 10, 10).unwrap();
        let (min_x, min_y, max_x, max_y) =
            t.transform_bounds(&BoundingBox::new(0.2, 0.5, 0.4, 0.9));
        assert!((min_x - 2.0).abs() < 1e-9);
        assert!((max_x - 4.0).abs() < 1e-9);
        assert!((min_y - 1.0).abs() < 1e-9);
        assert!((max_y - 5.0).abs() < 1e-9);
    }
}
