//! Common test fixtures for terrain tests.

use terrain_common::{Aoi, BoundingBox, GeoPoint};

/// Common bounding box definitions for testing, as
/// `(min_lon, min_lat, max_lon, max_lat)`.
pub mod bbox {
    /// Interior of the cell with south-west corner (35, -107).
    pub const ALBUQUERQUE: (f64, f64, f64, f64) = (-106.9, 35.1, -106.6, 35.4);

    /// Straddles four cells around (35, -107).
    pub const FOUR_CELLS: (f64, f64, f64, f64) = (-107.25, 34.75, -106.75, 35.25);

    /// Crosses the antimeridian; longitudes already unwrapped eastward.
    pub const ANTIMERIDIAN: (f64, f64, f64, f64) = (179.5, 10.1, 180.5, 10.9);
}

/// North-up AOI from a fixture tuple.
pub fn aoi_from(bbox: (f64, f64, f64, f64)) -> Aoi {
    Aoi::from_bbox(&BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3))
}

/// AOI whose corners are all the same point.
pub fn degenerate_aoi(lat: f64, lon: f64) -> Aoi {
    let p = GeoPoint::new(lat, lon);
    Aoi::new(p, p, p, p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aoi_from() {
        let aoi = aoi_from(bbox::ALBUQUERQUE);
        assert_eq!(aoi.upper_left, GeoPoint::new(35.4, -106.9));
        assert_eq!(aoi.lower_right, GeoPoint::new(35.1, -106.6));
    }
}
