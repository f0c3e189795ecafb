//! Area of interest: the four-corner footprint of one query.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::geo::{GeoPoint, Hemisphere};

/// Four geographic corners, in image order: upper-left, upper-right,
/// lower-right, lower-left.
///
/// The corners need not form an axis-aligned rectangle; a rotated or
/// tilted viewport yields a general quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aoi {
    pub upper_left: GeoPoint,
    pub upper_right: GeoPoint,
    pub lower_right: GeoPoint,
    pub lower_left: GeoPoint,
}

impl Aoi {
    pub fn new(
        upper_left: GeoPoint,
        upper_right: GeoPoint,
        lower_right: GeoPoint,
        lower_left: GeoPoint,
    ) -> Self {
        Self {
            upper_left,
            upper_right,
            lower_right,
            lower_left,
        }
    }

    /// North-up AOI covering a bounding box.
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            upper_left: GeoPoint::new(bbox.max_lat, bbox.min_lon),
            upper_right: GeoPoint::new(bbox.max_lat, bbox.max_lon),
            lower_right: GeoPoint::new(bbox.min_lat, bbox.max_lon),
            lower_left: GeoPoint::new(bbox.min_lat, bbox.min_lon),
        }
    }

    /// Corners in image order.
    pub fn corners(&self) -> [GeoPoint; 4] {
        [
            self.upper_left,
            self.upper_right,
            self.lower_right,
            self.lower_left,
        ]
    }

    pub fn min_latitude(&self) -> f64 {
        self.corners()
            .iter()
            .map(|p| p.latitude)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_latitude(&self) -> f64 {
        self.corners()
            .iter()
            .map(|p| p.latitude)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_longitude(&self) -> f64 {
        self.corners()
            .iter()
            .map(|p| p.longitude)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_longitude(&self) -> f64 {
        self.corners()
            .iter()
            .map(|p| p.longitude)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Axis-aligned bounds of the four corners.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_longitude(),
            self.min_latitude(),
            self.max_longitude(),
            self.max_latitude(),
        )
    }

    /// Distance in meters from the lower-left to the upper-right corner.
    /// Drives detail-level selection.
    pub fn coverage_distance(&self) -> f64 {
        self.lower_left.distance_to(&self.upper_right)
    }

    /// Unwraps every corner into one hemisphere so an antimeridian-crossing
    /// AOI has monotonic longitudes.
    pub fn wrapped_to(&self, hemisphere: Hemisphere) -> Self {
        Self {
            upper_left: self.upper_left.wrapped_to(hemisphere),
            upper_right: self.upper_right.wrapped_to(hemisphere),
            lower_right: self.lower_right.wrapped_to(hemisphere),
            lower_left: self.lower_left.wrapped_to(hemisphere),
        }
    }
}
