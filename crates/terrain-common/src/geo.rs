//! Geographic points and longitude wrapping.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Meters per degree of latitude on the mean sphere.
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// East or west of the prime meridian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    East,
    West,
}

impl Hemisphere {
    /// Hemisphere a longitude falls in; negative longitudes are west.
    pub fn of(longitude: f64) -> Self {
        if longitude < 0.0 {
            Self::West
        } else {
            Self::East
        }
    }
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle (haversine) distance in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    /// Moves the point by a local north/east offset in meters.
    ///
    /// Uses an equirectangular approximation, which is adequate for the
    /// few-kilometer radii a viewshed covers.
    pub fn offset(&self, north_m: f64, east_m: f64) -> GeoPoint {
        let lat = self.latitude + north_m / METERS_PER_DEGREE;
        let lon = self.longitude + east_m / meters_per_degree_lon(self.latitude);
        GeoPoint::new(lat, lon)
    }

    /// Returns this point with its longitude unwrapped into `hemisphere`.
    ///
    /// A viewport that straddles the antimeridian is described with
    /// longitudes beyond ±180 on one side so that its corners stay
    /// monotonic.
    pub fn wrapped_to(&self, hemisphere: Hemisphere) -> GeoPoint {
        let longitude = match hemisphere {
            Hemisphere::West if self.longitude > 0.0 => self.longitude - 360.0,
            Hemisphere::East if self.longitude < 0.0 => self.longitude + 360.0,
            _ => self.longitude,
        };
        GeoPoint::new(self.latitude, longitude)
    }

    /// Whether the altitude-like value is finite. Used for geoid-corrected
    /// fallback samples.
    pub fn is_altitude_valid(value: f64) -> bool {
        value.is_finite()
    }
}

/// Meters per degree of longitude at the given latitude.
pub fn meters_per_degree_lon(latitude: f64) -> f64 {
    (METERS_PER_DEGREE * latitude.to_radians().cos()).max(1e-6)
}

/// Bring an unwrapped longitude back into `[-180, 180)`.
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon >= 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// Normalize an integer cell longitude into `[-180, 180)`.
pub fn wrap_cell_longitude(lng: i32) -> i32 {
    if lng >= 180 {
        lng - 360
    } else if lng < -180 {
        lng + 360
    } else {
        lng
    }
}
