//! Elevation angle from the observer to a cell.

use std::cmp::Ordering;

/// Angle from the observer to a cell, in degrees.
///
/// The stored value is `θ = atan(|Δalt| / distance)` when the cell is at or
/// above the observer (`[0, 90]`) and `360 - θ` when it is below
/// (`[270, 360)`). Comparisons unwrap that encoding, so a higher elevation
/// angle always orders higher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeAngle(f32);

impl SlopeAngle {
    /// Straight down; below every real slope.
    pub const NADIR: SlopeAngle = SlopeAngle(270.0);

    /// Angle to a cell `delta_alt` meters above (negative: below) the
    /// observer at `distance` meters. `None` for non-finite input or a
    /// zero distance.
    pub fn new(delta_alt: f64, distance: f64) -> Option<Self> {
        if !delta_alt.is_finite() || !distance.is_finite() || distance <= 0.0 {
            return None;
        }
        let theta = (delta_alt.abs() / distance).atan().to_degrees() as f32;
        if delta_alt >= 0.0 {
            Some(Self(theta))
        } else {
            Some(Self(360.0 - theta))
        }
    }

    /// Raw encoded value in `[0, 360)`.
    pub fn encoded(self) -> f32 {
        self.0
    }

    /// Signed elevation angle in `[-90, 90]`.
    pub fn elevation_angle(self) -> f32 {
        if self.0 >= 180.0 {
            self.0 - 360.0
        } else {
            self.0
        }
    }

    /// Whether a cell at this angle clears `horizon`. Ties are visible.
    pub fn clears(self, horizon: SlopeAngle) -> bool {
        self.elevation_angle() >= horizon.elevation_angle()
    }
}

impl PartialOrd for SlopeAngle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.elevation_angle().partial_cmp(&other.elevation_angle())
    }
}
