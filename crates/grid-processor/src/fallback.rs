//! Sampling a generic elevation source where no DTED cell exists.
//!
//! The source reports heights above the ellipsoid (HAE); a [`Geoid`]
//! converts them to mean sea level before they land in the grid.

use projection::QuadTransform;
use terrain_common::geo::normalize_longitude;
use terrain_common::{Aoi, GeoPoint};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{QueryOutcome, QueryParams};
use dted_parser::is_elev_valid;

/// A generic elevation provider.
pub trait ElevationSource: Send + Sync {
    /// Source types with data under the AOI, e.g. `"dted2"`.
    fn covering_types(&self, aoi: &Aoi) -> Vec<String>;

    /// HAE meters for each point; NaN where the source has no data.
    /// `out` has the same length as `points`.
    fn elevations(&self, points: &[GeoPoint], out: &mut [f64]);
}

/// HAE to MSL conversion.
pub trait Geoid: Send + Sync {
    fn msl(&self, lat: f64, lon: f64, hae: f64) -> f64;
}

/// Whether the types reported for an AOI are all served by the DTED
/// reader, in which case the fallback is not needed.
pub fn is_primary_only(covering_types: &[String]) -> bool {
    covering_types.iter().all(|t| t.starts_with("dted"))
}

/// Fill still-missing pixels from `source` in square tiles of at most
/// `max_samples × max_samples` points.
///
/// The grid is not reset; samples only land on NaN pixels so this can
/// run after a primary query.
pub fn query_fallback(
    params: &mut QueryParams,
    source: &dyn ElevationSource,
    geoid: &dyn Geoid,
    max_samples: usize,
) -> Result<QueryOutcome> {
    let transform = QuadTransform::geo_to_image(&params.aoi, params.width, params.height)
        .map_err(|e| {
            warn!(error = %e, aoi = ?params.aoi, "Cannot map AOI onto output grid");
            e
        })?;

    let tile = max_samples.max(1);
    let mut points = Vec::with_capacity(tile * tile);
    let mut indices = Vec::with_capacity(tile * tile);
    let mut heights = Vec::with_capacity(tile * tile);
    let mut batches = 0usize;

    for ty in (0..params.height).step_by(tile) {
        for tx in (0..params.width).step_by(tile) {
            if params.cancel.is_canceled() {
                return Ok(QueryOutcome::Canceled);
            }

            points.clear();
            indices.clear();
            for py in ty..(ty + tile).min(params.height) {
                for px in tx..(tx + tile).min(params.width) {
                    let index = py * params.width + px;
                    if !params.elevation[index].is_nan() {
                        continue;
                    }
                    let (lon, lat) = transform.inverse_transform(px as f64 + 0.5, py as f64 + 0.5);
                    points.push(GeoPoint::new(lat, normalize_longitude(lon)));
                    indices.push(index);
                }
            }
            if points.is_empty() {
                continue;
            }

            heights.clear();
            heights.resize(points.len(), f64::NAN);
            source.elevations(&points, &mut heights);
            batches += 1;

            for ((point, &index), &hae) in points.iter().zip(&indices).zip(&heights) {
                if !GeoPoint::is_altitude_valid(hae) {
                    continue;
                }
                let msl = geoid.msl(point.latitude, point.longitude, hae) as f32;
                if is_elev_valid(msl) {
                    params.record_sample(index, msl);
                }
            }
        }
    }

    debug!(
        batches,
        samples = params.num_samples,
        "Fallback sampling complete"
    );
    Ok(QueryOutcome::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_only() {
        assert!(is_primary_only(&["dted1".to_string(), "dted2".to_string()]));
        assert!(!is_primary_only(&["dted2".to_string(), "srtm".to_string()]));
        assert!(is_primary_only(&[]));
    }
}
