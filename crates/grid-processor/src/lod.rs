//! Detail-level preference.

/// Order in which detail levels are tried for a query whose lower-left to
/// upper-right corner distance is `coverage_distance` meters.
///
/// Wide views prefer coarse levels, close-ups the finest. Every result is
/// a permutation of `0..4`; the thresholds are strict.
pub fn select_levels(coverage_distance: f64) -> [u8; 4] {
    if coverage_distance > 100_000.0 {
        [0, 1, 2, 3]
    } else if coverage_distance > 30_000.0 {
        [1, 2, 3, 0]
    } else if coverage_distance > 10_000.0 {
        [2, 3, 1, 0]
    } else {
        [3, 2, 1, 0]
    }
}
