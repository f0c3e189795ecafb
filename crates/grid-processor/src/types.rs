//! Core types for grid processing.

use serde::{Deserialize, Serialize};
use terrain_common::{Aoi, CancelToken};

/// Feet to meters.
pub const METERS_PER_FOOT: f32 = 0.3048;

/// Reported maximum before any sample is seen (19000 ft).
pub const DEFAULT_MAX_ELEV: f32 = 19_000.0 * METERS_PER_FOOT;

/// Reported minimum before any sample is seen (-900 ft).
pub const DEFAULT_MIN_ELEV: f32 = -900.0 * METERS_PER_FOOT;

/// How a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Every cell was visited.
    Complete,
    /// The cancel token fired; the grid is partial and must be discarded.
    Canceled,
}

/// One elevation query and its reusable output buffers.
///
/// A renderable keeps one of these across queries. Buffers grow when a
/// larger grid is requested and are never shrunk.
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub aoi: Aoi,
    pub width: usize,
    pub height: usize,
    /// Low-resolution point sampling instead of chunk loads.
    pub quick: bool,
    /// A full-resolution query should follow this one.
    pub needs_refresh: bool,
    pub min_elev: f32,
    pub max_elev: f32,
    /// Valid pixels written.
    pub num_samples: usize,
    /// Row-major meters, row 0 at the top of the AOI; NaN = no data.
    pub elevation: Vec<f32>,
    /// `4 × width × height` bytes.
    pub rgba: Vec<u8>,
    /// Set once the query completed and the buffers may be published.
    pub valid: bool,
    pub draw_version: u64,
    pub cancel: CancelToken,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            aoi: Aoi::default(),
            width: 0,
            height: 0,
            quick: false,
            needs_refresh: false,
            min_elev: DEFAULT_MIN_ELEV,
            max_elev: DEFAULT_MAX_ELEV,
            num_samples: 0,
            elevation: Vec::new(),
            rgba: Vec::new(),
            valid: false,
            draw_version: 0,
            cancel: CancelToken::new(),
        }
    }
}

impl QueryParams {
    pub fn new(aoi: Aoi, width: usize, height: usize) -> Self {
        let mut params = Self {
            aoi,
            ..Self::default()
        };
        params.resize(width, height);
        params
    }

    /// Set the grid size. Storage is reallocated only when the new size
    /// exceeds the current capacity.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let n = width * height;

        if self.elevation.capacity() < n {
            self.elevation.reserve_exact(n - self.elevation.len());
        }
        self.elevation.resize(n, f32::NAN);

        if self.rgba.capacity() < 4 * n {
            self.rgba.reserve_exact(4 * n - self.rgba.len());
        }
        self.rgba.resize(4 * n, 0);
    }

    /// Clear results ahead of a new query: every pixel NaN, bounds and
    /// counters back to defaults, result invalid.
    pub fn reset(&mut self) {
        self.elevation.iter_mut().for_each(|v| *v = f32::NAN);
        self.num_samples = 0;
        self.min_elev = DEFAULT_MIN_ELEV;
        self.max_elev = DEFAULT_MAX_ELEV;
        self.valid = false;
    }

    /// Write a valid sample and fold it into the statistics. The first
    /// sample initializes the bounds.
    pub fn record_sample(&mut self, index: usize, meters: f32) {
        self.elevation[index] = meters;
        if self.num_samples == 0 {
            self.min_elev = meters;
            self.max_elev = meters;
        } else {
            self.min_elev = self.min_elev.min(meters);
            self.max_elev = self.max_elev.max(meters);
        }
        self.num_samples += 1;
    }

    pub fn elevation_at(&self, x: usize, y: usize) -> f32 {
        self.elevation[y * self.width + x]
    }

    /// Number of pixels in the grid.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chunk cache statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
