//! Elevation grid queries over DTED cells.
//!
//! ```text
//! QueryParams (AOI, width × height)
//!      │
//!      ├─► geo → image transform from the AOI corners
//!      │
//!      ├─► for each 1° cell under the AOI (north to south, west to east)
//!      │         │
//!      │         ├─► skip if no level is covered
//!      │         │
//!      │         └─► for each level (LOD order), for each root
//!      │                   │
//!      │                   ├─► open cell, read header
//!      │                   ├─► load overlapping chunks (ChunkCache)
//!      │                   ├─► interpolate still-missing pixels
//!      │                   └─► stop once the cell has no missing pixel
//!      │
//!      └─► min/max/sample count in QueryParams
//! ```

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use dted_parser::{is_elev_valid, relative_path, Chunk, DtedError, DtedReader, DtedResult};
use metrics::{counter, histogram};
use projection::QuadTransform;
use terrain_common::geo::wrap_cell_longitude;
use terrain_common::BoundingBox;
use tracing::{debug, info, warn};

use crate::cache::{ChunkCache, ChunkKey, CoverageIndex, SharedCoverage};
use crate::config::GridProcessorConfig;
use crate::error::{GridProcessorError, Result};
use crate::interpolation::sample_chunk;
use crate::lod::select_levels;
use crate::types::{CacheStats, QueryOutcome, QueryParams};

/// How samples are pulled from an open cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Bulk chunk loads through the chunk cache.
    Chunks,
    /// One `get_height` per pixel.
    Points,
}

/// Long-lived query service: configuration, coverage and the chunk cache.
pub struct ElevationGridService {
    config: GridProcessorConfig,
    coverage: SharedCoverage,
    cache: Mutex<ChunkCache>,
}

impl ElevationGridService {
    pub fn new(config: GridProcessorConfig, coverage: SharedCoverage) -> Result<Self> {
        config.validate().map_err(GridProcessorError::config)?;
        let cache = ChunkCache::new(config.chunk_cache_size_bytes());
        Ok(Self {
            config,
            coverage,
            cache: Mutex::new(cache),
        })
    }

    /// Service whose coverage is scanned from the configured roots.
    pub fn with_scanned_coverage(config: GridProcessorConfig) -> Result<Self> {
        let coverage = SharedCoverage::new(CoverageIndex::scan(&config.search_roots));
        Self::new(config, coverage)
    }

    pub fn config(&self) -> &GridProcessorConfig {
        &self.config
    }

    pub fn coverage(&self) -> &SharedCoverage {
        &self.coverage
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    /// Quick queries sample points, full queries load chunks.
    pub fn query(&self, params: &mut QueryParams) -> Result<QueryOutcome> {
        let mode = if params.quick {
            SampleMode::Points
        } else {
            SampleMode::Chunks
        };
        self.run(params, mode)
    }

    /// Full-resolution query through chunk loads.
    pub fn query_chunks(&self, params: &mut QueryParams) -> Result<QueryOutcome> {
        self.run(params, SampleMode::Chunks)
    }

    /// Low-resolution query through per-pixel point reads.
    pub fn query_points(&self, params: &mut QueryParams) -> Result<QueryOutcome> {
        self.run(params, SampleMode::Points)
    }

    fn run(&self, params: &mut QueryParams, mode: SampleMode) -> Result<QueryOutcome> {
        // A pre-canceled query leaves the buffers untouched.
        if params.cancel.is_canceled() {
            return Ok(QueryOutcome::Canceled);
        }

        let start = Instant::now();
        params.reset();

        let query = GridQuery::new(self, params).map_err(|e| {
            warn!(error = %e, aoi = ?params.aoi, "Cannot map AOI onto output grid");
            e
        })?;

        let outcome = match mode {
            SampleMode::Chunks => query.query_chunks(params),
            SampleMode::Points => query.query_points(params),
        };

        let elapsed = start.elapsed();
        histogram!("terrain_query_duration_seconds").record(elapsed.as_secs_f64());

        match outcome {
            QueryOutcome::Complete => info!(
                mode = ?mode,
                width = params.width,
                height = params.height,
                samples = params.num_samples,
                min_elev = params.min_elev,
                max_elev = params.max_elev,
                elapsed_ms = elapsed.as_millis() as u64,
                "Elevation query complete"
            ),
            QueryOutcome::Canceled => debug!(
                mode = ?mode,
                samples = params.num_samples,
                "Elevation query canceled"
            ),
        }

        Ok(outcome)
    }

    fn lock_cache(&self) -> MutexGuard<'_, ChunkCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_chunk(
        &self,
        reader: &mut DtedReader<File>,
        key: ChunkKey,
    ) -> DtedResult<Arc<Chunk>> {
        if let Some(chunk) = self.lock_cache().get(&key) {
            counter!("terrain_chunk_cache_hits_total").increment(1);
            return Ok(chunk);
        }

        let mut chunk = Chunk::default();
        reader.load_chunk(key.chunk_x, key.chunk_y, &mut chunk)?;
        let chunk = Arc::new(chunk);
        self.lock_cache().insert(key, Arc::clone(&chunk));
        Ok(chunk)
    }
}

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy)]
struct PixelRange {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

/// One cell as seen by a query.
#[derive(Debug, Clone, Copy)]
struct CellTarget {
    lat: i32,
    /// Normalized into `[-180, 180)`; the file's origin.
    lng: i32,
    /// Added to file longitudes to reach the AOI's (possibly unwrapped)
    /// longitudes.
    lng_offset: f64,
    /// Cell footprint clipped to the AOI bounds, AOI longitudes.
    clipped: BoundingBox,
    pixels: PixelRange,
}

/// State of one query: transform, level order and coverage snapshot.
pub struct GridQuery<'a> {
    service: &'a ElevationGridService,
    transform: QuadTransform,
    levels: [u8; 4],
    coverage: Arc<CoverageIndex>,
    bounds: BoundingBox,
    width: usize,
    height: usize,
}

impl<'a> GridQuery<'a> {
    /// Fails with [`GridProcessorError::Geometry`] when the AOI corners
    /// cannot be mapped onto the grid.
    pub fn new(service: &'a ElevationGridService, params: &QueryParams) -> Result<Self> {
        let transform = QuadTransform::geo_to_image(&params.aoi, params.width, params.height)?;
        Ok(Self {
            service,
            transform,
            levels: select_levels(params.aoi.coverage_distance()),
            coverage: service.coverage.snapshot(),
            bounds: params.aoi.bounds(),
            width: params.width,
            height: params.height,
        })
    }

    /// Level search order for this query.
    pub fn levels(&self) -> [u8; 4] {
        self.levels
    }

    /// Fill the grid from bulk chunk loads.
    pub fn query_chunks(&self, params: &mut QueryParams) -> QueryOutcome {
        self.run(params, SampleMode::Chunks)
    }

    /// Fill the grid with one point read per pixel.
    pub fn query_points(&self, params: &mut QueryParams) -> QueryOutcome {
        self.run(params, SampleMode::Points)
    }

    fn run(&self, params: &mut QueryParams, mode: SampleMode) -> QueryOutcome {
        let first_lng = self.bounds.min_lon.floor() as i32;
        let num_cells_x = self.bounds.max_lon.floor() as i32 - first_lng + 1;
        let top_lat = self.bounds.max_lat.floor() as i32;
        let num_cells_y = top_lat - self.bounds.min_lat.floor() as i32 + 1;

        for cell_y in 0..num_cells_y {
            for cell_x in 0..num_cells_x {
                if params.cancel.is_canceled() {
                    return QueryOutcome::Canceled;
                }

                let lat = top_lat - cell_y;
                let unwrapped_lng = first_lng + cell_x;
                let lng = wrap_cell_longitude(unwrapped_lng);

                if !(-90..90).contains(&lat) || !self.coverage.contains_any(lat, lng) {
                    continue;
                }

                let cell_box = BoundingBox::new(
                    unwrapped_lng as f64,
                    lat as f64,
                    unwrapped_lng as f64 + 1.0,
                    lat as f64 + 1.0,
                );
                let Some(clipped) = cell_box.intersection(&self.bounds) else {
                    continue;
                };
                let Some(pixels) = self.pixel_range(&clipped) else {
                    continue;
                };

                let cell = CellTarget {
                    lat,
                    lng,
                    lng_offset: (unwrapped_lng - lng) as f64,
                    clipped,
                    pixels,
                };
                self.fill_cell(&cell, params, mode);
            }
        }

        QueryOutcome::Complete
    }

    /// Try levels in preference order and roots in configured order until
    /// no pixel of the cell is missing.
    fn fill_cell(&self, cell: &CellTarget, params: &mut QueryParams, mode: SampleMode) {
        if !self.cell_missing(cell, params) {
            return;
        }

        for &level in &self.levels {
            if !self.coverage.contains(level, cell.lat, cell.lng) {
                continue;
            }

            for root in &self.service.config.search_roots {
                let path = root.join(relative_path(level, cell.lat, cell.lng));

                if let Err(e) = self.fill_from_file(&path, cell, params, mode) {
                    if !matches!(&e, DtedError::Io(io) if io.kind() == ErrorKind::NotFound) {
                        counter!("terrain_cell_errors_total").increment(1);
                    }
                    debug!(
                        path = %path.display(),
                        level,
                        error = %e,
                        "Skipping unusable cell file"
                    );
                    continue;
                }

                if !self.cell_missing(cell, params) {
                    return;
                }
            }
        }
    }

    fn fill_from_file(
        &self,
        path: &Path,
        cell: &CellTarget,
        params: &mut QueryParams,
        mode: SampleMode,
    ) -> DtedResult<()> {
        let meta = std::fs::metadata(path)?;
        let config = &self.service.config;
        let mut reader = DtedReader::open(
            path,
            cell.lat,
            cell.lng,
            config.sample_encoding,
            config.chunk_size,
        )?;
        counter!("terrain_cells_opened_total").increment(1);

        match mode {
            SampleMode::Chunks => self.fill_from_chunks(&mut reader, path, &meta, cell, params),
            SampleMode::Points => self.fill_from_points(&mut reader, cell, params),
        }
    }

    fn fill_from_chunks(
        &self,
        reader: &mut DtedReader<File>,
        path: &Path,
        meta: &std::fs::Metadata,
        cell: &CellTarget,
        params: &mut QueryParams,
    ) -> DtedResult<()> {
        let off = cell.lng_offset;
        let cx0 = reader.chunk_x(cell.clipped.min_lon - off);
        let cx1 = reader.chunk_x(cell.clipped.max_lon - off);
        let cy0 = reader.chunk_y(cell.clipped.max_lat);
        let cy1 = reader.chunk_y(cell.clipped.min_lat);

        for cy in cy0..=cy1 {
            for cx in cx0..=cx1 {
                let chunk_box = shift_lon(&reader.chunk_bounds(cx, cy), off);
                let Some(target) = chunk_box.intersection(&cell.clipped) else {
                    continue;
                };
                let Some(range) = self.pixel_range(&target) else {
                    continue;
                };

                let key = ChunkKey::new(path, meta, cx, cy);
                let chunk = self.service.cached_chunk(reader, key)?;

                for py in range.y0..=range.y1 {
                    for px in range.x0..=range.x1 {
                        let index = py * self.width + px;
                        if !params.elevation[index].is_nan() {
                            continue;
                        }

                        let (lon, lat) = self.pixel_geo(px, py);
                        if !target.contains(lon, lat) {
                            continue;
                        }

                        let x = reader.chunk_longitude_to_pixel_x(cx, lon - off);
                        let y = reader.chunk_latitude_to_pixel_y(cy, lat);
                        let value = sample_chunk(&chunk, x, y);
                        if is_elev_valid(value) {
                            params.record_sample(index, value);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn fill_from_points(
        &self,
        reader: &mut DtedReader<File>,
        cell: &CellTarget,
        params: &mut QueryParams,
    ) -> DtedResult<()> {
        let r = cell.pixels;
        for py in r.y0..=r.y1 {
            for px in r.x0..=r.x1 {
                let index = py * self.width + px;
                if !params.elevation[index].is_nan() {
                    continue;
                }

                let (lon, lat) = self.pixel_geo(px, py);
                if !cell.clipped.contains(lon, lat) {
                    continue;
                }

                let value = reader.get_height(lat, lon - cell.lng_offset)?;
                if is_elev_valid(value) {
                    params.record_sample(index, value);
                }
            }
        }
        Ok(())
    }

    /// Whether any pixel whose center falls in the cell is still NaN.
    fn cell_missing(&self, cell: &CellTarget, params: &QueryParams) -> bool {
        let r = cell.pixels;
        (r.y0..=r.y1).any(|py| {
            (r.x0..=r.x1).any(|px| {
                params.elevation[py * self.width + px].is_nan() && {
                    let (lon, lat) = self.pixel_geo(px, py);
                    cell.clipped.contains(lon, lat)
                }
            })
        })
    }

    /// Geographic position `(lon, lat)` of a pixel center.
    fn pixel_geo(&self, px: usize, py: usize) -> (f64, f64) {
        self.transform
            .inverse_transform(px as f64 + 0.5, py as f64 + 0.5)
    }

    /// Pixels whose centers can fall inside a geographic box.
    fn pixel_range(&self, bbox: &BoundingBox) -> Option<PixelRange> {
        let (min_x, min_y, max_x, max_y) = self.transform.transform_bounds(bbox);
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return None;
        }

        let x0 = (min_x - 0.5).floor().max(0.0);
        let y0 = (min_y - 0.5).floor().max(0.0);
        let x1 = (max_x - 0.5).ceil().min(self.width as f64 - 1.0);
        let y1 = (max_y - 0.5).ceil().min(self.height as f64 - 1.0);
        if x0 > x1 || y0 > y1 {
            return None;
        }

        Some(PixelRange {
            x0: x0 as usize,
            y0: y0 as usize,
            x1: x1 as usize,
            y1: y1 as usize,
        })
    }
}

fn shift_lon(bbox: &BoundingBox, offset: f64) -> BoundingBox {
    BoundingBox::new(
        bbox.min_lon + offset,
        bbox.min_lat,
        bbox.max_lon + offset,
        bbox.max_lat,
    )
}
