//! Elevation grid queries over DTED terrain cells.
//!
//! This crate fills a `width × height` elevation grid for an arbitrary
//! four-corner area of interest. It enables:
//!
//! - **Level-of-detail search**: coarse levels for wide views, fine for close-ups
//! - **Partial reads**: only the chunks of a cell under the AOI are decoded
//! - **Efficient caching**: memory-bounded LRU cache of decoded chunks
//! - **Fallback sampling**: a generic elevation source fills what DTED lacks
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{ElevationGridService, GridProcessorConfig, QueryParams};
//!
//! let service = ElevationGridService::with_scanned_coverage(GridProcessorConfig::from_env())?;
//! let mut params = QueryParams::new(aoi, 256, 256);
//! service.query(&mut params)?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod interpolation;
pub mod lod;
pub mod query;
pub mod types;

// Re-export commonly used types at crate root
pub use cache::{ChunkCache, ChunkKey, CoverageIndex, SharedCoverage};
pub use config::GridProcessorConfig;
pub use error::{GridProcessorError, Result};
pub use fallback::{is_primary_only, query_fallback, ElevationSource, Geoid};
pub use interpolation::{bilinear_interpolate, sample_chunk};
pub use lod::select_levels;
pub use query::{ElevationGridService, GridQuery, SampleMode};
pub use types::{CacheStats, QueryOutcome, QueryParams, DEFAULT_MAX_ELEV, DEFAULT_MIN_ELEV};
