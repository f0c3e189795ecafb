//! Cache implementations for grid processing.

mod chunk_cache;
mod coverage;

pub use chunk_cache::{hash_path, ChunkCache, ChunkKey};
pub use coverage::{cell_index, CoverageIndex, SharedCoverage};
