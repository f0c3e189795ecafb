//! Configuration for the grid processor.

use std::path::PathBuf;

use dted_parser::{SampleEncoding, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// Configuration for the grid processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridProcessorConfig {
    /// Chunk edge in posts for bulk loads.
    pub chunk_size: usize,

    /// Memory budget for the chunk cache in megabytes.
    pub chunk_cache_size_mb: usize,

    /// Storage roots searched in order for cell files.
    pub search_roots: Vec<PathBuf>,

    /// On-disk post encoding.
    pub sample_encoding: SampleEncoding,

    /// Edge of the square point batches sent to a fallback source.
    pub fallback_max_samples: usize,
}

impl Default for GridProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_cache_size_mb: 64,
            search_roots: Vec::new(),
            sample_encoding: SampleEncoding::SignedMagnitude,
            fallback_max_samples: 150,
        }
    }
}

impl GridProcessorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = std::env::var_os("DTED_PATHS") {
            config.search_roots = std::env::split_paths(&val)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        if let Ok(val) = std::env::var("DTED_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("CHUNK_CACHE_SIZE_MB") {
            if let Ok(size) = val.parse() {
                config.chunk_cache_size_mb = size;
            }
        }

        if let Ok(val) = std::env::var("DTED_SAMPLE_ENCODING") {
            if let Ok(encoding) = val.parse() {
                config.sample_encoding = encoding;
            }
        }

        if let Ok(val) = std::env::var("FALLBACK_MAX_SAMPLES") {
            if let Ok(n) = val.parse() {
                config.fallback_max_samples = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.chunk_cache_size_mb == 0 {
            return Err("chunk_cache_size_mb must be > 0".to_string());
        }

        if self.fallback_max_samples == 0 {
            return Err("fallback_max_samples must be > 0".to_string());
        }

        Ok(())
    }

    /// Get the chunk cache size in bytes.
    pub fn chunk_cache_size_bytes(&self) -> usize {
        self.chunk_cache_size_mb * 1024 * 1024
    }

    /// Builder-style helper for tests and the CLI.
    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }
}
