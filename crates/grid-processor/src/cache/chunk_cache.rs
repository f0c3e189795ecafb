//! LRU cache for decoded terrain chunks.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dted_parser::Chunk;

use crate::types::CacheStats;

/// Identifies one chunk of one version of a cell file.
///
/// Length and modification time are part of the key, so a cell file
/// replaced in place misses the cache instead of serving old chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub path_hash: u64,
    pub file_len: u64,
    pub modified: Option<SystemTime>,
    pub chunk_x: usize,
    pub chunk_y: usize,
}

impl ChunkKey {
    pub fn new(path: &Path, meta: &std::fs::Metadata, chunk_x: usize, chunk_y: usize) -> Self {
        Self {
            path_hash: hash_path(path),
            file_len: meta.len(),
            modified: meta.modified().ok(),
            chunk_x,
            chunk_y,
        }
    }
}

/// LRU cache for decoded chunks with memory-bounded eviction.
pub struct ChunkCache {
    cache: LruCache<ChunkKey, Arc<Chunk>>,
    memory_limit: usize,
    current_memory: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ChunkCache {
    /// Create a new chunk cache with the given memory limit in bytes.
    pub fn new(memory_limit: usize) -> Self {
        // Estimate max entries assuming ~1MB per chunk (513×513×4 bytes)
        let chunk_size_estimate = 513 * 513 * 4;
        let max_entries = (memory_limit / chunk_size_estimate).max(16);

        Self {
            cache: LruCache::new(NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN)),
            memory_limit,
            current_memory: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Try to get a chunk from the cache.
    pub fn get(&mut self, key: &ChunkKey) -> Option<Arc<Chunk>> {
        if let Some(chunk) = self.cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(chunk))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Check if a key exists in the cache without updating LRU order.
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a chunk, evicting least recently used entries to make room.
    pub fn insert(&mut self, key: ChunkKey, chunk: Arc<Chunk>) {
        let size = chunk.memory_size();

        while self.current_memory + size > self.memory_limit && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                self.current_memory = self.current_memory.saturating_sub(evicted.memory_size());
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        // Only insert if the data fits (or cache was empty)
        if size <= self.memory_limit {
            if let Some((_, replaced)) = self.cache.push(key, chunk) {
                self.current_memory = self.current_memory.saturating_sub(replaced.memory_size());
            }
            self.current_memory += size;
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            memory_bytes: self.current_memory as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }

    /// Get the current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Hash of a cell file path, used as part of the cache key.
pub fn hash_path(path: &Path) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}
