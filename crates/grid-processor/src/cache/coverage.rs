//! Which cells exist at which detail level.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use dted_parser::path::parse_relative_path;
use dted_parser::NUM_LEVELS;
use tracing::{debug, info};
use walkdir::WalkDir;

const NUM_CELLS: usize = 180 * 360;
const WORDS_PER_LEVEL: usize = NUM_CELLS.div_ceil(64);

/// Per-level bitsets over all 1°×1° cells, indexed by
/// `(lat + 90) * 360 + (lng + 180)` of the south-west corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageIndex {
    levels: Vec<Vec<u64>>,
}

impl Default for CoverageIndex {
    fn default() -> Self {
        Self {
            levels: vec![vec![0; WORDS_PER_LEVEL]; NUM_LEVELS],
        }
    }
}

/// Bit index of a cell, or `None` outside the globe.
pub fn cell_index(lat: i32, lng: i32) -> Option<usize> {
    if !(-90..90).contains(&lat) || !(-180..180).contains(&lng) {
        return None;
    }
    Some(((lat + 90) * 360 + (lng + 180)) as usize)
}

impl CoverageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a cell present at a level. Out-of-range inputs are ignored.
    pub fn insert(&mut self, level: u8, lat: i32, lng: i32) {
        if let (Some(bits), Some(i)) = (self.levels.get_mut(level as usize), cell_index(lat, lng)) {
            bits[i / 64] |= 1u64 << (i % 64);
        }
    }

    pub fn contains(&self, level: u8, lat: i32, lng: i32) -> bool {
        match (self.levels.get(level as usize), cell_index(lat, lng)) {
            (Some(bits), Some(i)) => bits[i / 64] & (1u64 << (i % 64)) != 0,
            _ => false,
        }
    }

    /// Whether any level has the cell.
    pub fn contains_any(&self, lat: i32, lng: i32) -> bool {
        (0..NUM_LEVELS as u8).any(|level| self.contains(level, lat, lng))
    }

    /// Number of cells present at a level.
    pub fn count(&self, level: u8) -> usize {
        self.levels
            .get(level as usize)
            .map(|bits| bits.iter().map(|w| w.count_ones() as usize).sum())
            .unwrap_or(0)
    }

    /// Build an index from the cell files found under `roots`
    /// (`<root>/<e|w>DDD/<n|s>DD.dt<level>`). Unreadable entries are
    /// skipped.
    pub fn scan(roots: &[PathBuf]) -> Self {
        let mut index = Self::new();

        for root in roots {
            for entry in WalkDir::new(root).min_depth(2).max_depth(2) {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let dir = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str());
                let file = path.file_name().and_then(|n| n.to_str());

                if let Some((level, lat, lng)) =
                    dir.zip(file).and_then(|(d, f)| parse_relative_path(d, f))
                {
                    index.insert(level, lat, lng);
                }
            }
        }

        info!(
            roots = roots.len(),
            level0 = index.count(0),
            level1 = index.count(1),
            level2 = index.count(2),
            level3 = index.count(3),
            "Coverage scan complete"
        );
        index
    }
}

/// Coverage snapshot shared between queries and a refresher.
///
/// Queries take an `Arc` snapshot and keep using it even if a refresh
/// swaps in a new index mid-query.
#[derive(Debug, Clone, Default)]
pub struct SharedCoverage {
    inner: Arc<RwLock<Arc<CoverageIndex>>>,
}

impl SharedCoverage {
    pub fn new(index: CoverageIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    /// Current index.
    pub fn snapshot(&self) -> Arc<CoverageIndex> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Publish a new index.
    pub fn replace(&self, index: CoverageIndex) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(index);
    }

    /// Rescan `roots` and publish the result.
    pub fn refresh(&self, roots: &[PathBuf]) {
        self.replace(CoverageIndex::scan(roots));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_index() {
        assert_eq!(cell_index(-90, -180), Some(0));
        assert_eq!(cell_index(0, 0), Some(90 * 360 + 180));
        assert_eq!(cell_index(89, 179), Some(NUM_CELLS - 1));
        assert_eq!(cell_index(90, 0), None);
        assert_eq!(cell_index(0, 180), None);
    }

    #[test]
    fn test_insert_and_contains() {
        let mut index = CoverageIndex::new();
        index.insert(2, 35, -107);

        assert!(index.contains(2, 35, -107));
        assert!(!index.contains(1, 35, -107));
        assert!(!index.contains(2, 35, -106));
        assert!(index.contains_any(35, -107));
        assert!(!index.contains_any(36, -107));
        assert_eq!(index.count(2), 1);

        index.insert(9, 35, -107);
        assert!(!index.contains(9, 35, -107));
    }

    #[test]
    fn test_shared_snapshot_survives_replace() {
        let shared = SharedCoverage::default();
        let before = shared.snapshot();

        let mut index = CoverageIndex::new();
        index.insert(0, 1, 1);
        shared.replace(index);

        assert!(!before.contains(0, 1, 1));
        assert!(shared.snapshot().contains(0, 1, 1));
    }
}
