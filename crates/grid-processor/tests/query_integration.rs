//! End-to-end elevation queries against synthetic DTED cells written to a
//! temporary storage root.

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use grid_processor::{
    CoverageIndex, ElevationGridService, GridProcessorConfig, GridProcessorError, QueryOutcome,
    QueryParams, SharedCoverage,
};
use test_utils::{aoi_from, assert_approx_eq, assert_grid_approx_eq, bbox, degenerate_aoi, DtedCellBuilder, TerrainFixture};

fn service_for(roots: &[&TerrainFixture]) -> ElevationGridService {
    let roots: Vec<PathBuf> = roots.iter().map(|f| f.root().to_path_buf()).collect();
    let config = GridProcessorConfig::default().with_search_roots(roots.clone());
    ElevationGridService::new(config, SharedCoverage::new(CoverageIndex::scan(&roots)))
        .expect("valid config")
}

/// Cell (35, -107) whose five western longitude lines are void.
fn west_void_cell(meters: i16) -> DtedCellBuilder {
    (0..=4).fold(DtedCellBuilder::new(35, -107).uniform(meters), |cell, x| {
        (0..11).fold(cell, |cell, s| cell.void_post(x, s))
    })
}

// =============================================================================
// Single cell
// =============================================================================

#[test]
fn test_uniform_cell_full_query() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(100))
        .unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from((-107.0, 35.0, -106.0, 36.0)), 10, 10);
    let outcome = service.query(&mut params).unwrap();

    assert_eq!(outcome, QueryOutcome::Complete);
    assert_eq!(params.num_samples, 100);
    assert_grid_approx_eq!(params.elevation, 100.0, 1e-3);
    assert_approx_eq!(params.min_elev, 100.0, 1e-3);
    assert_approx_eq!(params.max_elev, 100.0, 1e-3);
}

#[test]
fn test_uniform_cell_quick_query() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(3, &DtedCellBuilder::new(35, -107).uniform(250))
        .unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 14, 10);
    params.quick = true;
    let outcome = service.query(&mut params).unwrap();

    assert_eq!(outcome, QueryOutcome::Complete);
    assert_eq!(params.num_samples, 140);
    for &v in &params.elevation {
        assert_approx_eq!(v, 250.0, 1e-3);
    }
}

#[test]
fn test_missing_files_leave_grid_empty() {
    let fixture = TerrainFixture::new().unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    let outcome = service.query(&mut params).unwrap();

    assert_eq!(outcome, QueryOutcome::Complete);
    assert_eq!(params.num_samples, 0);
    assert!(params.elevation.iter().all(|v| v.is_nan()));
    assert!(!params.valid);
}

#[test]
fn test_uppercase_cell_names_are_not_indexed() {
    let fixture = TerrainFixture::new().unwrap();
    let dir = fixture.root().join("W107");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("N35.dt2"), DtedCellBuilder::new(35, -107).uniform(100).build()).unwrap();

    let coverage = CoverageIndex::scan(&[fixture.root().to_path_buf()]);
    assert!(!coverage.contains_any(35, -107));

    let service = service_for(&[&fixture]);
    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    assert_eq!(service.query(&mut params).unwrap(), QueryOutcome::Complete);
    assert_eq!(params.num_samples, 0);
}

#[test]
fn test_indexed_but_deleted_file_is_skipped() {
    let fixture = TerrainFixture::new().unwrap();
    let path = fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(100))
        .unwrap();
    let service = service_for(&[&fixture]);
    std::fs::remove_file(path).unwrap();

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    assert_eq!(service.query(&mut params).unwrap(), QueryOutcome::Complete);
    assert_eq!(params.num_samples, 0);
}

#[test]
fn test_pre_canceled_query_leaves_grid_untouched() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(100))
        .unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 6, 6);
    params.elevation.iter_mut().for_each(|v| *v = 7.0);
    params.num_samples = 36;
    params.cancel.cancel();

    assert_eq!(service.query(&mut params).unwrap(), QueryOutcome::Canceled);
    assert!(params.elevation.iter().all(|&v| v == 7.0));
    assert_eq!(params.num_samples, 36);
}

#[test]
fn test_degenerate_aoi_is_geometry_error() {
    let fixture = TerrainFixture::new().unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(degenerate_aoi(35.5, -106.5), 4, 4);
    let result = service.query(&mut params);

    assert!(matches!(result, Err(GridProcessorError::Geometry(_))));
    assert!(params.elevation.iter().all(|v| v.is_nan()));
    assert!(!params.valid);
}

// =============================================================================
// Level and root search
// =============================================================================

#[test]
fn test_unreadable_level_falls_through_to_next() {
    let fixture = TerrainFixture::new().unwrap();
    fixture.add_raw(0, 35, -107, b"not a dted file").unwrap();
    fixture
        .add_cell(1, &DtedCellBuilder::new(35, -107).uniform(50))
        .unwrap();
    let service = service_for(&[&fixture]);

    // A whole-cell AOI is wider than 100 km, so level 0 is tried first.
    let mut params = QueryParams::new(aoi_from((-107.0, 35.0, -106.0, 36.0)), 10, 10);
    service.query(&mut params).unwrap();

    assert_eq!(params.num_samples, 100);
    for &v in &params.elevation {
        assert_approx_eq!(v, 50.0, 1e-3);
    }
}

#[test]
fn test_partial_level_is_completed_by_next_level() {
    let fixture = TerrainFixture::new().unwrap();
    fixture.add_cell(0, &west_void_cell(200)).unwrap();
    fixture
        .add_cell(1, &DtedCellBuilder::new(35, -107).uniform(50))
        .unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from((-107.0, 35.0, -106.0, 36.0)), 10, 10);
    service.query(&mut params).unwrap();

    assert_eq!(params.num_samples, 100);
    for py in 0..10 {
        for px in 0..10 {
            let expected = if px <= 4 { 50.0 } else { 200.0 };
            assert_approx_eq!(params.elevation_at(px, py), expected, 1e-3);
        }
    }
    assert_approx_eq!(params.min_elev, 50.0, 1e-3);
    assert_approx_eq!(params.max_elev, 200.0, 1e-3);
}

#[test]
fn test_second_root_fills_remaining_pixels() {
    let first = TerrainFixture::new().unwrap();
    let second = TerrainFixture::new().unwrap();
    first.add_cell(2, &west_void_cell(300)).unwrap();
    second
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(30))
        .unwrap();
    let service = service_for(&[&first, &second]);

    let mut params = QueryParams::new(aoi_from((-107.0, 35.0, -106.0, 36.0)), 10, 10);
    service.query(&mut params).unwrap();

    assert_eq!(params.num_samples, 100);
    assert_approx_eq!(params.elevation_at(0, 0), 30.0, 1e-3);
    assert_approx_eq!(params.elevation_at(9, 9), 300.0, 1e-3);
}

// =============================================================================
// Multiple cells
// =============================================================================

#[test]
fn test_four_cells() {
    let fixture = TerrainFixture::new().unwrap();
    for (lat, lng, meters) in [(35, -108, 10), (35, -107, 20), (34, -108, 30), (34, -107, 40)] {
        fixture
            .add_cell(1, &DtedCellBuilder::new(lat, lng).uniform(meters))
            .unwrap();
    }
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from(bbox::FOUR_CELLS), 20, 20);
    service.query(&mut params).unwrap();

    assert_eq!(params.num_samples, 400);
    assert_approx_eq!(params.elevation_at(0, 0), 10.0, 1e-3);
    assert_approx_eq!(params.elevation_at(19, 0), 20.0, 1e-3);
    assert_approx_eq!(params.elevation_at(0, 19), 30.0, 1e-3);
    assert_approx_eq!(params.elevation_at(19, 19), 40.0, 1e-3);
    assert_approx_eq!(params.min_elev, 10.0, 1e-3);
    assert_approx_eq!(params.max_elev, 40.0, 1e-3);
}

#[test]
fn test_antimeridian_cells() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(1, &DtedCellBuilder::new(10, 179).uniform(5))
        .unwrap();
    fixture
        .add_cell(1, &DtedCellBuilder::new(10, -180).uniform(6))
        .unwrap();
    let service = service_for(&[&fixture]);

    for quick in [false, true] {
        let mut params = QueryParams::new(aoi_from(bbox::ANTIMERIDIAN), 10, 10);
        params.quick = quick;
        service.query(&mut params).unwrap();

        assert_eq!(params.num_samples, 100, "quick = {}", quick);
        assert_approx_eq!(params.elevation_at(0, 5), 5.0, 1e-3);
        assert_approx_eq!(params.elevation_at(4, 5), 5.0, 1e-3);
        assert_approx_eq!(params.elevation_at(5, 5), 6.0, 1e-3);
        assert_approx_eq!(params.elevation_at(9, 5), 6.0, 1e-3);
    }
}

// =============================================================================
// Chunk cache
// =============================================================================

#[test]
fn test_repeated_query_hits_chunk_cache() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(100))
        .unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    service.query(&mut params).unwrap();
    let first = service.cache_stats();
    assert_eq!(first.hits, 0);
    assert_eq!(first.entries, 1);

    service.query(&mut params).unwrap();
    let second = service.cache_stats();
    assert!(second.hits >= 1);
    assert_eq!(second.entries, 1);
    assert_eq!(params.num_samples, 64);
}

#[test]
fn test_replaced_cell_file_is_reread() {
    let fixture = TerrainFixture::new().unwrap();
    let path = fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(100))
        .unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    service.query(&mut params).unwrap();
    assert_grid_approx_eq!(params.elevation, 100.0, 1e-3);

    // Same path and length; only the content and mtime change.
    fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(200))
        .unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(10))
        .unwrap();

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    service.query(&mut params).unwrap();
    assert_eq!(params.num_samples, 64);
    assert_grid_approx_eq!(params.elevation, 200.0, 1e-3);
}

#[test]
fn test_refreshed_coverage_sees_new_cell() {
    let fixture = TerrainFixture::new().unwrap();
    let service = service_for(&[&fixture]);

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    service.query(&mut params).unwrap();
    assert_eq!(params.num_samples, 0);

    fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(100))
        .unwrap();
    service.coverage().refresh(&service.config().search_roots);

    let mut params = QueryParams::new(aoi_from(bbox::ALBUQUERQUE), 8, 8);
    service.query(&mut params).unwrap();
    assert_eq!(params.num_samples, 64);
    assert_grid_approx_eq!(params.elevation, 100.0, 1e-3);
}

#[test]
fn test_small_chunks_cover_cell() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(
            2,
            &DtedCellBuilder::new(35, -107).posts_from(|x, _| (x * 10) as i16),
        )
        .unwrap();
    let config = GridProcessorConfig {
        chunk_size: 3,
        ..Default::default()
    }
    .with_search_roots(vec![fixture.root().to_path_buf()]);
    let coverage = SharedCoverage::new(CoverageIndex::scan(&config.search_roots));
    let service = ElevationGridService::new(config, coverage).unwrap();

    let mut params = QueryParams::new(aoi_from((-107.0, 35.0, -106.0, 36.0)), 10, 10);
    service.query(&mut params).unwrap();

    // Post x holds 10x meters, so pixel px (center at post px + 0.5) reads
    // 10 * px + 5.
    assert_eq!(params.num_samples, 100);
    for px in 0..10 {
        assert_approx_eq!(params.elevation_at(px, 3), 10.0 * px as f64 + 5.0, 1e-3);
    }
    assert_eq!(service.cache_stats().entries, 16);
}
