//! Reads synthetic cells written to disk in the on-disk layout.

use dted_parser::{relative_path, Chunk, DtedError, DtedReader, SampleEncoding, DEFAULT_CHUNK_SIZE};
use test_utils::{assert_approx_eq, DtedCellBuilder, TerrainFixture};

fn open(fixture: &TerrainFixture, level: u8, lat: i32, lng: i32) -> Result<DtedReader<std::fs::File>, DtedError> {
    DtedReader::open(
        &fixture.root().join(relative_path(level, lat, lng)),
        lat,
        lng,
        SampleEncoding::SignedMagnitude,
        DEFAULT_CHUNK_SIZE,
    )
}

#[test]
fn test_builder_path_matches_relative_path() {
    let fixture = TerrainFixture::new().unwrap();
    let path = fixture
        .add_cell(3, &DtedCellBuilder::new(35, -107))
        .unwrap();
    assert_eq!(path, fixture.root().join(relative_path(3, 35, -107)));
}

#[test]
fn test_uniform_cell_heights() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(2, &DtedCellBuilder::new(35, -107).uniform(100))
        .unwrap();

    let mut reader = open(&fixture, 2, 35, -107).unwrap();
    assert_eq!(reader.header().extent_x, 11);
    assert_eq!(reader.header().extent_y, 11);

    for &(lat, lon) in &[(35.0, -107.0), (35.5, -106.5), (35.97, -106.03), (36.0, -106.0)] {
        assert_approx_eq!(reader.get_height(lat, lon).unwrap(), 100.0, 1e-4);
    }
}

#[test]
fn test_negative_posts_decode() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(1, &DtedCellBuilder::new(31, 35).uniform(-60))
        .unwrap();

    let mut reader = open(&fixture, 1, 31, 35).unwrap();
    assert_eq!(reader.get_height(31.5, 35.5).unwrap(), -60.0);
}

#[test]
fn test_posts_below_plausible_floor_are_nan() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(1, &DtedCellBuilder::new(31, 35).uniform(-400))
        .unwrap();

    let mut reader = open(&fixture, 1, 31, 35).unwrap();
    assert!(reader.get_height(31.5, 35.5).unwrap().is_nan());
}

#[test]
fn test_void_post_in_chunk() {
    let fixture = TerrainFixture::new().unwrap();
    fixture
        .add_cell(
            2,
            &DtedCellBuilder::new(0, 0)
                .extents(6, 6)
                .uniform(10)
                .void_post(2, 5),
        )
        .unwrap();

    let mut reader = open(&fixture, 2, 0, 0).unwrap();
    let mut chunk = Chunk::default();
    reader.load_chunk(0, 0, &mut chunk).unwrap();

    // Post s = 5 is the north edge, so image row 0.
    assert!(chunk.get(2, 0).is_nan());
    assert_eq!(chunk.get(2, 1), 10.0);
    assert_eq!(chunk.values.iter().filter(|v| v.is_nan()).count(), 1);
}

#[test]
fn test_missing_file_is_io_error() {
    let fixture = TerrainFixture::new().unwrap();
    let err = open(&fixture, 0, 10, 10).err().unwrap();
    assert!(matches!(err, DtedError::Io(_)));
}

#[test]
fn test_garbage_header_is_format_error() {
    let fixture = TerrainFixture::new().unwrap();
    let mut bytes = DtedCellBuilder::new(10, 10).build();
    bytes[47..51].copy_from_slice(b"ab12");
    fixture.add_raw(0, 10, 10, &bytes).unwrap();

    let err = open(&fixture, 0, 10, 10).err().unwrap();
    assert!(matches!(err, DtedError::Format(_)));
}

#[test]
fn test_short_header_is_format_error() {
    let fixture = TerrainFixture::new().unwrap();
    fixture.add_raw(0, 10, 10, b"UHL1").unwrap();

    let err = open(&fixture, 0, 10, 10).err().unwrap();
    assert!(matches!(err, DtedError::Format(_)));
    assert!(!err.is_io());
}
