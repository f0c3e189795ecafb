//! Header parsing and record layout.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use terrain_common::BoundingBox;

use crate::error::{DtedError, DtedResult};
use crate::{DATA_OFFSET, EXTENTS_OFFSET, RECORD_PREFIX_LEN, RECORD_SUFFIX_LEN};

/// Layout of one open cell.
///
/// `extent_x` is the number of longitude lines (data records) and
/// `extent_y` the number of latitude posts per record. The cell origin is
/// the integer south-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtedHeader {
    pub extent_x: usize,
    pub extent_y: usize,
    pub cell_lat: i32,
    pub cell_lng: i32,
}

/// Parse the 8-byte UHL field holding two 4-digit ASCII decimals.
pub fn parse_extents(field: &[u8; 8]) -> DtedResult<(usize, usize)> {
    Ok((parse_count(&field[0..4])?, parse_count(&field[4..8])?))
}

fn parse_count(digits: &[u8]) -> DtedResult<usize> {
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(DtedError::format(format!(
            "expected 4 ASCII digits, found {:?}",
            String::from_utf8_lossy(digits)
        )));
    }
    Ok(digits
        .iter()
        .fold(0usize, |acc, d| acc * 10 + (d - b'0') as usize))
}

impl DtedHeader {
    /// Build a header from known extents. Extents below 2 cannot be
    /// interpolated and are rejected.
    pub fn new(extent_x: usize, extent_y: usize, cell_lat: i32, cell_lng: i32) -> DtedResult<Self> {
        if extent_x < 2 || extent_y < 2 {
            return Err(DtedError::format(format!(
                "extents {}x{} too small",
                extent_x, extent_y
            )));
        }
        Ok(Self {
            extent_x,
            extent_y,
            cell_lat,
            cell_lng,
        })
    }

    /// Read the extents from an open cell file.
    pub fn read<R: Read + Seek>(reader: &mut R, cell_lat: i32, cell_lng: i32) -> DtedResult<Self> {
        reader.seek(SeekFrom::Start(EXTENTS_OFFSET))?;

        let mut field = [0u8; 8];
        // A file too short to hold the extents is malformed, not unreadable.
        reader.read_exact(&mut field).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                DtedError::format(format!(
                    "file ends before the {}-byte extents field at offset {}",
                    field.len(),
                    EXTENTS_OFFSET
                ))
            } else {
                DtedError::Io(e)
            }
        })?;

        let (extent_x, extent_y) = parse_extents(&field)?;
        Self::new(extent_x, extent_y, cell_lat, cell_lng)
    }

    /// Size in bytes of one data record.
    pub fn record_size(&self) -> usize {
        RECORD_PREFIX_LEN + 2 * self.extent_y + RECORD_SUFFIX_LEN
    }

    /// File offset of post `sample` (counted from the south) in record
    /// `record` (counted from the west).
    pub fn sample_offset(&self, record: usize, sample: usize) -> u64 {
        DATA_OFFSET
            + (record * self.record_size()) as u64
            + (RECORD_PREFIX_LEN + 2 * sample) as u64
    }

    /// Expected file length in bytes.
    pub fn file_len(&self) -> u64 {
        DATA_OFFSET + (self.extent_x * self.record_size()) as u64
    }

    /// Geographic footprint of the cell.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.cell_lng as f64,
            self.cell_lat as f64,
            self.cell_lng as f64 + 1.0,
            self.cell_lat as f64 + 1.0,
        )
    }

    /// Fractional column of a longitude; 0 at the west edge.
    pub fn longitude_to_pixel_x(&self, lng: f64) -> f64 {
        (self.extent_x - 1) as f64 * (lng - self.cell_lng as f64)
    }

    /// Fractional image row of a latitude; 0 at the north edge.
    pub fn latitude_to_pixel_y(&self, lat: f64) -> f64 {
        (self.extent_y - 1) as f64 * (self.cell_lat as f64 + 1.0 - lat)
    }

    pub fn pixel_x_to_longitude(&self, px: f64) -> f64 {
        self.cell_lng as f64 + px / (self.extent_x - 1) as f64
    }

    pub fn pixel_y_to_latitude(&self, py: f64) -> f64 {
        self.cell_lat as f64 + 1.0 - py / (self.extent_y - 1) as f64
    }
}
