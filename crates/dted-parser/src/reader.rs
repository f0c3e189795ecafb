//! Point and chunk reads from an open cell.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use terrain_common::BoundingBox;
use tracing::trace;

use crate::chunk::Chunk;
use crate::encoding::SampleEncoding;
use crate::error::{DtedError, DtedResult};
use crate::header::DtedHeader;

/// Positions closer than this to a post snap onto it.
const GRID_SNAP_EPSILON: f64 = 1e-9;

/// One open cell session.
///
/// The reader owns the file handle; dropping it closes the file. Chunk
/// addressing uses image pixels: column 0 is the west edge and row 0 the
/// north edge of the cell.
pub struct DtedReader<R> {
    inner: R,
    header: DtedHeader,
    encoding: SampleEncoding,
    chunk_size: usize,
    scratch: Vec<u8>,
}

impl DtedReader<File> {
    /// Open a cell file and read its header.
    pub fn open(
        path: &Path,
        cell_lat: i32,
        cell_lng: i32,
        encoding: SampleEncoding,
        chunk_size: usize,
    ) -> DtedResult<Self> {
        let file = File::open(path)?;
        let reader = Self::new(file, cell_lat, cell_lng, encoding, chunk_size)?;
        trace!(
            path = %path.display(),
            extent_x = reader.header.extent_x,
            extent_y = reader.header.extent_y,
            "Opened DTED cell"
        );
        Ok(reader)
    }
}

impl<R: Read + Seek> DtedReader<R> {
    pub fn new(
        mut inner: R,
        cell_lat: i32,
        cell_lng: i32,
        encoding: SampleEncoding,
        chunk_size: usize,
    ) -> DtedResult<Self> {
        let header = DtedHeader::read(&mut inner, cell_lat, cell_lng)?;
        Ok(Self {
            inner,
            header,
            encoding,
            chunk_size: chunk_size.max(1),
            scratch: Vec::new(),
        })
    }

    pub fn header(&self) -> &DtedHeader {
        &self.header
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunk columns in the cell.
    pub fn chunks_x(&self) -> usize {
        (self.header.extent_x - 1).div_ceil(self.chunk_size)
    }

    /// Number of chunk rows in the cell.
    pub fn chunks_y(&self) -> usize {
        (self.header.extent_y - 1).div_ceil(self.chunk_size)
    }

    /// Chunk column holding a longitude, clamped into the cell.
    pub fn chunk_x(&self, lng: f64) -> usize {
        let px = self.header.longitude_to_pixel_x(lng).floor().max(0.0) as usize;
        (px / self.chunk_size).min(self.chunks_x() - 1)
    }

    /// Chunk row holding a latitude, clamped into the cell.
    pub fn chunk_y(&self, lat: f64) -> usize {
        let py = self.header.latitude_to_pixel_y(lat).floor().max(0.0) as usize;
        (py / self.chunk_size).min(self.chunks_y() - 1)
    }

    pub fn chunk_pixel_x_to_longitude(&self, chunk_x: usize, px: f64) -> f64 {
        self.header
            .pixel_x_to_longitude((chunk_x * self.chunk_size) as f64 + px)
    }

    pub fn chunk_pixel_y_to_latitude(&self, chunk_y: usize, py: f64) -> f64 {
        self.header
            .pixel_y_to_latitude((chunk_y * self.chunk_size) as f64 + py)
    }

    pub fn chunk_longitude_to_pixel_x(&self, chunk_x: usize, lng: f64) -> f64 {
        self.header.longitude_to_pixel_x(lng) - (chunk_x * self.chunk_size) as f64
    }

    pub fn chunk_latitude_to_pixel_y(&self, chunk_y: usize, lat: f64) -> f64 {
        self.header.latitude_to_pixel_y(lat) - (chunk_y * self.chunk_size) as f64
    }

    /// Width and height in posts of a chunk, including the overlap.
    pub fn chunk_dims(&self, chunk_x: usize, chunk_y: usize) -> (usize, usize) {
        let w = (self.chunk_size + 1).min(self.header.extent_x - chunk_x * self.chunk_size);
        let h = (self.chunk_size + 1).min(self.header.extent_y - chunk_y * self.chunk_size);
        (w, h)
    }

    /// Geographic box spanned by the posts of a chunk.
    pub fn chunk_bounds(&self, chunk_x: usize, chunk_y: usize) -> BoundingBox {
        let (w, h) = self.chunk_dims(chunk_x, chunk_y);
        BoundingBox::new(
            self.chunk_pixel_x_to_longitude(chunk_x, 0.0),
            self.chunk_pixel_y_to_latitude(chunk_y, (h - 1) as f64),
            self.chunk_pixel_x_to_longitude(chunk_x, (w - 1) as f64),
            self.chunk_pixel_y_to_latitude(chunk_y, 0.0),
        )
    }

    /// Load a chunk into `out`, flipping rows so row 0 is the north edge.
    ///
    /// Each record contributes one column; its posts are stored south to
    /// north, so the contiguous span is read once and written bottom-up.
    pub fn load_chunk(&mut self, chunk_x: usize, chunk_y: usize, out: &mut Chunk) -> DtedResult<()> {
        let (chunks_x, chunks_y) = (self.chunks_x(), self.chunks_y());
        if chunk_x >= chunks_x || chunk_y >= chunks_y {
            return Err(DtedError::ChunkOutOfRange {
                chunk_x,
                chunk_y,
                chunks_x,
                chunks_y,
            });
        }

        let (w, h) = self.chunk_dims(chunk_x, chunk_y);
        out.reset(chunk_x, chunk_y, w, h);

        let top_row = chunk_y * self.chunk_size;
        let first_sample = (self.header.extent_y - 1) - (top_row + h - 1);
        self.scratch.resize(2 * h, 0);

        for x in 0..w {
            let record = chunk_x * self.chunk_size + x;
            self.inner
                .seek(SeekFrom::Start(self.header.sample_offset(record, first_sample)))?;
            self.inner.read_exact(&mut self.scratch)?;

            for (i, pair) in self.scratch.chunks_exact(2).enumerate() {
                let y = h - 1 - i;
                out.values[y * w + x] = self.encoding.decode_be([pair[0], pair[1]]);
            }
        }

        Ok(())
    }

    /// Bilinearly interpolated elevation at a position inside the cell.
    ///
    /// Positions outside the cell are clamped to its edge. Returns NaN when
    /// any contributing post is void or implausible.
    pub fn get_height(&mut self, lat: f64, lon: f64) -> DtedResult<f32> {
        if !lat.is_finite() || !lon.is_finite() {
            return Ok(f32::NAN);
        }

        let max_x = (self.header.extent_x - 1) as f64;
        let max_y = (self.header.extent_y - 1) as f64;
        let px = snap((lon - self.header.cell_lng as f64) * max_x).clamp(0.0, max_x);
        let py = snap((lat - self.header.cell_lat as f64) * max_y).clamp(0.0, max_y);

        let x0 = px.floor() as usize;
        let y0 = py.floor() as usize;
        let fx = px - x0 as f64;
        let fy = py - y0 as f64;
        let x1 = if fx > 0.0 { (x0 + 1).min(self.header.extent_x - 1) } else { x0 };
        let y1 = if fy > 0.0 { (y0 + 1).min(self.header.extent_y - 1) } else { y0 };

        let (v00, v01) = self.read_posts(x0, y0, y1)?;
        let (v10, v11) = if x1 == x0 {
            (v00, v01)
        } else {
            self.read_posts(x1, y0, y1)?
        };

        if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
            return Ok(f32::NAN);
        }

        let south = v00 as f64 * (1.0 - fx) + v10 as f64 * fx;
        let north = v01 as f64 * (1.0 - fx) + v11 as f64 * fx;
        Ok((south * (1.0 - fy) + north * fy) as f32)
    }

    /// Posts `south` and `north` (equal or adjacent) of one record.
    fn read_posts(&mut self, record: usize, south: usize, north: usize) -> DtedResult<(f32, f32)> {
        let count = north - south + 1;
        self.scratch.resize(2 * count, 0);
        self.inner
            .seek(SeekFrom::Start(self.header.sample_offset(record, south)))?;
        self.inner.read_exact(&mut self.scratch)?;

        let first = self.encoding.decode_be([self.scratch[0], self.scratch[1]]);
        let last = self
            .encoding
            .decode_be([self.scratch[2 * count - 2], self.scratch[2 * count - 1]]);
        Ok((first, last))
    }

    /// Release the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < GRID_SNAP_EPSILON {
        r
    } else {
        v
    }
}
