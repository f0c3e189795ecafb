//! Synthetic DTED cells for tests.
//!
//! Cells are written byte-for-byte in the MIL-PRF-89020B layout: an 80-byte
//! UHL carrying the longitude/latitude line counts at offset 47, blank DSI
//! and ACC blocks, then one record per longitude line with sign-magnitude
//! big-endian posts ordered south to north.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Offset of the first data record.
pub const DTED_DATA_OFFSET: usize = 3428;

/// Raw void post in sign-magnitude encoding.
pub const DTED_VOID: u16 = 0xFFFF;

/// Builder for a single synthetic cell.
///
/// # Example
///
/// ```
/// use test_utils::DtedCellBuilder;
///
/// let bytes = DtedCellBuilder::new(35, -107).extents(11, 11).uniform(100).build();
/// assert_eq!(&bytes[47..55], b"00110011");
/// ```
#[derive(Debug, Clone)]
pub struct DtedCellBuilder {
    lat: i32,
    lng: i32,
    extent_x: usize,
    extent_y: usize,
    /// Raw posts indexed `[x * extent_y + s]`, `s` counted from the south.
    posts: Vec<u16>,
}

impl DtedCellBuilder {
    /// New 11x11 cell at the given south-west corner, all posts 0 m.
    pub fn new(lat: i32, lng: i32) -> Self {
        Self {
            lat,
            lng,
            extent_x: 11,
            extent_y: 11,
            posts: vec![0; 121],
        }
    }

    /// Set the number of longitude lines and latitude posts; resets posts
    /// to 0 m.
    pub fn extents(mut self, extent_x: usize, extent_y: usize) -> Self {
        self.extent_x = extent_x;
        self.extent_y = extent_y;
        self.posts = vec![0; extent_x * extent_y];
        self
    }

    /// Every post at `meters`.
    pub fn uniform(self, meters: i16) -> Self {
        self.posts_from(|_, _| meters)
    }

    /// Posts from a function of `(x, s)`: longitude line from the west and
    /// post from the south.
    pub fn posts_from(mut self, f: impl Fn(usize, usize) -> i16) -> Self {
        for x in 0..self.extent_x {
            for s in 0..self.extent_y {
                self.posts[x * self.extent_y + s] = encode_signed_magnitude(f(x, s));
            }
        }
        self
    }

    /// Mark one post void.
    pub fn void_post(mut self, x: usize, s: usize) -> Self {
        self.posts[x * self.extent_y + s] = DTED_VOID;
        self
    }

    pub fn lat(&self) -> i32 {
        self.lat
    }

    pub fn lng(&self) -> i32 {
        self.lng
    }

    /// Serialize the cell.
    pub fn build(&self) -> Vec<u8> {
        let record_size = 8 + 2 * self.extent_y + 4;
        let mut bytes = Vec::with_capacity(DTED_DATA_OFFSET + self.extent_x * record_size);

        // UHL
        let mut uhl = vec![b' '; 80];
        uhl[0..4].copy_from_slice(b"UHL1");
        uhl[4..12].copy_from_slice(&format_angle(self.lng, 'E', 'W', 3));
        uhl[12..20].copy_from_slice(&format_angle(self.lat, 'N', 'S', 2));
        uhl[47..55].copy_from_slice(format!("{:04}{:04}", self.extent_x, self.extent_y).as_bytes());
        bytes.extend_from_slice(&uhl);

        // DSI + ACC
        let mut dsi = vec![b' '; 648];
        dsi[0..3].copy_from_slice(b"DSI");
        bytes.extend_from_slice(&dsi);
        let mut acc = vec![b' '; 2700];
        acc[0..3].copy_from_slice(b"ACC");
        bytes.extend_from_slice(&acc);

        for x in 0..self.extent_x {
            let start = bytes.len();
            bytes.push(0xAA);
            bytes.extend_from_slice(&(x as u32).to_be_bytes()[1..4]);
            bytes.extend_from_slice(&(x as u16).to_be_bytes());
            bytes.extend_from_slice(&0u16.to_be_bytes());
            for s in 0..self.extent_y {
                bytes.extend_from_slice(&self.posts[x * self.extent_y + s].to_be_bytes());
            }
            let checksum: u32 = bytes[start..].iter().map(|&b| b as u32).sum();
            bytes.extend_from_slice(&checksum.to_be_bytes());
        }

        bytes
    }

    /// Write the cell under `root` at its level-specific relative path and
    /// return the full path.
    pub fn write_to(&self, root: &Path, level: u8) -> io::Result<PathBuf> {
        let path = root.join(cell_relative_path(level, self.lat, self.lng));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.build())?;
        Ok(path)
    }
}

/// `e|w` + 3-digit longitude directory, `n|s` + 2-digit latitude file with
/// a `.dt{level}` extension.
pub fn cell_relative_path(level: u8, lat: i32, lng: i32) -> PathBuf {
    PathBuf::from(format!(
        "{}{:03}",
        if lng < 0 { 'w' } else { 'e' },
        lng.unsigned_abs()
    ))
    .join(format!(
        "{}{:02}.dt{}",
        if lat < 0 { 's' } else { 'n' },
        lat.unsigned_abs(),
        level
    ))
}

/// MIL-PRF-89020B sign-magnitude post.
pub fn encode_signed_magnitude(meters: i16) -> u16 {
    let magnitude = meters.unsigned_abs() & 0x7FFF;
    if meters < 0 {
        0x8000 | magnitude
    } else {
        magnitude
    }
}

fn format_angle(degrees: i32, positive: char, negative: char, width: usize) -> [u8; 8] {
    let hemi = if degrees < 0 { negative } else { positive };
    let text = format!(
        "{:0width$}0000{}",
        degrees.unsigned_abs(),
        hemi,
        width = width
    );
    let mut out = [b'0'; 8];
    let src = text.as_bytes();
    let n = src.len().min(8);
    out[8 - n..].copy_from_slice(&src[src.len() - n..]);
    out
}

/// A temporary storage root populated with synthetic cells.
pub struct TerrainFixture {
    dir: TempDir,
}

impl TerrainFixture {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a cell at `level` and return its path.
    pub fn add_cell(&self, level: u8, cell: &DtedCellBuilder) -> io::Result<PathBuf> {
        cell.write_to(self.root(), level)
    }

    /// Write arbitrary bytes where a cell file would live.
    pub fn add_raw(&self, level: u8, lat: i32, lng: i32, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.root().join(cell_relative_path(level, lat, lng));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(path)
    }
}
