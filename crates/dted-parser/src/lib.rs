//! DTED terrain cell reader (MIL-PRF-89020B).
//!
//! A DTED cell covers one 1°×1° square. The file starts with fixed-size
//! header blocks (UHL, DSI, ACC) followed by one data record per longitude
//! line. Each record holds the elevation posts of that line from south to
//! north as big-endian 16-bit samples.
//!
//! This crate reads the two header fields needed to address samples, returns
//! single interpolated heights, and bulk-loads rectangular chunks of posts
//! flipped into image order (row 0 is the northern-most row).

pub mod chunk;
pub mod encoding;
pub mod error;
pub mod header;
pub mod path;
pub mod reader;

pub use chunk::Chunk;
pub use encoding::{is_elev_valid, SampleEncoding};
pub use error::{DtedError, DtedResult};
pub use header::DtedHeader;
pub use path::relative_path;
pub use reader::DtedReader;

/// Byte offset of the longitude/latitude line counts inside the UHL.
pub const EXTENTS_OFFSET: u64 = 47;

/// Length of the UHL block.
pub const UHL_LEN: usize = 80;

/// Length of the DSI block.
pub const DSI_LEN: usize = 648;

/// Length of the ACC block.
pub const ACC_LEN: usize = 2700;

/// Offset of the first data record (UHL + DSI + ACC).
pub const DATA_OFFSET: u64 = (UHL_LEN + DSI_LEN + ACC_LEN) as u64;

/// Sentinel, block count, longitude count and latitude count.
pub const RECORD_PREFIX_LEN: usize = 8;

/// Trailing checksum.
pub const RECORD_SUFFIX_LEN: usize = 4;

/// Data record sentinel byte.
pub const RECORD_SENTINEL: u8 = 0xAA;

/// Default chunk edge in samples.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Number of detail levels searched (`.dt0` through `.dt3`).
pub const NUM_LEVELS: usize = 4;
