//! Common geographic types shared across the terrain overlay crates.

pub mod aoi;
pub mod bbox;
pub mod cancel;
pub mod geo;

pub use aoi::Aoi;
pub use bbox::{BboxParseError, BoundingBox};
pub use cancel::CancelToken;
pub use geo::{GeoPoint, Hemisphere};
