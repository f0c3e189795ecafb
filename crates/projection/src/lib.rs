//! Coordinate transformations between geographic and image space.
//!
//! A viewport footprint is an arbitrary quadrilateral on the map. Mapping
//! it onto a `width × height` image needs a full projective (homography)
//! transform rather than an affine one, since a tilted view turns the
//! rectangle into a trapezoid.

pub mod error;
pub mod quad;

pub use error::ProjectionError;
pub use quad::QuadTransform;
