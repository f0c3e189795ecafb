//! Line-of-sight visibility around an observer.
//!
//! Given an elevation grid centered on the observer, [`ViewshedCalculator`]
//! tags every cell as seen, unseen or out of range and colors the result
//! into an RGBA overlay.
//!
//! # Example
//!
//! ```
//! use terrain_common::CancelToken;
//! use viewshed::{ViewshedCalculator, ViewshedCell, ViewshedParams};
//!
//! let params = ViewshedParams::square(21, 500.0);
//! let elevation = vec![100.0f32; 21 * 21];
//! let mut rgba = vec![0u8; 4 * 21 * 21];
//!
//! let mut calc = ViewshedCalculator::new();
//! calc.calculate(&elevation, &params, &CancelToken::new(), &mut rgba).unwrap();
//! assert_eq!(calc.count(ViewshedCell::Seen), 21 * 21);
//! ```

pub mod calculator;
pub mod error;
pub mod slope;

pub use calculator::{
    ViewshedCalculator, ViewshedCell, ViewshedOutcome, ViewshedParams, SEEN_COLOR, UNSEEN_COLOR,
};
pub use error::{Result, ViewshedError};
pub use slope::SlopeAngle;
