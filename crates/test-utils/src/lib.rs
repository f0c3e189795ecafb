//! Shared test utilities for the terrain overlay workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic DTED cell files written into temporary storage roots
//! - Elevation grid generators
//! - Common test fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{DtedCellBuilder, TerrainFixture};
//! ```

pub mod dted;
pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use dted::*;
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Asserts every value of an elevation grid is approximately `expected`.
///
/// NaN values fail the assertion.
#[macro_export]
macro_rules! assert_grid_approx_eq {
    ($grid:expr, $expected:expr, $epsilon:expr) => {{
        for (i, v) in $grid.iter().enumerate() {
            let v: f64 = *v as f64;
            let expected: f64 = $expected as f64;
            if !((v - expected).abs() <= $epsilon as f64) {
                panic!(
                    "assertion failed: grid[{}] = `{:?}` not within `{:?}` of `{:?}`",
                    i, v, $epsilon, expected
                );
            }
        }
    }};
}
