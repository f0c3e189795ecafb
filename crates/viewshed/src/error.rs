//! Error types for viewshed analysis.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewshedError {
    #[error("viewshed grid is empty")]
    EmptyGrid,

    #[error("invalid cell spacing: {col} m x {row} m")]
    InvalidSpacing { col: f64, row: f64 },

    #[error("buffer holds {actual} values, expected {expected}")]
    GridSize { expected: usize, actual: usize },

    /// The observer's own cell has no elevation.
    #[error("no elevation at the observer position")]
    NoObserverElevation,
}

pub type Result<T> = std::result::Result<T, ViewshedError>;
