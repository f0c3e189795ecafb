//! Error types for grid processing.

use thiserror::Error;

/// Errors that abort a whole elevation query.
///
/// Per-cell DTED failures never surface here; they are logged and the
/// next detail level or storage root is tried.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// The AOI cannot be mapped onto the output grid.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GridProcessorError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<projection::ProjectionError> for GridProcessorError {
    fn from(err: projection::ProjectionError) -> Self {
        Self::Geometry(err.to_string())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
