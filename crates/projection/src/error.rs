use thiserror::Error;

/// Errors building a transform.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    /// The corners are duplicated or collinear, so no inverse exists.
    #[error("quad transform is not invertible: {0}")]
    NonInvertible(String),
}
