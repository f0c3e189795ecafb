//! Error types for DTED cell access.

use thiserror::Error;

/// Result type alias using DtedError.
pub type DtedResult<T> = Result<T, DtedError>;

/// Errors raised while reading a single DTED cell.
///
/// Every variant is local to one cell: callers log it and move on to the
/// next detail level or storage root.
#[derive(Debug, Error)]
pub enum DtedError {
    /// Malformed header field.
    #[error("invalid DTED header: {0}")]
    Format(String),

    /// Open, seek or read failure.
    #[error("DTED I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk index past the end of the cell.
    #[error("chunk ({chunk_x}, {chunk_y}) outside cell with {chunks_x}x{chunks_y} chunks")]
    ChunkOutOfRange {
        chunk_x: usize,
        chunk_y: usize,
        chunks_x: usize,
        chunks_y: usize,
    },
}

impl DtedError {
    /// Create a Format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Whether the error came from the underlying file rather than its
    /// contents.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
