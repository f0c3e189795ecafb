//! Error types for overlay queries.

use grid_processor::GridProcessorError;
use thiserror::Error;
use viewshed::ViewshedError;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error(transparent)]
    Grid(#[from] GridProcessorError),

    #[error(transparent)]
    Viewshed(#[from] ViewshedError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The worker thread is gone and can take no more requests.
    #[error("overlay worker has shut down")]
    WorkerGone,
}

impl OverlayError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;
