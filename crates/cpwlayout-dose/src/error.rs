use std::io;

use thiserror::Error;

use cpwlayout_core::DrawError;
use cpwlayout_io::GdsError;

#[derive(Error, Debug)]
pub enum DoseError {
    #[error("drawing failed: {0}")]
    Draw(#[from] DrawError),

    #[error("GDS export failed: {0}")]
    Gds(#[from] GdsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid chip config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("grid '{grid}': {reason}")]
    InvalidGrid { grid: String, reason: String },
}

impl DoseError {
    pub(crate) fn grid(grid: &str, reason: impl Into<String>) -> Self {
        DoseError::InvalidGrid {
            grid: grid.to_string(),
            reason: reason.into(),
        }
    }
}
