//! Error types for gridding and masking.

use thiserror::Error;

/// Errors that can occur while building grids or analysing sweeps.
///
/// Cells that fail the acceptance thresholds are not errors; they come back
/// as masked cells.
#[derive(Error, Debug)]
pub enum SuperobError {
    /// Grid geometry parameters are malformed.
    #[error("invalid grid spec: {0}")]
    InvalidGridSpec(String),

    /// Two arrays that must align do not.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// The volume carries no field with this name.
    #[error("field not present in volume: {0}")]
    MissingField(String),

    /// Invalid volume structure.
    #[error("invalid volume: {0}")]
    InvalidVolume(String),

    /// Projection construction failed.
    #[error("projection error: {0}")]
    Projection(#[from] projection::ProjectionError),
}

impl SuperobError {
    /// Create an InvalidGridSpec error.
    pub fn invalid_grid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidGridSpec(msg.into())
    }

    /// Create a ShapeMismatch error from two array shapes.
    pub fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Create an InvalidVolume error.
    pub fn invalid_volume(msg: impl Into<String>) -> Self {
        Self::InvalidVolume(msg.into())
    }
}

/// Result type for gridding operations.
pub type Result<T> = std::result::Result<T, SuperobError>;
