//! Projection errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// Standard parallels do not define a usable cone.
    #[error("invalid standard parallels ({latin1}, {latin2}): {reason}")]
    InvalidParallels {
        latin1: f64,
        latin2: f64,
        reason: String,
    },

    /// Projection origin is not a finite point strictly between the poles.
    #[error("invalid projection origin ({lat}, {lon})")]
    InvalidOrigin { lat: f64, lon: f64 },
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
