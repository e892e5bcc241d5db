//! Error types for the ingestion crate.

use obs_seq::ObsSeqError;
use superob::SuperobError;
use thiserror::Error;

/// Errors that can occur while processing a radar volume.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to decode volume {path}: {reason}")]
    DecodeFailure { path: String, reason: String },

    #[error("Insufficient data in {path}: {size} bytes, need {min_size}")]
    InsufficientData {
        path: String,
        size: u64,
        min_size: u64,
    },

    #[error("Dealiasing failed: {0}")]
    Dealias(String),

    #[error("Gridding failed: {0}")]
    Grid(#[from] SuperobError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] ObsSeqError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No input files: {0}")]
    NoInputs(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl IngestionError {
    pub fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
