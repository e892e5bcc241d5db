//! Error types for observation serialization.

use thiserror::Error;

/// Errors that can occur while writing or reading observation tables.
#[derive(Error, Debug)]
pub enum ObsSeqError {
    /// Writing the output table failed.
    #[error("failed to write observation table: {0}")]
    SerializationFailure(String),

    /// Reading a table failed.
    #[error("failed to read observation table: {0}")]
    ReadFailed(String),

    /// Table contents are inconsistent.
    #[error("invalid observation table: {0}")]
    InvalidTable(String),

    /// Secondary exchange writer failed.
    #[error("exchange writer failed: {0}")]
    Exchange(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObsSeqError {
    /// Create a SerializationFailure error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationFailure(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidTable error.
    pub fn invalid_table(msg: impl Into<String>) -> Self {
        Self::InvalidTable(msg.into())
    }
}

/// Result type for observation table operations.
pub type Result<T> = std::result::Result<T, ObsSeqError>;
