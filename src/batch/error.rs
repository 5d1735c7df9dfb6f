//! Error types for batch processing operations.

use crate::AudioEventError;
use thiserror::Error;

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur during batch processing.
#[derive(Error, Debug)]
pub enum BatchError {
    /// An error occurred while processing a specific item in the batch.
    #[error("Error processing item {index}: {source}")]
    ItemError {
        /// The index of the item that failed.
        index: usize,
        /// The underlying error.
        source: AudioEventError,
    },

    /// Invalid batch configuration.
    #[error("Invalid batch configuration: {message}")]
    InvalidConfiguration {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Per-item outputs that must line up do not.
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch {
        /// Which outputs disagree.
        message: String,
    },

    /// The executor could not be set up.
    #[error("Executor error: {message}")]
    ExecutorError {
        /// Description of the failure.
        message: String,
    },
}

impl BatchError {
    /// Create a new item error.
    pub fn item_error(index: usize, source: AudioEventError) -> Self {
        Self::ItemError { index, source }
    }

    /// Create a new invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(message: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
        }
    }

    /// Create a new executor error.
    pub fn executor_error(message: impl Into<String>) -> Self {
        Self::ExecutorError {
            message: message.into(),
        }
    }
}
