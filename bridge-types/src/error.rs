//! Error types for bridge data.

use thiserror::Error;

/// Errors raised while decoding or validating bridge data.
#[derive(Debug, Error)]
pub enum EntryError {
    /// Entry is not of the expected kind.
    #[error("wrong entry type: expected {expected}, got {actual}")]
    WrongType {
        /// Kind the caller asked for.
        expected: String,
        /// Kind found in the entry.
        actual: String,
    },

    /// JSON (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
