//! Errors raised while encoding, decoding or restoring snapshots.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Failed to encode snapshot: {0}")]
    SerializationFailed(String),

    #[error("Failed to decode snapshot: {0}")]
    DeserializationFailed(String),

    #[error("Snapshot format version {found} is not supported (expected {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The snapshot names states or relations the chart does not have.
    #[error("Snapshot does not match the chart: {0}")]
    ValidationFailed(String),
}
