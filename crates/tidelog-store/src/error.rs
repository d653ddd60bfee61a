//! Error types for tidelog-store.

use std::path::PathBuf;

use tidelog_types::{CodecError, DeviceId};

/// Result type for tidelog-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tidelog-store.
///
/// Every error aborts the whole operation: no bucket is created, no slot is
/// written and no notification is emitted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller is not allowed to write to the device.
    #[error("Unauthorized: {caller} may not write to device {device_id}")]
    Unauthorized { device_id: DeviceId, caller: String },

    /// A minute index outside 0-1439.
    #[error("Invalid minute index: {0} (must be below 1440)")]
    InvalidMinuteIndex(u64),

    /// A hundredths component of 100 or more.
    #[error("Invalid fraction: {hundredths} hundredths (must be below 100)")]
    InvalidFraction { hundredths: u64 },

    /// Any other value conversion failure.
    #[error("Codec error: {0}")]
    Codec(CodecError),

    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The database was written by a newer schema version.
    #[error("Unsupported schema version {found} (this build supports {supported})")]
    UnsupportedSchemaVersion { found: i32, supported: i32 },

    /// Device not found in database.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// A persisted bucket failed validation on load.
    #[error("Corrupt bucket for day {day_utc}: {reason}")]
    CorruptBucket { day_utc: u64, reason: String },

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidFraction { hundredths } => Error::InvalidFraction { hundredths },
            other => Error::Codec(other),
        }
    }
}
