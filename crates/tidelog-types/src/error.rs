//! Error types for value conversion in tidelog-types.

use thiserror::Error;

/// Errors that can occur when converting or decoding sensor values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The hundredths component of a fixed-point pair was 100 or more.
    #[error("Invalid fraction: {hundredths} hundredths (must be below 100)")]
    InvalidFraction {
        /// The rejected hundredths value.
        hundredths: u64,
    },

    /// The scaled value does not fit in a `u64`.
    #[error("Fixed-point overflow: {whole}.{hundredths:02} does not fit in u64 hundredths")]
    Overflow {
        /// Whole part of the rejected value.
        whole: u64,
        /// Hundredths part of the rejected value.
        hundredths: u64,
    },

    /// Decimal text could not be parsed into a (whole, hundredths) pair.
    #[error("Invalid decimal '{0}': expected digits with at most two decimal places")]
    InvalidDecimal(String),

    /// Not enough bytes to decode a value.
    #[error("Insufficient bytes: expected {expected}, got {actual}")]
    InsufficientBytes {
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },
}

/// Result type alias using tidelog-types' CodecError type.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
