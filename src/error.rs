//! Error types for the error channel simulator.
//!
//! Every failure is a caller contract violation surfaced synchronously:
//! a malformed rate token, or a buffer whose shape does not match the
//! channel it is handed to.

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Rate token could not be parsed
    #[error("rate parse error: {0}")]
    Parse(#[from] ParseError),

    /// Construction or call-time argument violated the channel contract
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    /// Writing a status line failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rate token errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Token was empty or whitespace only
    #[error("empty rate token")]
    Empty,

    /// A part of the token is not a decimal number
    #[error("invalid number {part:?}")]
    InvalidNumber {
        /// Offending text
        part: String,
    },

    /// A part parsed, but to NaN or infinity
    #[error("non-finite rate {part:?}")]
    NonFinite {
        /// Offending text
        part: String,
    },

    /// More than one `:` separator
    #[error("too many separators in rate token")]
    TooManySeparators,
}

/// Channel contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    /// Channel length of zero
    #[error("channel length must be non-zero")]
    ZeroLength,

    /// No initial values were supplied
    #[error("initial values are missing")]
    MissingInitialValues,

    /// Buffer length differs from the channel length
    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Channel length
        expected: usize,
        /// Supplied length
        actual: usize,
    },
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
