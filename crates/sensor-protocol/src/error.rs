//! Protocol Error Types

use thiserror::Error;

/// Errors raised while decoding sensor input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A `time:value` token could not be decoded
    #[error("Invalid reading pair: {0:?}")]
    InvalidPair(String),

    /// Data keyword without any readings
    #[error("{0} line carries no readings")]
    MissingReadings(&'static str),

    /// Line bytes are not valid UTF-8
    #[error("Line is not valid UTF-8")]
    InvalidUtf8,

    /// Pending line grew past the framing limit
    #[error("Line exceeds {0} bytes without a terminator")]
    LineTooLong(usize),
}
