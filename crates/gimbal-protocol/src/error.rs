//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when building outgoing frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload does not fit the single-byte size field.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed payload length.
        max: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// Encoded command is longer than the fixed command size.
    #[error("command too long: fixed size is {max} bytes, frame needs {actual}")]
    CommandTooLong {
        /// Fixed command size.
        max: usize,
        /// Length of the encoded frame.
        actual: usize,
    },
}
