//! Errors encountered when decoding control messages.

use super::MessageType;
use crate::record::RecordDecodeError;

/// Errors raised when failing to decode a LISP control message.
///
/// All of these are local and recoverable: a receiver discards the malformed
/// message and carries on.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    /// The data is shorter than the message's fixed fields require.
    #[error("message is empty or was truncated")]
    TruncatedBuffer,
    /// A declared variable-length section exceeds the remaining buffer.
    #[error("declared length {declared} exceeds the {available} available bytes")]
    InconsistentLength {
        /// The length announced by the message.
        declared: usize,
        /// The bytes actually remaining in the buffer.
        available: usize,
    },
    /// The type nibble does not match the message being decoded.
    #[error("expected a {expected:?} type nibble but found {actual}")]
    MessageTypeMismatch {
        /// The message type the decoder was asked for.
        expected: MessageType,
        /// The nibble found on the wire.
        actual: u8,
    },
    /// An embedded mapping record could not be decoded.
    #[error("embedded mapping record could not be decoded: {0}")]
    RecordDecodeError(#[from] RecordDecodeError),
}
