//! Error types for the codec layer.
//!
//! Two enums, one per direction of failure:
//!
//! - [`ValidationError`]: a caller tried to build a message whose values
//!   do not match the schema. Nothing was encoded.
//! - [`DecodeError`]: bytes could not be turned back into a message.
//!
//! Neither can be caused by the schema itself; schema problems are caught
//! at load time.

/// Errors raised while checking field values against a message definition.
///
/// `field` is a path into the message: `position`, `track.start.lat`, or
/// `points[3]` for an element of a repeated field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was not supplied.
    #[error("missing required field `{field}`")]
    MissingField { field: String },

    /// A supplied field is not part of the message definition.
    #[error("unknown field `{field}`")]
    UnexpectedField { field: String },

    /// The same field was supplied twice.
    #[error("field `{field}` was given more than once")]
    DuplicateField { field: String },

    /// A value does not have (and cannot be widened to) the declared type.
    #[error("field `{field}` expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    /// An enum value is not one of the enum's members.
    #[error("field `{field}`: {value} is not a member of enum `{enum_name}`")]
    NotAnEnumMember {
        field: String,
        enum_name: String,
        value: u32,
    },

    /// A string, byte sequence or list is longer than its length header
    /// can express.
    #[error("field `{field}` has length {len}, the length header allows at most {max}")]
    TooLong { field: String, len: usize, max: u64 },

    /// Nested message values go deeper than the configured limit.
    #[error("field `{field}` nests messages deeper than {max} levels")]
    TooDeep { field: String, max: usize },

    /// The message index was not minted by the codec's schema.
    #[error("message index {index} is not defined in this schema")]
    UnknownMessage { index: usize },
}

/// Errors raised while decoding bytes.
///
/// Offsets count from the first byte handed to the decoder, so for a
/// complete message they include the id header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The input ended before a value was complete.
    #[error("truncated input at byte {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The bytes are present but do not form a valid value: invalid UTF-8,
    /// a value outside its enum, a bad presence flag, and so on.
    #[error("malformed input at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// The id header names no message of this schema.
    #[error("unknown message id {id}")]
    UnknownMessageId { id: u64 },

    /// A complete message was decoded but input remains.
    #[error("{remaining} trailing bytes after message body at byte {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    /// The message index was not minted by the codec's schema.
    #[error("message index {index} is not defined in this schema")]
    UnknownMessage { index: usize },
}

impl DecodeError {
    /// Returns `true` for [`DecodeError::Truncated`].
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }

    /// Byte offset the error refers to, if it refers to one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Truncated { offset, .. }
            | Self::Malformed { offset, .. }
            | Self::TrailingBytes { offset, .. } => Some(*offset),
            Self::UnknownMessageId { .. } | Self::UnknownMessage { .. } => None,
        }
    }
}
