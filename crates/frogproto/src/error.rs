//! Unified error type for frogproto.

use frogproto_codec::{DecodeError, ValidationError};
use frogproto_schema::SchemaError;

/// Top-level error that wraps every layer's errors.
///
/// Operations on a [`Protocol`](crate::Protocol) return this, so callers
/// deal with one type; the `#[from]` variants let `?` convert layer errors.
#[derive(Debug, thiserror::Error)]
pub enum FrogprotoError {
    /// The schema could not be loaded.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Field values did not match a message definition.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Bytes could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A message kind or instance from one loaded protocol was handed to
    /// another.
    #[error("message kind `{kind}` belongs to a different protocol than `{protocol}`")]
    ForeignKind { kind: String, protocol: String },
}
