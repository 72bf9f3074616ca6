//! Error types for schema loading.
//!
//! Every variant is a load-time failure. Once a schema has loaded, nothing
//! in this enum can happen again for it: encode and decode report their own
//! errors from the codec crate.

use std::path::PathBuf;

use crate::Width;

/// Errors that can occur while loading and validating a schema.
///
/// Variants name the offending message path, field, identifier or enum so
/// that a broken schema can be fixed from the message alone.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("failed to read schema file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema text is not JSON.
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document does not have the expected structure at `path`.
    #[error("malformed schema at `{path}`: {message}")]
    Shape { path: String, message: String },

    /// A field declares a datatype that is not one of the known kinds.
    #[error("field `{field}` of `{message}` has unknown datatype `{datatype}`")]
    UnknownType {
        message: String,
        field: String,
        datatype: String,
    },

    /// An `enum` field names an enum the schema does not define.
    #[error("field `{field}` of `{message}` refers to undefined enum `{name}`")]
    UnknownEnum {
        message: String,
        field: String,
        name: String,
    },

    /// A `message` field names a message the schema does not define.
    #[error(
        "field `{field}` of `{message}` refers to undefined message `{target}`"
    )]
    UnknownMessage {
        message: String,
        field: String,
        target: String,
    },

    /// Two fields of one message share a name.
    #[error("field `{field}` is declared more than once in `{message}`")]
    DuplicateField { message: String, field: String },

    /// A message contains itself through required, non-repeated fields, so
    /// no finite value of it exists.
    #[error("message `{path}` requires itself through nested fields")]
    RecursiveMessage { path: String },

    /// Two messages share an identifier.
    #[error("message id {id} is used by both `{first}` and `{second}`")]
    DuplicateId {
        id: u64,
        first: String,
        second: String,
    },

    /// An identifier does not fit the configured id header.
    #[error("message id {id} of `{path}` does not fit in a {width} id header")]
    IdOutOfRange { path: String, id: u64, width: Width },

    /// Two message definitions share a qualified path.
    #[error("message `{path}` is defined more than once")]
    DuplicatePath { path: String },

    /// Two enum definitions share a name.
    #[error("enum `{name}` is defined more than once")]
    DuplicateEnum { name: String },

    /// An enum member value does not fit the configured enum width.
    #[error("enum member `{member}` = {value} does not fit in a {width} enum")]
    EnumValueOutOfRange {
        member: String,
        value: u64,
        width: Width,
    },
}

impl SchemaError {
    pub(crate) fn shape(
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Shape {
            path: path.into(),
            message: message.into(),
        }
    }
}
