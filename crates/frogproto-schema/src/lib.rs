//! Schema model and loader for frogproto.
//!
//! A frogproto schema is JSON data, not source code: a tree of namespaces
//! whose leaves are message definitions, plus optional enum definitions and
//! wire settings. This crate turns that data into a validated, immutable
//! [`SchemaModel`]:
//!
//! - **Loader** ([`SchemaLoader`], [`load`]): reads a file, JSON text or a
//!   parsed document and rejects broken schemas with a [`SchemaError`].
//! - **Model** ([`SchemaModel`], [`Namespace`]): message and enum tables,
//!   the namespace tree, and id/path indices.
//! - **Types** ([`MessageDefinition`], [`FieldDefinition`], [`FieldType`]):
//!   what one message looks like on the wire.
//! - **Config** ([`WireConfig`]): header widths and byte order.
//!
//! # Architecture
//!
//! ```text
//! JSON schema → Schema (SchemaModel) → Codec (bytes ↔ values) → Protocol handle
//! ```
//!
//! The schema layer knows nothing about bytes. It only guarantees that
//! whatever the codec is asked to do refers to types that exist.

mod audit;
mod config;
mod error;
mod loader;
mod model;
mod types;

pub use config::{ByteOrder, Width, WireConfig};
pub use error::SchemaError;
pub use loader::{SchemaLoader, SchemaSource, load};
pub use model::{Namespace, NamespaceEntry, SchemaModel};
pub use types::{
    EnumDefinition, EnumIndex, FieldDefinition, FieldType, MessageDefinition,
    MessageIndex, ScalarType,
};
