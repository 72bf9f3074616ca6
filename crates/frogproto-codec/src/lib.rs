//! Field values and the binary body codec for frogproto.
//!
//! This crate sits between the schema and the protocol handle:
//!
//! - **Values** ([`Value`], [`Fields`]): dynamically typed field values,
//!   since message layouts are only known at runtime.
//! - **Cursors** ([`Reader`], [`Writer`]): bounds-checked byte access in
//!   the schema's byte order.
//! - **Codec** ([`FieldCodec`], [`Record`]): checks values against a
//!   message definition and turns them into bytes and back.
//! - **Errors** ([`ValidationError`], [`DecodeError`]).
//!
//! It never writes the message id header; that belongs to the layer that
//! chooses which message to decode.

mod cursor;
mod error;
mod field;
mod value;

pub use cursor::{Reader, Writer};
pub use error::{DecodeError, ValidationError};
pub use field::{FieldCodec, Record};
pub use value::{Fields, Value};
