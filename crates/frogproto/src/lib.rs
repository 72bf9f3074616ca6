//! # frogproto
//!
//! Schema-driven binary messages without code generation.
//!
//! A frogproto schema is a JSON document describing a tree of namespaced
//! messages, each with typed fields and a numeric identifier. Loading it
//! gives a [`Protocol`]; from there you get a [`MessageKind`] per message,
//! build [`MessageInstance`]s from named [`Value`]s, and encode or decode
//! them as `[id header][body]`.
//!
//! ## Quick Start
//!
//! ```rust
//! use frogproto::prelude::*;
//! use serde_json::json;
//!
//! let protocol = Protocol::load(json!({
//!     "PROTOCOL_NAME": "frog",
//!     "messages": { "Testing": { "System": {
//!         "TEXTMSG": [ { "name": "textdata", "datatype": "string" } ]
//!     } } }
//! }))?;
//!
//! let textmsg = protocol.kind("Testing.System.TEXTMSG").unwrap();
//! let hello = textmsg.construct([("textdata", "hi")])?;
//! let bytes = protocol.encode_message(&hello)?;
//!
//! let (_, decoded) = protocol.decode_message(&bytes)?;
//! assert_eq!(decoded.get("textdata"), Some(&Value::from("hi")));
//! # Ok::<(), FrogprotoError>(())
//! ```
//!
//! ## Crates
//!
//! - [`frogproto_schema`] loads and validates schemas.
//! - [`frogproto_codec`] holds values and the body codec.
//! - This crate ties them into a handle with message dispatch.

mod error;
mod kind;
mod protocol;
mod registry;

pub use error::FrogprotoError;
pub use kind::{AsKind, MessageInstance, MessageKind};
pub use protocol::{Messages, Protocol};
pub use registry::PayloadRegistry;

pub use frogproto_codec::{DecodeError, Fields, ValidationError, Value};
pub use frogproto_schema::{
    ByteOrder, SchemaError, SchemaLoader, SchemaSource, Width, WireConfig,
};

/// Re-exports for `use frogproto::prelude::*`.
pub mod prelude {
    pub use crate::{
        AsKind, DecodeError, Fields, FrogprotoError, MessageInstance,
        MessageKind, Protocol, SchemaLoader, ValidationError, Value,
        WireConfig,
    };
}
