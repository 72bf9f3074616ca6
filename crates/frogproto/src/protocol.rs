//! The protocol handle and top-level message dispatch.
//!
//! A [`Protocol`] is what callers hold after loading a schema. It hands
//! out message kinds, and it owns the two operations that deal with the id
//! header: [`Protocol::encode_message`] and [`Protocol::decode_message`].

use std::sync::Arc;

use frogproto_codec::{DecodeError, Reader, Value};
use frogproto_schema::{
    Namespace, NamespaceEntry, SchemaLoader, SchemaModel, SchemaSource, WireConfig,
};

use crate::{AsKind, FrogprotoError, MessageInstance, MessageKind, PayloadRegistry};

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// A loaded protocol.
///
/// Cloning is cheap and every clone refers to the same schema. Protocols
/// loaded separately are isolated from each other, even when loaded from
/// the same document.
///
/// ```rust
/// use frogproto::Protocol;
/// use serde_json::json;
///
/// let protocol = Protocol::load(json!({
///     "messages": { "Testing": { "System": {
///         "TEXTMSG": [ { "name": "textdata", "datatype": "string" } ]
///     } } }
/// }))?;
///
/// let textmsg = protocol.messages().namespace("Testing")
///     .and_then(|ns| ns.namespace("System"))
///     .and_then(|ns| ns.kind("TEXTMSG"))
///     .unwrap();
/// let bytes = protocol.encode_message(&textmsg.construct([("textdata", "hi")])?)?;
///
/// let (kind, message) = protocol.decode_message(&bytes)?;
/// assert_eq!(kind, textmsg);
/// assert_eq!(protocol.messageid(&message)?, 1);
/// # Ok::<(), frogproto::FrogprotoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Protocol {
    model: Arc<SchemaModel>,
}

impl Protocol {
    /// Loads a schema from a file path, JSON text or a parsed document.
    pub fn load(source: impl Into<SchemaSource>) -> Result<Self, FrogprotoError> {
        Self::load_with(&SchemaLoader::new(), source)
    }

    /// Loads a schema through a configured loader.
    pub fn load_with(
        loader: &SchemaLoader,
        source: impl Into<SchemaSource>,
    ) -> Result<Self, FrogprotoError> {
        Ok(Self::from_model(loader.load(source)?))
    }

    pub fn from_model(model: SchemaModel) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    /// `PROTOCOL_NAME` of the schema.
    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// `PROTOCOL_VERSION` of the schema.
    pub fn version(&self) -> u32 {
        self.model.version()
    }

    pub fn wire(&self) -> &WireConfig {
        self.model.wire()
    }

    pub fn model(&self) -> &SchemaModel {
        &self.model
    }

    pub fn registry(&self) -> PayloadRegistry<'_> {
        PayloadRegistry::new(&self.model)
    }

    // -- kinds --------------------------------------------------------------

    /// Root of the message namespace tree.
    pub fn messages(&self) -> Messages<'_> {
        Messages {
            model: &self.model,
            namespace: self.model.root(),
        }
    }

    /// Kind at qualified path `path`, e.g. `Testing.System.TEXTMSG`.
    pub fn kind(&self, path: &str) -> Option<MessageKind> {
        self.registry().name_to_kind(path)
    }

    /// Every kind, ordered by identifier.
    pub fn kinds(&self) -> Vec<MessageKind> {
        self.registry().kinds()
    }

    /// Identifier of a kind, or of an instance's kind.
    pub fn messageid(&self, of: &impl AsKind) -> Result<u32, FrogprotoError> {
        self.registry().kind_to_id(of.as_kind())
    }

    /// Qualified name of the message with identifier `id`.
    pub fn message_str_from_id(&self, id: u32) -> Option<&str> {
        self.registry().id_to_name(id)
    }

    // -- enums --------------------------------------------------------------

    /// Value of `member` in enum `enum_name`, ready to use as a field value.
    pub fn enum_member(&self, enum_name: &str, member: &str) -> Option<Value> {
        let index = self.model.enum_by_name(enum_name)?;
        self.model.enum_def(index).value_of(member).map(Value::Enum)
    }

    /// Canonical member name of `value` in enum `enum_name`.
    pub fn enum_name(&self, enum_name: &str, value: u32) -> Option<&str> {
        let index = self.model.enum_by_name(enum_name)?;
        self.model.enum_def(index).name_of(value)
    }

    // -- dispatch -----------------------------------------------------------

    /// Encodes `message` with its id header.
    ///
    /// Fails with [`FrogprotoError::ForeignKind`] if `message` was built
    /// from a different protocol.
    pub fn encode_message(&self, message: &MessageInstance) -> Result<Vec<u8>, FrogprotoError> {
        self.registry().kind_to_id(message.kind())?;
        Ok(message.encode())
    }

    /// Decodes one complete message: id header, then body, then nothing.
    pub fn decode_message(
        &self,
        bytes: &[u8],
    ) -> Result<(MessageKind, MessageInstance), FrogprotoError> {
        match self.dispatch(bytes) {
            Ok(message) => {
                tracing::trace!(message = %message.kind(), len = bytes.len(), "decoded");
                Ok((message.kind().clone(), message))
            }
            Err(e) => {
                tracing::debug!(error = %e, len = bytes.len(), "decode failed");
                Err(e.into())
            }
        }
    }

    fn dispatch(&self, bytes: &[u8]) -> Result<MessageInstance, DecodeError> {
        let wire = self.model.wire();
        let mut reader = Reader::new(bytes, wire.byte_order);

        let id = reader.get_uint(wire.msgid)?;
        let kind = u32::try_from(id)
            .ok()
            .and_then(|id| self.registry().id_to_kind(id))
            .ok_or(DecodeError::UnknownMessageId { id })?;

        let message = kind.read_body(&mut reader)?;
        if !reader.is_empty() {
            return Err(DecodeError::TrailingBytes {
                offset: reader.offset(),
                remaining: reader.remaining(),
            });
        }
        Ok(message)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A view of one namespace of a protocol's message tree.
#[derive(Debug, Clone, Copy)]
pub struct Messages<'a> {
    model: &'a Arc<SchemaModel>,
    namespace: &'a Namespace,
}

impl<'a> Messages<'a> {
    /// Dotted path of this namespace; empty at the root.
    pub fn path(&self) -> &'a str {
        self.namespace.path()
    }

    /// Child namespace `name`.
    pub fn namespace(&self, name: &str) -> Option<Messages<'a>> {
        let namespace: &'a Namespace = self.namespace;
        Some(Messages {
            model: self.model,
            namespace: namespace.namespace(name)?,
        })
    }

    /// Message kind `name` directly inside this namespace.
    pub fn kind(&self, name: &str) -> Option<MessageKind> {
        let index = self.namespace.message(name)?;
        Some(MessageKind::new(Arc::clone(self.model), index))
    }

    /// Names of the child entries, in schema order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        let namespace: &'a Namespace = self.namespace;
        namespace.entries().map(|(name, _)| name)
    }

    /// Message kinds directly inside this namespace, in schema order.
    pub fn kinds(&self) -> impl Iterator<Item = MessageKind> + 'a {
        let model = self.model;
        let namespace: &'a Namespace = self.namespace;
        namespace.entries().filter_map(move |(_, entry)| match entry {
            NamespaceEntry::Message(index) => Some(MessageKind::new(Arc::clone(model), *index)),
            NamespaceEntry::Namespace(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn protocol() -> Protocol {
        Protocol::load(json!({
            "PROTOCOL_NAME": "frog",
            "PROTOCOL_VERSION": 3,
            "enums": { "FlightMode": { "MANUAL": 0, "LOITER": 1, "HOLD": 1 } },
            "messages": {
                "Testing": {
                    "System": {
                        "TEXTMSG": [ { "name": "textdata", "datatype": "string" } ],
                        "MODE": [ { "name": "FlightMode", "datatype": "enum" } ]
                    },
                    "EMPTY": []
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_name_and_version() {
        let p = protocol();
        assert_eq!(p.name(), "frog");
        assert_eq!(p.version(), 3);
    }

    #[test]
    fn test_namespace_navigation() {
        let p = protocol();
        let testing = p.messages().namespace("Testing").unwrap();
        assert_eq!(testing.path(), "Testing");
        assert_eq!(testing.names().collect::<Vec<_>>(), vec!["System", "EMPTY"]);

        let kinds: Vec<String> = testing.kinds().map(|k| k.name().to_string()).collect();
        assert_eq!(kinds, vec!["Testing.EMPTY"]);

        let system = testing.namespace("System").unwrap();
        assert_eq!(system.kind("MODE"), p.kind("Testing.System.MODE"));
        assert!(system.kind("System").is_none());
        assert!(testing.namespace("EMPTY").is_none());
    }

    #[test]
    fn test_enum_helpers() {
        let p = protocol();
        assert_eq!(p.enum_member("FlightMode", "HOLD"), Some(Value::Enum(1)));
        assert_eq!(p.enum_name("FlightMode", 1), Some("LOITER"));
        assert_eq!(p.enum_member("FlightMode", "RTL"), None);
        assert_eq!(p.enum_name("Nope", 0), None);
    }

    #[test]
    fn test_messageid_and_name_agree() {
        let p = protocol();
        for kind in p.kinds() {
            let id = p.messageid(&kind).unwrap();
            assert_eq!(p.message_str_from_id(id), Some(kind.name()));
        }
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let p = protocol();
        let empty = p.kind("Testing.EMPTY").unwrap();
        let message = empty.construct(Vec::<(String, Value)>::new()).unwrap();
        let mut bytes = p.encode_message(&message).unwrap();
        bytes.push(0);
        let err = p.decode_message(&bytes).unwrap_err();
        assert!(matches!(
            err,
            FrogprotoError::Decode(DecodeError::TrailingBytes { offset: 2, remaining: 1 })
        ));
    }

    #[test]
    fn test_unknown_id_in_u8_header() {
        let p = Protocol::load_with(
            &SchemaLoader::new().wire_config(WireConfig {
                msgid: frogproto_schema::Width::U8,
                ..WireConfig::default()
            }),
            json!({ "messages": { "M": [] } }),
        )
        .unwrap();
        let err = p.decode_message(&[7]).unwrap_err();
        assert!(matches!(
            err,
            FrogprotoError::Decode(DecodeError::UnknownMessageId { id: 7 })
        ));
    }
}
