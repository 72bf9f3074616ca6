//! Message kinds and message instances.
//!
//! A [`MessageKind`] is the runtime stand-in for a generated message type:
//! a shared handle on the schema plus the index of one definition. A
//! [`MessageInstance`] is one concrete message of that kind. Both are
//! cheap to clone and safe to send between threads.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use frogproto_codec::{
    DecodeError, FieldCodec, Fields, Reader, Record, ValidationError, Value,
    Writer,
};
use frogproto_schema::{FieldDefinition, MessageDefinition, MessageIndex, SchemaModel};
use serde::ser::{Serialize, SerializeStruct, Serializer};

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// Handle on one message definition of a loaded protocol.
///
/// Two kinds are equal only if they come from the same loaded protocol
/// and name the same definition. Loading the same schema twice gives two
/// protocols whose kinds never compare equal.
#[derive(Clone)]
pub struct MessageKind {
    model: Arc<SchemaModel>,
    index: MessageIndex,
}

impl MessageKind {
    pub(crate) fn new(model: Arc<SchemaModel>, index: MessageIndex) -> Self {
        Self { model, index }
    }

    /// Identifier written in front of every encoded message of this kind.
    pub fn id(&self) -> u32 {
        self.definition().id
    }

    /// Fully qualified name, e.g. `Testing.System.TEXTMSG`.
    pub fn name(&self) -> &str {
        &self.definition().path
    }

    /// Last segment of the name, e.g. `TEXTMSG`.
    pub fn short_name(&self) -> &str {
        self.definition().name()
    }

    pub fn definition(&self) -> &MessageDefinition {
        self.model.message(self.index)
    }

    /// Field definitions in wire order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.definition().fields
    }

    pub fn doc(&self) -> Option<&str> {
        self.definition().doc.as_deref()
    }

    /// Builds a message of this kind from named values.
    ///
    /// ```rust
    /// use frogproto::{Protocol, Value};
    /// use serde_json::json;
    ///
    /// let protocol = Protocol::load(json!({
    ///     "messages": { "Chat": { "SAY": [ { "name": "text", "datatype": "string" } ] } }
    /// }))?;
    /// let say = protocol.kind("Chat.SAY").unwrap();
    /// let message = say.construct([("text", "hi")])?;
    /// assert_eq!(message.get("text"), Some(&Value::from("hi")));
    /// # Ok::<(), frogproto::FrogprotoError>(())
    /// ```
    pub fn construct<I, K, V>(&self, fields: I) -> Result<MessageInstance, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields: Fields = fields.into_iter().collect();
        let record = FieldCodec::new(&self.model).validate(self.index, fields)?;
        Ok(MessageInstance {
            kind: self.clone(),
            record,
        })
    }

    /// Decodes a body (no id header) that must span all of `bytes`.
    pub fn decode_body(&self, bytes: &[u8]) -> Result<MessageInstance, DecodeError> {
        let mut reader = Reader::new(bytes, self.model.wire().byte_order);
        let instance = self.read_body(&mut reader)?;
        if !reader.is_empty() {
            return Err(DecodeError::TrailingBytes {
                offset: reader.offset(),
                remaining: reader.remaining(),
            });
        }
        Ok(instance)
    }

    pub(crate) fn read_body(
        &self,
        reader: &mut Reader<'_>,
    ) -> Result<MessageInstance, DecodeError> {
        let record = FieldCodec::new(&self.model).decode(self.index, reader)?;
        Ok(MessageInstance {
            kind: self.clone(),
            record,
        })
    }

    /// Returns `true` if this kind was created from `model`.
    pub(crate) fn belongs_to(&self, model: &Arc<SchemaModel>) -> bool {
        Arc::ptr_eq(&self.model, model)
    }
}

impl PartialEq for MessageKind {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.index == other.index
    }
}

impl Eq for MessageKind {}

impl Hash for MessageKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.model).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageKind")
            .field("name", &self.name())
            .field("id", &self.id())
            .finish()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// MessageInstance
// ---------------------------------------------------------------------------

/// One message: a kind plus validated field values.
///
/// Instances are immutable. They are created by
/// [`MessageKind::construct`] or by decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInstance {
    kind: MessageKind,
    record: Record,
}

impl MessageInstance {
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn id(&self) -> u32 {
        self.kind.id()
    }

    /// The value of field `name` as stored, or `None` if the field does not
    /// exist or is an omitted optional field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let (position, _) = self.kind.definition().field(name)?;
        self.record.value(position)
    }

    /// Present fields in declared order.
    pub fn fields(&self) -> Fields {
        self.record.to_fields()
    }

    /// Full wire form: id header followed by the body.
    pub fn encode(&self) -> Vec<u8> {
        let wire = self.kind.model.wire();
        let capacity = wire.msgid.bytes() + self.kind.definition().min_size();
        let mut writer = Writer::with_capacity(capacity, wire.byte_order);
        writer.put_uint(wire.msgid, u64::from(self.id()));
        self.record.encode(&mut writer);
        tracing::trace!(message = %self.kind, len = writer.len(), "encoded");
        writer.into_bytes()
    }

    /// The body alone, without the id header.
    pub fn encode_body(&self) -> Vec<u8> {
        let mut writer = Writer::new(self.kind.model.wire().byte_order);
        self.record.encode(&mut writer);
        writer.into_bytes()
    }

    /// `{"msgid": <id>, "payload": {<field>: <value>, ...}}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "msgid": self.id(),
            "payload": self.fields(),
        })
    }
}

impl Serialize for MessageInstance {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut state = s.serialize_struct("MessageInstance", 2)?;
        state.serialize_field("msgid", &self.id())?;
        state.serialize_field("payload", &self.fields())?;
        state.end()
    }
}

/// Anything that names a message kind: the kind itself or an instance.
pub trait AsKind {
    fn as_kind(&self) -> &MessageKind;
}

impl AsKind for MessageKind {
    fn as_kind(&self) -> &MessageKind {
        self
    }
}

impl AsKind for MessageInstance {
    fn as_kind(&self) -> &MessageKind {
        &self.kind
    }
}
