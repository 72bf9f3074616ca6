//! The field codec: validation, encoding and decoding of message bodies.
//!
//! A message body is its fields in declared order, each written as:
//!
//! ```text
//! [presence: u8, optional fields only]
//! [count: length width, repeated fields only]
//! value...
//! ```
//!
//! where a value is a fixed-width number, a one-byte bool, a
//! length-prefixed string or byte sequence, an enum value in the enum
//! width, or a nested message body. No field names or tags are written;
//! both sides rely on the shared schema for the layout.
//!
//! Values reach the encoder only through a [`Record`], and the only ways to
//! get a `Record` are [`FieldCodec::validate`] and [`FieldCodec::decode`].
//! A record keeps the schema it was checked against and is always written
//! with that schema, so encoding cannot fail.

use std::fmt;
use std::sync::Arc;

use frogproto_schema::{
    FieldDefinition, FieldType, MessageDefinition, MessageIndex, ScalarType,
    SchemaModel,
};

use crate::cursor::{Reader, Writer};
use crate::value::{Fields, Value};
use crate::{DecodeError, ValidationError};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Validated field values of one message, one slot per declared field.
///
/// Slots of omitted optional fields are `None`; every other slot holds a
/// value of exactly the declared type. Nested message values are stored
/// as [`Fields`] in declared order.
#[derive(Clone)]
pub struct Record {
    model: Arc<SchemaModel>,
    message: MessageIndex,
    values: Vec<Option<Value>>,
}

impl Record {
    /// The message definition these values belong to.
    pub fn message(&self) -> MessageIndex {
        self.message
    }

    pub fn definition(&self) -> &MessageDefinition {
        self.model.message(self.message)
    }

    /// Value at a field's wire position, if present.
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.values.get(position)?.as_ref()
    }

    /// The present values as named fields, in declared order.
    pub fn to_fields(&self) -> Fields {
        named(self.definition(), self.values.iter().cloned())
    }

    /// Appends the body of this record to `writer`.
    pub fn encode(&self, writer: &mut Writer) {
        FieldCodec::new(&self.model).write_body(
            self.definition(),
            self.values.iter().map(Option::as_ref),
            writer,
        );
    }
}

/// Same values for the same message of the same loaded schema.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
            && self.message == other.message
            && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("message", &self.definition().path)
            .field("values", &self.values)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FieldCodec
// ---------------------------------------------------------------------------

/// Validates, encodes and decodes message bodies of one schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldCodec<'a> {
    model: &'a Arc<SchemaModel>,
}

impl<'a> FieldCodec<'a> {
    pub fn new(model: &'a Arc<SchemaModel>) -> Self {
        Self { model }
    }

    fn record(&self, message: MessageIndex, values: Vec<Option<Value>>) -> Record {
        Record {
            model: Arc::clone(self.model),
            message,
            values,
        }
    }

    // -- validation ---------------------------------------------------------

    /// Checks `fields` against a message definition.
    ///
    /// Fields may be supplied in any order. Numeric values are widened to
    /// the declared type where that is lossless; anything else that does
    /// not match is an error naming the offending field path.
    pub fn validate(
        &self,
        message: MessageIndex,
        fields: Fields,
    ) -> Result<Record, ValidationError> {
        if !self.model.contains(message) {
            return Err(ValidationError::UnknownMessage {
                index: message.get(),
            });
        }
        let values = self.check_message(message, fields, "", 0)?;
        Ok(self.record(message, values))
    }

    fn check_message(
        &self,
        index: MessageIndex,
        fields: Fields,
        prefix: &str,
        depth: usize,
    ) -> Result<Vec<Option<Value>>, ValidationError> {
        let definition = self.model.message(index);
        let mut slots: Vec<Option<Value>> = vec![None; definition.fields.len()];

        for (name, value) in fields {
            let path = join(prefix, &name);
            let Some((position, field)) = definition.field(&name) else {
                return Err(ValidationError::UnexpectedField { field: path });
            };
            if slots[position].is_some() {
                return Err(ValidationError::DuplicateField { field: path });
            }
            slots[position] = Some(self.check_field(field, value, &path, depth)?);
        }

        for (field, slot) in definition.fields.iter().zip(&slots) {
            if slot.is_none() && !field.optional {
                return Err(ValidationError::MissingField {
                    field: join(prefix, &field.name),
                });
            }
        }
        Ok(slots)
    }

    fn check_field(
        &self,
        field: &FieldDefinition,
        value: Value,
        path: &str,
        depth: usize,
    ) -> Result<Value, ValidationError> {
        if !field.repeated {
            return self.check_value(field.ty, value, path, depth);
        }
        let items = match value {
            Value::List(items) => items,
            other => {
                return Err(ValidationError::TypeMismatch {
                    field: path.to_string(),
                    expected: format!("list of {}", self.type_name(field.ty)),
                    found: other.kind_name(),
                });
            }
        };
        self.check_len(items.len(), path)?;
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                self.check_value(field.ty, item, &format!("{path}[{i}]"), depth)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn check_value(
        &self,
        ty: FieldType,
        value: Value,
        path: &str,
        depth: usize,
    ) -> Result<Value, ValidationError> {
        let mismatch = |found: &Value| ValidationError::TypeMismatch {
            field: path.to_string(),
            expected: self.type_name(ty),
            found: found.kind_name(),
        };

        match ty {
            FieldType::Scalar(scalar) => {
                let value = value.widen(scalar).map_err(|v| mismatch(&v))?;
                match &value {
                    Value::Text(s) => self.check_len(s.len(), path)?,
                    Value::Bytes(b) => self.check_len(b.len(), path)?,
                    _ => {}
                }
                Ok(value)
            }
            FieldType::Enum(index) => {
                let raw = match value {
                    Value::Enum(v) | Value::U32(v) => v,
                    Value::U8(v) => v.into(),
                    Value::U16(v) => v.into(),
                    other => return Err(mismatch(&other)),
                };
                let definition = self.model.enum_def(index);
                if !definition.contains(raw) {
                    return Err(ValidationError::NotAnEnumMember {
                        field: path.to_string(),
                        enum_name: definition.name.clone(),
                        value: raw,
                    });
                }
                Ok(Value::Enum(raw))
            }
            FieldType::Message(index) => {
                let fields = match value {
                    Value::Message(fields) => fields,
                    other => return Err(mismatch(&other)),
                };
                let max = self.model.wire().max_depth;
                if depth + 1 > max {
                    return Err(ValidationError::TooDeep {
                        field: path.to_string(),
                        max,
                    });
                }
                let slots = self.check_message(index, fields, path, depth + 1)?;
                Ok(Value::Message(named(self.model.message(index), slots)))
            }
        }
    }

    fn check_len(&self, len: usize, path: &str) -> Result<(), ValidationError> {
        let max = self.model.wire().length.max_value();
        match u64::try_from(len) {
            Ok(n) if n <= max => Ok(()),
            _ => Err(ValidationError::TooLong {
                field: path.to_string(),
                len,
                max,
            }),
        }
    }

    fn type_name(&self, ty: FieldType) -> String {
        match ty {
            FieldType::Scalar(scalar) => scalar.name().to_string(),
            FieldType::Enum(index) => {
                format!("enum {}", self.model.enum_def(index).name)
            }
            FieldType::Message(index) => {
                format!("message {}", self.model.message(index).path)
            }
        }
    }

    // -- encoding -----------------------------------------------------------

    /// Appends the body of `record` to `writer`.
    ///
    /// The record is written with the schema it was validated or decoded
    /// against; see [`Record::encode`].
    pub fn encode(&self, record: &Record, writer: &mut Writer) {
        record.encode(writer);
    }

    fn write_body<'v>(
        &self,
        definition: &MessageDefinition,
        values: impl IntoIterator<Item = Option<&'v Value>>,
        writer: &mut Writer,
    ) {
        for (field, value) in definition.fields.iter().zip(values) {
            match value {
                Some(value) => {
                    if field.optional {
                        writer.put_u8(1);
                    }
                    self.write_field(field, value, writer);
                }
                None if field.optional => writer.put_u8(0),
                None => unreachable!(
                    "validated record lacks required field `{}`",
                    field.name
                ),
            }
        }
    }

    fn write_field(&self, field: &FieldDefinition, value: &Value, writer: &mut Writer) {
        match value {
            Value::List(items) if field.repeated => {
                self.write_len(items.len(), writer);
                for item in items {
                    self.write_value(field.ty, item, writer);
                }
            }
            _ => self.write_value(field.ty, value, writer),
        }
    }

    fn write_value(&self, ty: FieldType, value: &Value, writer: &mut Writer) {
        let wire = self.model.wire();
        match value {
            Value::U8(v) => writer.put_u8(*v),
            Value::U16(v) => writer.put_u16(*v),
            Value::U32(v) => writer.put_u32(*v),
            Value::U64(v) => writer.put_u64(*v),
            Value::I8(v) => writer.put_i8(*v),
            Value::I16(v) => writer.put_i16(*v),
            Value::I32(v) => writer.put_i32(*v),
            Value::I64(v) => writer.put_i64(*v),
            Value::F32(v) => writer.put_f32(*v),
            Value::F64(v) => writer.put_f64(*v),
            Value::Bool(v) => writer.put_u8(u8::from(*v)),
            Value::Text(s) => {
                self.write_len(s.len(), writer);
                writer.put_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                self.write_len(b.len(), writer);
                writer.put_slice(b);
            }
            Value::Enum(v) => writer.put_uint(wire.enum_width, u64::from(*v)),
            Value::Message(fields) => {
                let FieldType::Message(index) = ty else {
                    unreachable!("message value under a {ty:?} field");
                };
                let definition = self.model.message(index);
                let values = definition.fields.iter().map(|f| fields.get(&f.name));
                self.write_body(definition, values, writer);
            }
            Value::List(_) => unreachable!("list value under a non-repeated field"),
        }
    }

    fn write_len(&self, len: usize, writer: &mut Writer) {
        // Lengths were checked against the header width during validation.
        writer.put_uint(self.model.wire().length, len as u64);
    }

    // -- decoding -----------------------------------------------------------

    /// Reads the body of a `message` from `reader`.
    ///
    /// Consumes exactly the bytes [`FieldCodec::encode`] would have
    /// written; anything after them is left in the reader.
    pub fn decode(
        &self,
        message: MessageIndex,
        reader: &mut Reader<'_>,
    ) -> Result<Record, DecodeError> {
        if !self.model.contains(message) {
            return Err(DecodeError::UnknownMessage {
                index: message.get(),
            });
        }
        let values = self.read_body(message, reader, 0)?;
        Ok(self.record(message, values))
    }

    fn read_body(
        &self,
        index: MessageIndex,
        reader: &mut Reader<'_>,
        depth: usize,
    ) -> Result<Vec<Option<Value>>, DecodeError> {
        self.model
            .message(index)
            .fields
            .iter()
            .map(|field| self.read_field(field, reader, depth))
            .collect()
    }

    fn read_field(
        &self,
        field: &FieldDefinition,
        reader: &mut Reader<'_>,
        depth: usize,
    ) -> Result<Option<Value>, DecodeError> {
        if field.optional {
            let offset = reader.offset();
            match reader.get_u8()? {
                0 => return Ok(None),
                1 => {}
                flag => {
                    return Err(DecodeError::Malformed {
                        offset,
                        reason: format!(
                            "presence flag {flag} for field `{}`",
                            field.name
                        ),
                    });
                }
            }
        }
        if !field.repeated {
            return self.read_value(field.ty, reader, depth).map(Some);
        }
        let count = self.read_len(reader)?;
        // The loader rejects lists of zero-sized elements, so a count the
        // remaining input cannot hold is caught here before any allocation.
        let element = self.model.min_value_size(field.ty);
        reader.ensure(count.saturating_mul(element))?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_value(field.ty, reader, depth)?);
        }
        Ok(Some(Value::List(items)))
    }

    fn read_value(
        &self,
        ty: FieldType,
        reader: &mut Reader<'_>,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        match ty {
            FieldType::Scalar(scalar) => self.read_scalar(scalar, reader),
            FieldType::Enum(index) => {
                let offset = reader.offset();
                let raw = reader.get_uint(self.model.wire().enum_width)?;
                let definition = self.model.enum_def(index);
                u32::try_from(raw)
                    .ok()
                    .filter(|v| definition.contains(*v))
                    .map(Value::Enum)
                    .ok_or_else(|| DecodeError::Malformed {
                        offset,
                        reason: format!(
                            "{raw} is not a member of enum `{}`",
                            definition.name
                        ),
                    })
            }
            FieldType::Message(index) => {
                let max = self.model.wire().max_depth;
                if depth + 1 > max {
                    return Err(DecodeError::Malformed {
                        offset: reader.offset(),
                        reason: format!("messages nested deeper than {max} levels"),
                    });
                }
                let slots = self.read_body(index, reader, depth + 1)?;
                Ok(Value::Message(named(self.model.message(index), slots)))
            }
        }
    }

    fn read_scalar(
        &self,
        scalar: ScalarType,
        reader: &mut Reader<'_>,
    ) -> Result<Value, DecodeError> {
        let value = match scalar {
            ScalarType::U8 => Value::U8(reader.get_u8()?),
            ScalarType::U16 => Value::U16(reader.get_u16()?),
            ScalarType::U32 => Value::U32(reader.get_u32()?),
            ScalarType::U64 => Value::U64(reader.get_u64()?),
            ScalarType::I8 => Value::I8(reader.get_i8()?),
            ScalarType::I16 => Value::I16(reader.get_i16()?),
            ScalarType::I32 => Value::I32(reader.get_i32()?),
            ScalarType::I64 => Value::I64(reader.get_i64()?),
            ScalarType::F32 => Value::F32(reader.get_f32()?),
            ScalarType::F64 => Value::F64(reader.get_f64()?),
            ScalarType::Bool => Value::Bool(reader.get_u8()? != 0),
            ScalarType::Text => {
                let len = self.read_len(reader)?;
                let start = reader.offset();
                let bytes = reader.get_slice(len)?;
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    DecodeError::Malformed {
                        offset: start + e.valid_up_to(),
                        reason: "invalid UTF-8 in string".to_string(),
                    }
                })?;
                Value::Text(text.to_string())
            }
            ScalarType::Bytes => {
                let len = self.read_len(reader)?;
                Value::Bytes(reader.get_slice(len)?.to_vec())
            }
        };
        Ok(value)
    }

    fn read_len(&self, reader: &mut Reader<'_>) -> Result<usize, DecodeError> {
        let offset = reader.offset();
        let len = reader.get_uint(self.model.wire().length)?;
        usize::try_from(len).map_err(|_| DecodeError::Malformed {
            offset,
            reason: format!("length {len} does not fit in memory"),
        })
    }
}

/// Pairs slot values with their field names, dropping absent ones.
fn named(
    definition: &MessageDefinition,
    slots: impl IntoIterator<Item = Option<Value>>,
) -> Fields {
    definition
        .fields
        .iter()
        .zip(slots)
        .filter_map(|(field, slot)| slot.map(|v| (field.name.clone(), v)))
        .collect()
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use frogproto_schema::{ByteOrder, SchemaLoader, WireConfig, Width, load};
    use serde_json::json;

    use super::*;

    fn model() -> Arc<SchemaModel> {
        let model = load(json!({
            "enums": { "Mode": { "OFF": 0, "ON": 1, "AUTO": 7 } },
            "messages": {
                "Geo": {
                    "Point": [
                        { "name": "lat", "datatype": "i32" },
                        { "name": "lon", "datatype": "i32" }
                    ]
                },
                "Test": {
                    "Sample": [
                        { "name": "count", "datatype": "u16" },
                        { "name": "label", "datatype": "string", "optional": true },
                        { "name": "mode", "datatype": "enum", "enum": "Mode" },
                        { "name": "points", "datatype": "message",
                          "message": "Geo.Point", "repeated": true }
                    ],
                    "Tree": [
                        { "name": "value", "datatype": "u8" },
                        { "name": "child", "datatype": "message",
                          "message": "Test.Tree", "optional": true }
                    ]
                }
            }
        }))
        .unwrap();
        Arc::new(model)
    }

    fn index(model: &SchemaModel, path: &str) -> MessageIndex {
        model.index_of_path(path).unwrap()
    }

    fn point(lat: i32, lon: i32) -> Value {
        Value::Message(Fields::new().with("lat", lat).with("lon", lon))
    }

    fn sample_fields() -> Fields {
        Fields::new()
            .with("mode", Value::Enum(1))
            .with("count", 513u16)
            .with("points", vec![point(1, -1)])
    }

    fn encode(model: &Arc<SchemaModel>, record: &Record) -> Vec<u8> {
        let mut w = Writer::new(model.wire().byte_order);
        FieldCodec::new(model).encode(record, &mut w);
        w.into_bytes()
    }

    // -- validation ---------------------------------------------------------

    #[test]
    fn test_validate_reorders_into_declared_slots() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let record = codec
            .validate(index(&model, "Test.Sample"), sample_fields())
            .unwrap();
        assert_eq!(record.value(0), Some(&Value::U16(513)));
        assert_eq!(record.value(1), None);
        assert_eq!(record.value(2), Some(&Value::Enum(1)));

        let names: Vec<String> = record
            .to_fields()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["count", "mode", "points"]);
    }

    #[test]
    fn test_validate_widens_losslessly() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let fields = Fields::new()
            .with("count", 7u8)
            .with("mode", 7u8)
            .with("points", Vec::<Value>::new());
        let record = codec.validate(index(&model, "Test.Sample"), fields).unwrap();
        assert_eq!(record.value(0), Some(&Value::U16(7)));
        assert_eq!(record.value(2), Some(&Value::Enum(7)));
    }

    #[test]
    fn test_validate_rejects_narrowing() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let fields = sample_fields();
        let fields: Fields = fields
            .into_iter()
            .map(|(n, v)| if n == "count" { (n, Value::U32(1)) } else { (n, v) })
            .collect();
        let err = codec.validate(index(&model, "Test.Sample"), fields).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                field: "count".into(),
                expected: "u16".into(),
                found: "u32",
            }
        );
    }

    #[test]
    fn test_validate_unknown_and_duplicate_fields() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let sample = index(&model, "Test.Sample");

        let err = codec
            .validate(sample, sample_fields().with("colour", "red"))
            .unwrap_err();
        assert_eq!(err, ValidationError::UnexpectedField { field: "colour".into() });

        let err = codec
            .validate(sample, sample_fields().with("count", 1u16))
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateField { field: "count".into() });
    }

    #[test]
    fn test_validate_missing_required_field() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let err = codec
            .validate(index(&model, "Test.Sample"), Fields::new().with("count", 1u16))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "mode".into() });
    }

    #[test]
    fn test_validate_names_nested_paths() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let fields = Fields::new()
            .with("count", 1u16)
            .with("mode", Value::Enum(0))
            .with(
                "points",
                vec![point(0, 0), Value::Message(Fields::new().with("lat", 1i32))],
            );
        let err = codec.validate(index(&model, "Test.Sample"), fields).unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "points[1].lon".into() });
    }

    #[test]
    fn test_validate_enum_membership() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let fields = Fields::new()
            .with("count", 1u16)
            .with("mode", Value::Enum(3))
            .with("points", Vec::<Value>::new());
        let err = codec.validate(index(&model, "Test.Sample"), fields).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAnEnumMember {
                field: "mode".into(),
                enum_name: "Mode".into(),
                value: 3,
            }
        );
    }

    #[test]
    fn test_validate_repeated_needs_a_list() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let fields = Fields::new()
            .with("count", 1u16)
            .with("mode", Value::Enum(0))
            .with("points", point(0, 0));
        let err = codec.validate(index(&model, "Test.Sample"), fields).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::TypeMismatch { ref field, found: "message", .. } if field == "points"
        ));
    }

    #[test]
    fn test_validate_length_limit() {
        let model: Arc<SchemaModel> = SchemaLoader::new()
            .wire_config(WireConfig {
                length: Width::U8,
                ..WireConfig::default()
            })
            .load(json!({ "messages": { "M": [ { "name": "s", "datatype": "string" } ] } }))
            .unwrap()
            .into();
        let codec = FieldCodec::new(&model);
        let m = index(&model, "M");

        assert!(codec.validate(m, Fields::new().with("s", "x".repeat(255))).is_ok());
        let err = codec
            .validate(m, Fields::new().with("s", "x".repeat(256)))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong { field: "s".into(), len: 256, max: 255 }
        );
    }

    #[test]
    fn test_validate_depth_limit() {
        let model: Arc<SchemaModel> = SchemaLoader::new()
            .wire_config(WireConfig {
                max_depth: 2,
                ..WireConfig::default()
            })
            .load(json!({ "messages": { "Tree": [
                { "name": "value", "datatype": "u8" },
                { "name": "child", "datatype": "message", "message": "Tree", "optional": true }
            ] } }))
            .unwrap()
            .into();
        let codec = FieldCodec::new(&model);
        let tree = index(&model, "Tree");

        let leaf = Fields::new().with("value", 3u8);
        let mid = Fields::new().with("value", 2u8).with("child", leaf.clone());
        let top = Fields::new().with("value", 1u8).with("child", mid.clone());
        assert!(codec.validate(tree, top).is_ok());

        let deeper = Fields::new()
            .with("value", 0u8)
            .with("child", Fields::new().with("value", 1u8).with("child", mid));
        let err = codec.validate(tree, deeper).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooDeep { field: "child.child.child".into(), max: 2 }
        );
    }

    // -- encoding -----------------------------------------------------------

    #[test]
    fn test_encode_layout() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let record = codec
            .validate(
                index(&model, "Test.Sample"),
                sample_fields().with("label", "ab"),
            )
            .unwrap();
        assert_eq!(
            encode(&model, &record),
            vec![
                0x02, 0x01, // count: u16 BE
                1, 0, 0, 0, 2, b'a', b'b', // label: present, u32 len, bytes
                1, // mode: u8
                0, 0, 0, 1, // points: count
                0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF, // point body
            ]
        );
    }

    #[test]
    fn test_encode_absent_optional_is_one_zero_byte() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let record = codec
            .validate(index(&model, "Test.Tree"), Fields::new().with("value", 9u8))
            .unwrap();
        assert_eq!(encode(&model, &record), vec![9, 0]);
    }

    #[test]
    fn test_little_endian_body() {
        let model: Arc<SchemaModel> = SchemaLoader::new()
            .wire_config(WireConfig {
                byte_order: ByteOrder::Little,
                length: Width::U16,
                ..WireConfig::default()
            })
            .load(json!({ "messages": { "M": [
                { "name": "n", "datatype": "u32" },
                { "name": "raw", "datatype": "bytes" }
            ] } }))
            .unwrap()
            .into();
        let codec = FieldCodec::new(&model);
        let record = codec
            .validate(
                index(&model, "M"),
                Fields::new().with("n", 1u32).with("raw", vec![0xAAu8]),
            )
            .unwrap();
        assert_eq!(encode(&model, &record), vec![1, 0, 0, 0, 1, 0, 0xAA]);
    }

    // -- decoding -----------------------------------------------------------

    #[test]
    fn test_decode_inverts_encode() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let sample = index(&model, "Test.Sample");
        let record = codec
            .validate(sample, sample_fields().with("label", "frog"))
            .unwrap();
        let bytes = encode(&model, &record);

        let mut reader = Reader::new(&bytes, model.wire().byte_order);
        let decoded = codec.decode(sample, &mut reader).unwrap();
        assert_eq!(decoded, record);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_decode_bool_accepts_any_nonzero() {
        let model: Arc<SchemaModel> = load(json!({ "messages": { "M": [ { "name": "b", "datatype": "bool" } ] } }))
            .unwrap()
            .into();
        let codec = FieldCodec::new(&model);
        let mut reader = Reader::new(&[0x7F], ByteOrder::Big);
        let record = codec.decode(index(&model, "M"), &mut reader).unwrap();
        assert_eq!(record.value(0), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_decode_rejects_bad_presence_flag() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let mut reader = Reader::new(&[9, 2], ByteOrder::Big);
        let err = codec.decode(index(&model, "Test.Tree"), &mut reader).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 1, .. }));
    }

    #[test]
    fn test_decode_rejects_non_member_enum() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let bytes = [0, 1, 0, 5, 0, 0, 0, 0];
        let mut reader = Reader::new(&bytes, ByteOrder::Big);
        let err = codec.decode(index(&model, "Test.Sample"), &mut reader).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 3, .. }));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let model: Arc<SchemaModel> = load(json!({ "messages": { "M": [ { "name": "s", "datatype": "string" } ] } }))
            .unwrap()
            .into();
        let codec = FieldCodec::new(&model);
        let bytes = [0, 0, 0, 3, b'o', b'k', 0xFF];
        let mut reader = Reader::new(&bytes, ByteOrder::Big);
        let err = codec.decode(index(&model, "M"), &mut reader).unwrap_err();
        assert_eq!(err.offset(), Some(6));
    }

    #[test]
    fn test_decode_huge_count_is_truncated_not_oom() {
        let model = model();
        let codec = FieldCodec::new(&model);
        let bytes = [0, 1, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = Reader::new(&bytes, ByteOrder::Big);
        let err = codec.decode(index(&model, "Test.Sample"), &mut reader).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn test_decode_depth_limit() {
        let model: Arc<SchemaModel> = SchemaLoader::new()
            .wire_config(WireConfig {
                max_depth: 1,
                ..WireConfig::default()
            })
            .load(json!({ "messages": { "Tree": [
                { "name": "child", "datatype": "message", "message": "Tree", "optional": true }
            ] } }))
            .unwrap()
            .into();
        let codec = FieldCodec::new(&model);
        let mut reader = Reader::new(&[1, 1, 0], ByteOrder::Big);
        let err = codec.decode(index(&model, "Tree"), &mut reader).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 2, .. }));
    }

    #[test]
    fn test_decode_huge_count_over_small_elements_is_truncated() {
        let model: Arc<SchemaModel> = load(json!({
            "enums": { "Flag": { "UP": 0 } },
            "messages": {
                "Sparse": [ { "name": "note", "datatype": "string", "optional": true } ],
                "Lists": [
                    { "name": "sparse", "datatype": "message", "message": "Sparse", "repeated": true },
                    { "name": "flags", "datatype": "enum", "enum": "Flag", "repeated": true },
                    { "name": "words", "datatype": "string", "repeated": true }
                ]
            }
        }))
        .unwrap()
        .into();
        let codec = FieldCodec::new(&model);
        let lists = index(&model, "Lists");

        // sparse: 16M one-byte elements claimed, two bytes present.
        let mut reader = Reader::new(&[0x01, 0, 0, 0, 0, 0], ByteOrder::Big);
        let err = codec.decode(lists, &mut reader).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated { offset: 4, needed: 0x0100_0000, available: 2 }
        );

        // words: each element needs at least its four-byte length header.
        let bytes = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0];
        let mut reader = Reader::new(&bytes, ByteOrder::Big);
        let err = codec.decode(lists, &mut reader).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: 12, needed: 12, available: 4 });
    }

    #[test]
    fn test_decode_count_that_fits_still_decodes() {
        let model: Arc<SchemaModel> = load(json!({ "messages": {
            "Sparse": [ { "name": "flag", "datatype": "bool", "optional": true } ],
            "M": [ { "name": "xs", "datatype": "message", "message": "Sparse", "repeated": true } ]
        } }))
        .unwrap()
        .into();
        let codec = FieldCodec::new(&model);
        let mut reader = Reader::new(&[0, 0, 0, 3, 0, 1, 1, 0], ByteOrder::Big);
        let record = codec.decode(index(&model, "M"), &mut reader).unwrap();
        assert!(reader.is_empty());
        let items = record.value(0).and_then(Value::as_list).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Value::Message(Fields::new().with("flag", true)));
    }

    // -- foreign indices and records ----------------------------------------

    #[test]
    fn test_index_from_a_larger_schema_is_an_error() {
        let big = model();
        let small: Arc<SchemaModel> = load(json!({ "messages": { "M": [] } }))
            .unwrap()
            .into();
        let codec = FieldCodec::new(&small);
        let tree = index(&big, "Test.Tree");

        let err = codec.validate(tree, Fields::new()).unwrap_err();
        assert_eq!(err, ValidationError::UnknownMessage { index: tree.get() });

        let mut reader = Reader::new(&[1, 0], ByteOrder::Big);
        let err = codec.decode(tree, &mut reader).unwrap_err();
        assert_eq!(err, DecodeError::UnknownMessage { index: tree.get() });
    }

    #[test]
    fn test_record_encodes_with_its_own_schema() {
        let model = model();
        let record = FieldCodec::new(&model)
            .validate(index(&model, "Test.Tree"), Fields::new().with("value", 4u8))
            .unwrap();

        let other: Arc<SchemaModel> = load(json!({ "messages": {
            "Wide": [ { "name": "n", "datatype": "u64" } ]
        } }))
        .unwrap()
        .into();
        let mut writer = Writer::new(ByteOrder::Big);
        FieldCodec::new(&other).encode(&record, &mut writer);
        assert_eq!(writer.into_bytes(), vec![4, 0]);
    }

    #[test]
    fn test_records_of_separate_loads_differ() {
        let first = model();
        let second = model();
        let tree = index(&first, "Test.Tree");
        let fields = Fields::new().with("value", 1u8);
        let a = FieldCodec::new(&first).validate(tree, fields.clone()).unwrap();
        let b = FieldCodec::new(&second).validate(tree, fields).unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.to_fields(), b.to_fields());
    }
}
