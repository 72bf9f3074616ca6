//! Definitions that make up a loaded schema.
//!
//! Everything here is produced by the loader and read by the codec. None of
//! it is mutated after loading, so the types expose plain public fields for
//! reading; the index newtypes can only be minted by this crate, which keeps
//! every [`FieldType`] pointing at something that exists.

use std::collections::HashMap;
use std::fmt;

use crate::WireConfig;

// ---------------------------------------------------------------------------
// Indices
// ---------------------------------------------------------------------------

/// Position of a message definition in its [`SchemaModel`](crate::SchemaModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageIndex(pub(crate) usize);

impl MessageIndex {
    /// Returns the raw table position.
    pub fn get(self) -> usize {
        self.0
    }
}

/// Position of an enum definition in its [`SchemaModel`](crate::SchemaModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumIndex(pub(crate) usize);

impl EnumIndex {
    /// Returns the raw table position.
    pub fn get(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// ScalarType
// ---------------------------------------------------------------------------

/// The fixed set of scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    /// UTF-8 text, length-prefixed.
    Text,
    /// Raw bytes, length-prefixed.
    Bytes,
}

impl ScalarType {
    /// Maps a schema `datatype` name to a scalar type.
    ///
    /// Besides the explicit widths this accepts the loose names of the
    /// original JSON schemas: `int` is a signed 64-bit integer and
    /// `float`/`double` are 64-bit floats.
    pub fn from_datatype(name: &str) -> Option<Self> {
        let ty = match name {
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" | "int" => Self::I64,
            "f32" => Self::F32,
            "f64" | "float" | "double" => Self::F64,
            "bool" => Self::Bool,
            "string" | "text" | "str" => Self::Text,
            "bytes" => Self::Bytes,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical name, as printed in errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Text => "string",
            Self::Bytes => "bytes",
        }
    }

    /// Encoded size for fixed-width types, `None` for length-prefixed ones.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Self::U8 | Self::I8 | Self::Bool => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::Text | Self::Bytes => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Declared type of a field (of one element, for repeated fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Scalar(ScalarType),
    /// A value of a schema-defined enum.
    Enum(EnumIndex),
    /// A nested message body.
    Message(MessageIndex),
}

impl FieldType {
    /// Fewest bytes one value of this type can encode to.
    ///
    /// `message` supplies the minimum body size of a nested message.
    pub fn min_encoded_size(
        self,
        wire: &WireConfig,
        message: impl FnOnce(MessageIndex) -> usize,
    ) -> usize {
        match self {
            Self::Scalar(scalar) => scalar.fixed_size().unwrap_or(wire.length.bytes()),
            Self::Enum(_) => wire.enum_width.bytes(),
            Self::Message(index) => message(index),
        }
    }
}

/// One field of a message definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Field name, unique within its message.
    pub name: String,
    /// Element type.
    pub ty: FieldType,
    /// Optional fields may be omitted at construction time.
    pub optional: bool,
    /// Repeated fields hold a list of `ty` values.
    pub repeated: bool,
    pub doc: Option<String>,
}

// ---------------------------------------------------------------------------
// MessageDefinition
// ---------------------------------------------------------------------------

/// A message definition: its place in the namespace tree, its id and its
/// fields in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDefinition {
    /// Fully qualified dotted path, e.g. `Testing.System.TEXTMSG`.
    pub path: String,
    /// Identifier written in front of every encoded message.
    pub id: u32,
    /// Fields in declared (and wire) order.
    pub fields: Vec<FieldDefinition>,
    pub doc: Option<String>,
    field_index: HashMap<String, usize>,
    min_size: usize,
}

impl MessageDefinition {
    pub(crate) fn new(
        path: String,
        id: u32,
        fields: Vec<FieldDefinition>,
        doc: Option<String>,
    ) -> Self {
        let field_index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self {
            path,
            id,
            fields,
            doc,
            field_index,
            min_size: 0,
        }
    }

    pub(crate) fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Fewest bytes a body of this message can encode to: every optional
    /// field absent, every list empty.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// The last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Looks up a field by name, returning its wire position too.
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDefinition)> {
        let &position = self.field_index.get(name)?;
        Some((position, &self.fields[position]))
    }
}

// ---------------------------------------------------------------------------
// EnumDefinition
// ---------------------------------------------------------------------------

/// A named set of unsigned integer constants.
///
/// Two members may share a value; the first one declared is the canonical
/// name for that value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub name: String,
    /// Members in declared order.
    pub members: Vec<(String, u32)>,
    /// Free-form text from the `_info` entry.
    pub doc: Option<String>,
}

impl EnumDefinition {
    /// Value of the member called `member`.
    pub fn value_of(&self, member: &str) -> Option<u32> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|&(_, value)| value)
    }

    /// Canonical member name for `value`.
    pub fn name_of(&self, value: u32) -> Option<&str> {
        self.members
            .iter()
            .find(|&&(_, v)| v == value)
            .map(|(name, _)| name.as_str())
    }

    /// Returns `true` if some member has this value.
    pub fn contains(&self, value: u32) -> bool {
        self.members.iter().any(|&(_, v)| v == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight_mode() -> EnumDefinition {
        EnumDefinition {
            name: "FlightMode".into(),
            members: vec![
                ("MANUAL".into(), 0),
                ("LOITER".into(), 1),
                ("HOLD".into(), 1),
            ],
            doc: None,
        }
    }

    #[test]
    fn test_scalar_from_datatype_accepts_aliases() {
        assert_eq!(ScalarType::from_datatype("int"), Some(ScalarType::I64));
        assert_eq!(ScalarType::from_datatype("float"), Some(ScalarType::F64));
        assert_eq!(ScalarType::from_datatype("string"), Some(ScalarType::Text));
        assert_eq!(ScalarType::from_datatype("u16"), Some(ScalarType::U16));
        assert_eq!(ScalarType::from_datatype("uint"), None);
    }

    #[test]
    fn test_scalar_fixed_size() {
        assert_eq!(ScalarType::Bool.fixed_size(), Some(1));
        assert_eq!(ScalarType::F32.fixed_size(), Some(4));
        assert_eq!(ScalarType::I64.fixed_size(), Some(8));
        assert_eq!(ScalarType::Text.fixed_size(), None);
    }

    #[test]
    fn test_min_encoded_size() {
        let wire = WireConfig {
            length: crate::Width::U16,
            ..WireConfig::default()
        };
        let size = |ty: FieldType| ty.min_encoded_size(&wire, |_| 9);
        assert_eq!(size(FieldType::Scalar(ScalarType::I32)), 4);
        assert_eq!(size(FieldType::Scalar(ScalarType::Bytes)), 2);
        assert_eq!(size(FieldType::Enum(EnumIndex(0))), 1);
        assert_eq!(size(FieldType::Message(MessageIndex(3))), 9);
    }

    #[test]
    fn test_message_definition_field_lookup() {
        let def = MessageDefinition::new(
            "Testing.System.TEXTMSG".into(),
            1,
            vec![
                FieldDefinition {
                    name: "textdata".into(),
                    ty: FieldType::Scalar(ScalarType::Text),
                    optional: false,
                    repeated: false,
                    doc: None,
                },
                FieldDefinition {
                    name: "urgent".into(),
                    ty: FieldType::Scalar(ScalarType::Bool),
                    optional: true,
                    repeated: false,
                    doc: None,
                },
            ],
            None,
        );
        assert_eq!(def.name(), "TEXTMSG");
        let (position, field) = def.field("urgent").unwrap();
        assert_eq!(position, 1);
        assert!(field.optional);
        assert!(def.field("missing").is_none());
    }

    #[test]
    fn test_enum_lookup_both_ways() {
        let e = flight_mode();
        assert_eq!(e.value_of("LOITER"), Some(1));
        assert_eq!(e.value_of("CRUISE"), None);
        assert_eq!(e.name_of(0), Some("MANUAL"));
        assert!(!e.contains(7));
    }

    #[test]
    fn test_enum_alias_resolves_to_first_name() {
        let e = flight_mode();
        assert_eq!(e.value_of("HOLD"), Some(1));
        assert_eq!(e.name_of(1), Some("LOITER"));
    }
}
