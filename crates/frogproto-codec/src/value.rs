//! Runtime field values.
//!
//! Schemas are data, so message fields cannot be Rust struct fields. A
//! [`Value`] holds one field's value, tagged with its concrete type, and
//! [`Fields`] is the ordered name → value list a caller builds a message
//! from. Decoding produces the same two types.

use frogproto_schema::ScalarType;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// One field value.
///
/// Integer and float variants carry their exact width. A value is only
/// accepted for a field of the same type, or of a wider numeric type that
/// represents every value of the narrower one (see [`Value::widen`]).
///
/// Floats compare by bit pattern, matching what the codec preserves: a
/// decoded NaN equals the NaN that was encoded, and `0.0 != -0.0`.
#[derive(Debug, Clone)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    /// The numeric value of an enum member.
    Enum(u32),
    /// The elements of a repeated field.
    List(Vec<Value>),
    /// The body of a nested message.
    Message(Fields),
}

impl Value {
    /// Name of this value's type, as used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Message(_) => "message",
            other => other.scalar_type().map_or("value", ScalarType::name),
        }
    }

    /// The scalar type this value has, if it is a scalar.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        let ty = match self {
            Self::U8(_) => ScalarType::U8,
            Self::U16(_) => ScalarType::U16,
            Self::U32(_) => ScalarType::U32,
            Self::U64(_) => ScalarType::U64,
            Self::I8(_) => ScalarType::I8,
            Self::I16(_) => ScalarType::I16,
            Self::I32(_) => ScalarType::I32,
            Self::I64(_) => ScalarType::I64,
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
            Self::Bool(_) => ScalarType::Bool,
            Self::Text(_) => ScalarType::Text,
            Self::Bytes(_) => ScalarType::Bytes,
            Self::Enum(_) | Self::List(_) | Self::Message(_) => return None,
        };
        Some(ty)
    }

    /// Converts this value to `target` if no information can be lost.
    ///
    /// Same-type values pass through unchanged. Otherwise only widening
    /// conversions are allowed: to a larger integer that holds every value
    /// of the source type, or to a float that represents every source
    /// value exactly. Anything else hands the value back in `Err`.
    pub fn widen(self, target: ScalarType) -> Result<Value, Value> {
        use ScalarType as T;

        if self.scalar_type() == Some(target) {
            return Ok(self);
        }
        let widened = match (self, target) {
            (Self::U8(v), T::U16) => Self::U16(v.into()),
            (Self::U8(v), T::U32) => Self::U32(v.into()),
            (Self::U8(v), T::U64) => Self::U64(v.into()),
            (Self::U8(v), T::I16) => Self::I16(v.into()),
            (Self::U8(v), T::I32) => Self::I32(v.into()),
            (Self::U8(v), T::I64) => Self::I64(v.into()),
            (Self::U8(v), T::F32) => Self::F32(v.into()),
            (Self::U8(v), T::F64) => Self::F64(v.into()),

            (Self::U16(v), T::U32) => Self::U32(v.into()),
            (Self::U16(v), T::U64) => Self::U64(v.into()),
            (Self::U16(v), T::I32) => Self::I32(v.into()),
            (Self::U16(v), T::I64) => Self::I64(v.into()),
            (Self::U16(v), T::F32) => Self::F32(v.into()),
            (Self::U16(v), T::F64) => Self::F64(v.into()),

            (Self::U32(v), T::U64) => Self::U64(v.into()),
            (Self::U32(v), T::I64) => Self::I64(v.into()),
            (Self::U32(v), T::F64) => Self::F64(v.into()),

            (Self::I8(v), T::I16) => Self::I16(v.into()),
            (Self::I8(v), T::I32) => Self::I32(v.into()),
            (Self::I8(v), T::I64) => Self::I64(v.into()),
            (Self::I8(v), T::F32) => Self::F32(v.into()),
            (Self::I8(v), T::F64) => Self::F64(v.into()),

            (Self::I16(v), T::I32) => Self::I32(v.into()),
            (Self::I16(v), T::I64) => Self::I64(v.into()),
            (Self::I16(v), T::F32) => Self::F32(v.into()),
            (Self::I16(v), T::F64) => Self::F64(v.into()),

            (Self::I32(v), T::I64) => Self::I64(v.into()),
            (Self::I32(v), T::F64) => Self::F64(v.into()),

            (Self::F32(v), T::F64) => Self::F64(v.into()),

            (other, _) => return Err(other),
        };
        Ok(widened)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) | Self::Enum(v) => Some(v.into()),
            Self::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v),
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Fields> {
        match self {
            Self::Message(fields) => Some(fields),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Message(a), Self::Message(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Text,
    Vec<u8> => Bytes,
    Vec<Value> => List,
    Fields => Message,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

/// JSON-friendly view: numbers, strings, arrays and objects. Byte
/// sequences serialize through `serialize_bytes`, which `serde_json`
/// writes as an array of numbers.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::U8(v) => s.serialize_u8(*v),
            Self::U16(v) => s.serialize_u16(*v),
            Self::U32(v) | Self::Enum(v) => s.serialize_u32(*v),
            Self::U64(v) => s.serialize_u64(*v),
            Self::I8(v) => s.serialize_i8(*v),
            Self::I16(v) => s.serialize_i16(*v),
            Self::I32(v) => s.serialize_i32(*v),
            Self::I64(v) => s.serialize_i64(*v),
            Self::F32(v) => s.serialize_f32(*v),
            Self::F64(v) => s.serialize_f64(*v),
            Self::Bool(v) => s.serialize_bool(*v),
            Self::Text(v) => s.serialize_str(v),
            Self::Bytes(v) => s.serialize_bytes(v),
            Self::List(items) => {
                let mut seq = s.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Message(fields) => fields.serialize(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// An ordered list of named field values.
///
/// This is the "keyword arguments" form of a message: callers build one to
/// construct a message, and nested message values are stored as one. It
/// does not reject repeated names itself; message validation does.
///
/// ```rust
/// use frogproto_codec::{Fields, Value};
///
/// let fields = Fields::new().with("textdata", "hi").with("priority", 3u8);
/// assert_eq!(fields.get("priority"), Some(&Value::U8(3)));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
