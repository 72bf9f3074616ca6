//! Wire-level configuration.
//!
//! A schema fixes more than field types: the width of the message id
//! header, the width of length prefixes, and the byte order all decide
//! what the bytes look like. They live here so that a loaded schema and
//! every codec built from it agree on them.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Width
// ---------------------------------------------------------------------------

/// Width of an unsigned header on the wire.
///
/// Used for the message id header, length/count prefixes and enum values.
/// Serialized as `"u8"`, `"u16"` or `"u32"` in the schema's `WIRE` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    /// Number of bytes this header occupies.
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Largest value representable in this width.
    pub fn max_value(self) -> u64 {
        match self {
            Self::U8 => u64::from(u8::MAX),
            Self::U16 => u64::from(u16::MAX),
            Self::U32 => u64::from(u32::MAX),
        }
    }

    /// Returns `true` if `value` can be written in this width.
    pub fn fits(self, value: u64) -> bool {
        value <= self.max_value()
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
        }
    }
}

// ---------------------------------------------------------------------------
// ByteOrder
// ---------------------------------------------------------------------------

/// Byte order of every multi-byte integer and float on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Network byte order.
    #[default]
    Big,
    Little,
}

// ---------------------------------------------------------------------------
// WireConfig
// ---------------------------------------------------------------------------

/// Wire configuration for one schema.
///
/// Read from the optional `WIRE` object of a schema document, or supplied
/// through [`SchemaLoader::wire_config`](crate::SchemaLoader::wire_config).
/// Missing keys fall back to [`WireConfig::default`]:
///
/// ```json
/// { "msgid": "u16", "length": "u32", "enum": "u8",
///   "byte_order": "big", "max_depth": 32 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WireConfig {
    /// Width of the message id header in front of every message.
    pub msgid: Width,

    /// Width of the length prefix of strings and byte sequences, and of
    /// the count prefix of repeated fields.
    pub length: Width,

    /// Width of an encoded enum value.
    #[serde(rename = "enum")]
    pub enum_width: Width,

    /// Byte order of multi-byte values, headers included.
    pub byte_order: ByteOrder,

    /// Maximum nesting of message values inside message values.
    pub max_depth: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            msgid: Width::U16,
            length: Width::U32,
            enum_width: Width::U8,
            byte_order: ByteOrder::Big,
            max_depth: 32,
        }
    }
}
