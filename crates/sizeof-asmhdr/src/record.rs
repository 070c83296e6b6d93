//! Header record types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One significant `#define` line of an assembler header.
///
/// Values are kept exactly as the compiler wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// `#define <Type>__size <bytes>`
    TypeSize { name: String, size: String },

    /// `#define <Type>_<Field> <offset>`, attributed to the nearest
    /// preceding type size record.
    FieldOffset {
        type_name: String,
        field: String,
        offset: String,
    },

    /// `#define const_<Name> <value>`
    Constant { name: String, value: String },
}

impl Record {
    /// The name a request is matched against.
    ///
    /// Field records answer with their owning type's name; they are never
    /// requested directly.
    pub fn name(&self) -> &str {
        match self {
            Record::TypeSize { name, .. } => name,
            Record::FieldOffset { type_name, .. } => type_name,
            Record::Constant { name, .. } => name,
        }
    }

    /// The raw value text.
    pub fn value(&self) -> &str {
        match self {
            Record::TypeSize { size, .. } => size,
            Record::FieldOffset { offset, .. } => offset,
            Record::Constant { value, .. } => value,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::FieldOffset {
                type_name,
                field,
                offset,
            } => write!(f, "{}.{} {}", type_name, field, offset),
            _ => write!(f, "{} {}", self.name(), self.value()),
        }
    }
}
