//! Binary VDF, the type-tagged key/value grammar Steam uses for `shortcuts.vdf`.
//!
//! Only the three value kinds found in shortcut files are representable:
//! unsigned 32-bit integers, NUL-terminated strings and nested maps.

use indexmap::IndexMap;

mod reader;
mod writer;

pub use reader::{decode, MAX_DEPTH};
pub use writer::encode;

pub(crate) const TAG_MAP: u8 = 0x00;
pub(crate) const TAG_STRING: u8 = 0x01;
pub(crate) const TAG_INT: u8 = 0x02;
pub(crate) const TAG_END: u8 = 0x08;

/// Insertion-ordered map of keys to values, one nesting level.
pub type GenericMap = IndexMap<String, GenericValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenericValue {
    U32(u32),
    String(String),
    Map(GenericMap),
}

impl GenericValue {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            GenericValue::U32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GenericValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&GenericMap> {
        match self {
            GenericValue::Map(value) => Some(value),
            _ => None,
        }
    }
}

impl From<u32> for GenericValue {
    fn from(value: u32) -> Self {
        GenericValue::U32(value)
    }
}

impl From<&str> for GenericValue {
    fn from(value: &str) -> Self {
        GenericValue::String(value.to_string())
    }
}

impl From<String> for GenericValue {
    fn from(value: String) -> Self {
        GenericValue::String(value)
    }
}

impl From<GenericMap> for GenericValue {
    fn from(value: GenericMap) -> Self {
        GenericValue::Map(value)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VdfError {
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("unsupported value type 0x{tag:02x} at byte {offset}")]
    UnsupportedType { tag: u8, offset: usize },
    #[error("invalid utf-8 in string at byte {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("{count} trailing bytes after root end marker at byte {offset}")]
    TrailingBytes { offset: usize, count: usize },
    #[error("maps nested deeper than {max} levels at byte {offset}", max = MAX_DEPTH)]
    TooDeep { offset: usize },
    #[error("key or value under {key:?} contains an interior NUL byte")]
    InteriorNul { key: String },
}
