//! The in-memory record/cell model the shredder and assembler trade in.
//!
//! The teacher shredded `postgres::Row` directly; this crate is
//! provider-agnostic, so records are built from this small `Value` tree
//! instead of reflecting over a foreign row type (see Design Note
//! "No runtime reflection" — schema walking here is over `SchemaNode`
//! indices, never over `Value`'s own shape).

use std::collections::BTreeMap;

/// One cell of a record, at any level of nesting.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    /// INT96: 12 raw bytes, little-endian within each of the three i32 words.
    I96([u8; 12]),
    Float(f32),
    Double(f64),
    /// BYTE_ARRAY / FIXED_LEN_BYTE_ARRAY backing bytes (also used for UTF8,
    /// JSON, BSON, DECIMAL-as-bytes, INTERVAL).
    Bytes(Vec<u8>),
    /// A group (struct) field: child values keyed by field name, matching
    /// declaration order is not required here — `Shredder` looks children
    /// up by name against the schema's field list.
    Group(BTreeMap<String, Value>),
    /// A repeated field's elements, or a scalar coerced into a one-element
    /// sequence (spec.md §4.3 "A repeated leaf value supplied as a scalar
    /// is interpreted as a single-element sequence").
    List(Vec<Value>),
}

impl Value {
    pub fn group(fields: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Value {
        Value::Group(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_group(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Group(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::I96(_) => "i96",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::Group(_) => "group",
            Value::List(_) => "list",
        }
    }
}

/// A decoded/assembled top-level record is always a group of named fields.
pub type Record = BTreeMap<String, Value>;
