//! The JSON element tree.

use indexmap::IndexMap;

/// A JSON value, preserving object field order.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An ordered array.
    Array(Vec<JsonValue>),
    /// An object with insertion-ordered fields.
    Object(IndexMap<String, JsonValue>),
}

/// A JSON number: integers keep their exact width class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// An integer representable as `i64`.
    I64(i64),
    /// An integer above `i64::MAX`.
    U64(u64),
    /// A binary floating-point number.
    F64(f64),
}

impl Default for JsonValue {
    fn default() -> Self {
        JsonValue::Null
    }
}

impl JsonValue {
    /// Object field by key.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    /// The object fields, if this is an object.
    pub fn as_object(&self) -> Option<&IndexMap<String, JsonValue>> {
        match self {
            JsonValue::Object(fields) => Some(fields),
            _ => None,
        }
    }
}
