//! The JSON format driver.
//!
//! Control fields use the reserved `:` prefix (`:type`, `:fulltype`,
//! `:ref`, `:refid`, `:id`, `:value`, `:values`, `:declaringTypes`). User
//! field names and dictionary keys beginning with `:` are escaped by
//! doubling the prefix. Reference ids and type tags attach inline onto
//! object elements; other payloads are wrapped in a `{":value": …}` (or
//! `{":values": […]}`) carrier.

use std::io;

use classify::{FieldElement, Format};
use classify_core::{Error, Result, Scalar, exact};
use indexmap::IndexMap;
use log::trace;

use crate::parse::parse;
use crate::value::{JsonValue, Number};
use crate::write::{WriteOptions, write_value};

const REF: &str = ":ref";
const REFID: &str = ":refid";
const FOLLOW: &str = ":id";
const TYPE: &str = ":type";
const FULLTYPE: &str = ":fulltype";
const VALUE: &str = ":value";
const VALUES: &str = ":values";

/// The JSON driver. Output is compact by default; `pretty` switches to
/// indented output.
#[derive(Debug, Clone)]
pub struct JsonFormat {
    pretty: bool,
    indent: &'static str,
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormat {
    /// Compact output.
    pub fn new() -> Self {
        JsonFormat {
            pretty: false,
            indent: "  ",
        }
    }

    /// Indented output with the default two-space indent.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Indented output with a custom indent string.
    pub fn indent(mut self, indent: &'static str) -> Self {
        self.indent = indent;
        self.pretty = true;
        self
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            pretty: self.pretty,
            indent: self.indent,
        }
    }
}

fn escape_key(name: &str) -> String {
    if name.starts_with(':') {
        format!(":{name}")
    } else {
        name.to_owned()
    }
}

fn is_control_key(key: &str) -> bool {
    key.starts_with(':') && !key.starts_with("::")
}

fn unescape_key(key: &str) -> &str {
    key.strip_prefix(':').filter(|_| key.starts_with("::")).unwrap_or(key)
}

/// Wrap a non-object payload so annotations have somewhere to live.
fn wrap(element: JsonValue) -> IndexMap<String, JsonValue> {
    let mut fields = IndexMap::new();
    match element {
        JsonValue::Array(items) => {
            fields.insert(VALUES.to_owned(), JsonValue::Array(items));
        }
        other => {
            fields.insert(VALUE.to_owned(), other);
        }
    }
    fields
}

fn attach(element: JsonValue, key: &str, value: JsonValue) -> JsonValue {
    let mut fields = match element {
        JsonValue::Object(fields) => fields,
        other => wrap(other),
    };
    fields.entry(key.to_owned()).or_insert(value);
    JsonValue::Object(fields)
}

fn number_as_u64(n: &Number) -> Option<u64> {
    match n {
        Number::I64(v) => u64::try_from(*v).ok(),
        Number::U64(v) => Some(*v),
        Number::F64(_) => None,
    }
}

impl Format for JsonFormat {
    type Element = JsonValue;

    fn read_from(&self, reader: &mut dyn io::Read) -> Result<JsonValue> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::format(format!("read failed: {e}")))?;
        parse(&text)
    }

    fn write_to(&self, element: &JsonValue, writer: &mut dyn io::Write) -> Result<()> {
        let mut out = Vec::new();
        write_value(&mut out, element, &self.write_options(), 0);
        writer
            .write_all(&out)
            .map_err(|e| Error::format(format!("write failed: {e}")))
    }

    fn is_null(&self, element: &JsonValue) -> bool {
        matches!(element, JsonValue::Null)
    }

    fn is_reference(&self, element: &JsonValue) -> bool {
        element.get(REF).is_some()
    }

    fn is_referable(&self, element: &JsonValue) -> bool {
        element.get(REFID).is_some()
    }

    fn is_follow_id(&self, element: &JsonValue) -> bool {
        element.get(FOLLOW).is_some()
    }

    fn reference_id(&self, element: &JsonValue) -> Option<u64> {
        match element.get(REF).or_else(|| element.get(REFID))? {
            JsonValue::Number(n) => number_as_u64(n),
            _ => None,
        }
    }

    fn follow_id(&self, element: &JsonValue) -> Option<String> {
        match element.get(FOLLOW)? {
            JsonValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn type_tag(&self, element: &JsonValue) -> Option<(String, bool)> {
        if let Some(JsonValue::String(s)) = element.get(FULLTYPE) {
            return Some((s.clone(), true));
        }
        if let Some(JsonValue::String(s)) = element.get(TYPE) {
            return Some((s.clone(), false));
        }
        None
    }

    fn simple_value(&self, element: &JsonValue) -> Result<Scalar> {
        match element {
            JsonValue::Bool(b) => Ok(Scalar::Bool(*b)),
            JsonValue::Number(Number::I64(v)) => Ok(Scalar::I64(*v)),
            JsonValue::Number(Number::U64(v)) => Ok(Scalar::from_u64(*v)),
            JsonValue::Number(Number::F64(v)) => Ok(Scalar::F64(*v)),
            JsonValue::String(s) => Ok(Scalar::Str(s.clone())),
            JsonValue::Object(_) => match element.get(VALUE) {
                Some(inner) => self.simple_value(inner),
                None => Err(Error::format("expected a simple value, found an object")),
            },
            _ => Err(Error::format("expected a simple value")),
        }
    }

    fn self_value(&self, element: &JsonValue) -> JsonValue {
        if let Some(inner) = element.get(VALUE) {
            return inner.clone();
        }
        if let Some(JsonValue::Array(items)) = element.get(VALUES) {
            return JsonValue::Array(items.clone());
        }
        element.clone()
    }

    fn list(&self, element: &JsonValue, _tuple_size: Option<usize>) -> Result<Vec<JsonValue>> {
        match element {
            JsonValue::Array(items) => Ok(items.clone()),
            JsonValue::Object(_) => match element.get(VALUES) {
                Some(JsonValue::Array(items)) => Ok(items.clone()),
                _ => Err(Error::format("expected an array")),
            },
            _ => Err(Error::format("expected an array")),
        }
    }

    fn key_value_pair(&self, element: &JsonValue) -> Result<(JsonValue, JsonValue)> {
        let key = element
            .get("key")
            .ok_or_else(|| Error::format("key/value pair without `key`"))?;
        let value = element
            .get("value")
            .ok_or_else(|| Error::format("key/value pair without `value`"))?;
        Ok((key.clone(), value.clone()))
    }

    fn dictionary(&self, element: &JsonValue) -> Result<Vec<(Scalar, JsonValue)>> {
        let fields = element
            .as_object()
            .ok_or_else(|| Error::format("expected an object"))?;
        Ok(fields
            .iter()
            .filter(|(key, _)| !is_control_key(key))
            .map(|(key, value)| (Scalar::Str(unescape_key(key).to_owned()), value.clone()))
            .collect())
    }

    fn has_field(&self, element: &JsonValue, name: &str, _declaring: &str) -> bool {
        element.get(&escape_key(name)).is_some()
    }

    fn field(&self, element: &JsonValue, name: &str, _declaring: &str) -> Option<JsonValue> {
        element.get(&escape_key(name)).cloned()
    }

    fn format_null(&self) -> JsonValue {
        JsonValue::Null
    }

    fn format_simple(&self, value: &Scalar) -> JsonValue {
        match value {
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::I64(v) => JsonValue::Number(Number::I64(*v)),
            Scalar::U64(v) => JsonValue::Number(Number::U64(*v)),
            Scalar::F64(v) if v.is_finite() => JsonValue::Number(Number::F64(*v)),
            // Non-finite floats use their token spelling.
            other => JsonValue::String(exact::scalar_to_string(other)),
        }
    }

    fn format_list(&self, _is_tuple: bool, elements: Vec<JsonValue>) -> JsonValue {
        JsonValue::Array(elements)
    }

    fn format_key_value_pair(&self, key: JsonValue, value: JsonValue) -> JsonValue {
        let mut fields = IndexMap::new();
        fields.insert("key".to_owned(), key);
        fields.insert("value".to_owned(), value);
        JsonValue::Object(fields)
    }

    fn format_dictionary(&self, entries: Vec<(Scalar, JsonValue)>) -> JsonValue {
        let mut fields = IndexMap::new();
        for (key, value) in entries {
            fields.insert(escape_key(&exact::scalar_to_string(&key)), value);
        }
        JsonValue::Object(fields)
    }

    fn format_object(&self, object_fields: Vec<FieldElement<JsonValue>>) -> JsonValue {
        let mut fields = IndexMap::new();
        for field in object_fields {
            fields.insert(escape_key(field.name), field.element);
        }
        JsonValue::Object(fields)
    }

    fn format_reference(&self, id: u64) -> JsonValue {
        let mut fields = IndexMap::new();
        fields.insert(REF.to_owned(), JsonValue::Number(Number::U64(id)));
        JsonValue::Object(fields)
    }

    fn format_referable(&self, element: JsonValue, id: u64) -> JsonValue {
        if self.is_referable(&element) {
            return element;
        }
        trace!("promoting element to referable {id}");
        attach(element, REFID, JsonValue::Number(Number::U64(id)))
    }

    fn format_follow_id(&self, id: &str) -> JsonValue {
        let mut fields = IndexMap::new();
        fields.insert(FOLLOW.to_owned(), JsonValue::String(id.to_owned()));
        JsonValue::Object(fields)
    }

    fn format_with_type(&self, element: JsonValue, name: &str, is_full: bool) -> JsonValue {
        let key = if is_full { FULLTYPE } else { TYPE };
        attach(element, key, JsonValue::String(name.to_owned()))
    }
}
