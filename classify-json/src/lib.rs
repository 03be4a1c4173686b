//! JSON driver for classify: a value tree, parser, writer and the format
//! contract implementation, plus string/byte convenience wrappers.

#![warn(missing_docs)]

mod format;
mod parse;
mod value;
mod write;

use classify::{Classify, Format, Options};
use classify_core::{Descriptor, Result, Shape};

pub use format::JsonFormat;
pub use value::{JsonValue, Number};

impl Classify for JsonValue {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<JsonValue>(Shape::SelfTyped)
    }
}

/// Serialize a value to its JSON element tree.
pub fn to_element<T: Classify>(value: &T) -> Result<JsonValue> {
    classify::serialize(&JsonFormat::new(), value)
}

/// Deserialize a value from a JSON element tree.
pub fn from_element<T: Classify>(element: &JsonValue) -> Result<T> {
    classify::deserialize(&JsonFormat::new(), element)
}

/// Serialize a value to a compact JSON string.
pub fn to_string<T: Classify>(value: &T) -> Result<String> {
    to_string_with(value, &Options::new())
}

/// Serialize a value to a compact JSON string with options.
pub fn to_string_with<T: Classify>(value: &T, options: &Options) -> Result<String> {
    let bytes = to_vec_with(value, options)?;
    // The writer only ever produces valid UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Serialize a value to an indented JSON string.
pub fn to_string_pretty<T: Classify>(value: &T) -> Result<String> {
    let format = JsonFormat::new().pretty();
    let element = classify::serialize(&format, value)?;
    let mut bytes = Vec::new();
    format.write_to(&element, &mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Serialize a value to compact JSON bytes.
pub fn to_vec<T: Classify>(value: &T) -> Result<Vec<u8>> {
    to_vec_with(value, &Options::new())
}

/// Serialize a value to compact JSON bytes with options.
pub fn to_vec_with<T: Classify>(value: &T, options: &Options) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    classify::serialize_to_writer(&JsonFormat::new(), value, &mut bytes, options)?;
    Ok(bytes)
}

/// Serialize a value as JSON into a writer.
pub fn to_writer<T: Classify>(value: &T, writer: &mut dyn std::io::Write) -> Result<()> {
    classify::serialize_to_writer(&JsonFormat::new(), value, writer, &Options::new())
}

/// Deserialize a value from a JSON string.
pub fn from_str<T: Classify>(text: &str) -> Result<T> {
    from_str_with(text, &Options::new())
}

/// Deserialize a value from a JSON string with options.
pub fn from_str_with<T: Classify>(text: &str, options: &Options) -> Result<T> {
    let element = parse::parse(text)?;
    classify::deserialize_with(&JsonFormat::new(), &element, options)
}

/// Deserialize a value from JSON bytes.
pub fn from_slice<T: Classify>(bytes: &[u8]) -> Result<T> {
    let mut cursor = bytes;
    from_reader(&mut cursor)
}

/// Deserialize a value from a JSON byte source.
pub fn from_reader<T: Classify>(reader: &mut dyn std::io::Read) -> Result<T> {
    classify::deserialize_from_reader(&JsonFormat::new(), reader, &Options::new())
}

/// Populate an existing top-level object from a JSON string.
pub fn populate_from_str<T: Classify>(text: &str, target: &mut T) -> Result<()> {
    let element = parse::parse(text)?;
    classify::deserialize_into(&JsonFormat::new(), &element, target, &Options::new())
}
