//! XML driver for classify: an element tree parsed and written through
//! quick-xml, the format contract implementation and string convenience
//! wrappers.

#![warn(missing_docs)]

mod format;
mod node;

use classify::{Classify, Options};
use classify_core::{Descriptor, Result, Shape};

pub use format::XmlFormat;
pub use node::XmlNode;

impl Classify for XmlNode {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<XmlNode>(Shape::SelfTyped)
    }
}

/// Serialize a value to its XML element tree.
pub fn to_element<T: Classify>(value: &T) -> Result<XmlNode> {
    classify::serialize(&XmlFormat::new(), value)
}

/// Deserialize a value from an XML element tree.
pub fn from_element<T: Classify>(element: &XmlNode) -> Result<T> {
    classify::deserialize(&XmlFormat::new(), element)
}

/// Serialize a value to an XML string.
pub fn to_string<T: Classify>(value: &T) -> Result<String> {
    to_string_with(value, &Options::new())
}

/// Serialize a value to an XML string with options.
pub fn to_string_with<T: Classify>(value: &T, options: &Options) -> Result<String> {
    let mut bytes = Vec::new();
    classify::serialize_to_writer(&XmlFormat::new(), value, &mut bytes, options)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Deserialize a value from an XML string.
pub fn from_str<T: Classify>(text: &str) -> Result<T> {
    from_str_with(text, &Options::new())
}

/// Deserialize a value from an XML string with options.
pub fn from_str_with<T: Classify>(text: &str, options: &Options) -> Result<T> {
    let element = node::parse(text)?;
    classify::deserialize_with(&XmlFormat::new(), &element, options)
}

/// Populate an existing top-level object from an XML string.
pub fn populate_from_str<T: Classify>(text: &str, target: &mut T) -> Result<()> {
    let element = node::parse(text)?;
    classify::deserialize_into(&XmlFormat::new(), &element, target, &Options::new())
}
