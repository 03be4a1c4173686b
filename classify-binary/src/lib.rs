//! Compact binary driver for classify: a single-byte tagged wire format
//! with typed dictionary variants, escaped strings and flag-bit reference
//! and type annotations.

#![warn(missing_docs)]

mod codec;
mod element;
mod format;

use classify::{Classify, Options};
use classify_core::{Descriptor, Result, Shape};

pub use element::{BinElement, BinKey, BinKind};
pub use format::BinaryFormat;

impl Classify for BinElement {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<BinElement>(Shape::SelfTyped)
    }
}

/// Serialize a value to its binary element tree.
pub fn to_element<T: Classify>(value: &T) -> Result<BinElement> {
    classify::serialize(&BinaryFormat::new(), value)
}

/// Deserialize a value from a binary element tree.
pub fn from_element<T: Classify>(element: &BinElement) -> Result<T> {
    classify::deserialize(&BinaryFormat::new(), element)
}

/// Serialize a value to bytes.
pub fn to_vec<T: Classify>(value: &T) -> Result<Vec<u8>> {
    to_vec_with(value, &Options::new())
}

/// Serialize a value to bytes with options.
pub fn to_vec_with<T: Classify>(value: &T, options: &Options) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    classify::serialize_to_writer(&BinaryFormat::new(), value, &mut bytes, options)?;
    Ok(bytes)
}

/// Deserialize a value from bytes.
pub fn from_slice<T: Classify>(bytes: &[u8]) -> Result<T> {
    from_slice_with(bytes, &Options::new())
}

/// Deserialize a value from bytes with options.
pub fn from_slice_with<T: Classify>(bytes: &[u8], options: &Options) -> Result<T> {
    let element = codec::decode(bytes)?;
    classify::deserialize_with(&BinaryFormat::new(), &element, options)
}

/// Populate an existing top-level object from bytes.
pub fn populate_from_slice<T: Classify>(bytes: &[u8], target: &mut T) -> Result<()> {
    let element = codec::decode(bytes)?;
    classify::deserialize_into(&BinaryFormat::new(), &element, target, &Options::new())
}
