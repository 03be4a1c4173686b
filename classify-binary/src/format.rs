//! The binary format driver over the element tree in [`crate::element`].

use std::io;

use classify::{FieldElement, Format};
use classify_core::{Error, Result, Scalar};
use log::trace;

use crate::codec::{decode, encode};
use crate::element::{BinElement, BinKey, BinKind};

/// The compact binary driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFormat;

impl BinaryFormat {
    /// Create the driver.
    pub fn new() -> Self {
        BinaryFormat
    }
}

impl Format for BinaryFormat {
    type Element = BinElement;

    fn read_from(&self, reader: &mut dyn io::Read) -> Result<BinElement> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::format(format!("read failed: {e}")))?;
        decode(&bytes)
    }

    fn write_to(&self, element: &BinElement, writer: &mut dyn io::Write) -> Result<()> {
        let bytes = encode(element)?;
        writer
            .write_all(&bytes)
            .map_err(|e| Error::format(format!("write failed: {e}")))
    }

    fn is_null(&self, element: &BinElement) -> bool {
        matches!(element.kind, BinKind::Null)
    }

    fn is_reference(&self, element: &BinElement) -> bool {
        matches!(element.kind, BinKind::Ref(_))
    }

    fn is_referable(&self, element: &BinElement) -> bool {
        element.refid.is_some()
    }

    fn is_follow_id(&self, element: &BinElement) -> bool {
        matches!(element.kind, BinKind::FollowId(_))
    }

    fn reference_id(&self, element: &BinElement) -> Option<u64> {
        match element.kind {
            BinKind::Ref(id) => Some(id),
            _ => element.refid,
        }
    }

    fn follow_id(&self, element: &BinElement) -> Option<String> {
        match &element.kind {
            BinKind::FollowId(id) => Some(id.clone()),
            _ => None,
        }
    }

    fn type_tag(&self, element: &BinElement) -> Option<(String, bool)> {
        element.type_tag.clone()
    }

    fn simple_value(&self, element: &BinElement) -> Result<Scalar> {
        match &element.kind {
            BinKind::Simple(scalar) => Ok(scalar.clone()),
            other => Err(Error::format(format!(
                "expected a simple payload, found {other:?}"
            ))),
        }
    }

    fn self_value(&self, element: &BinElement) -> BinElement {
        BinElement::plain(element.kind.clone())
    }

    fn list(&self, element: &BinElement, _tuple_size: Option<usize>) -> Result<Vec<BinElement>> {
        match &element.kind {
            BinKind::List(children) => Ok(children.clone()),
            _ => Err(Error::format("expected a list payload")),
        }
    }

    fn key_value_pair(&self, element: &BinElement) -> Result<(BinElement, BinElement)> {
        match &element.kind {
            BinKind::Pair(key, value) => Ok(((**key).clone(), (**value).clone())),
            _ => Err(Error::format("expected a key/value pair payload")),
        }
    }

    fn dictionary(&self, element: &BinElement) -> Result<Vec<(Scalar, BinElement)>> {
        match &element.kind {
            BinKind::Dict(entries) => Ok(entries
                .iter()
                .map(|(key, value)| {
                    let scalar = match key {
                        BinKey::Scalar(s) => s.clone(),
                        BinKey::Field(name, _) => Scalar::Str(name.clone()),
                    };
                    (scalar, value.clone())
                })
                .collect()),
            _ => Err(Error::format("expected a dictionary payload")),
        }
    }

    fn has_field(&self, element: &BinElement, name: &str, declaring: &str) -> bool {
        self.field(element, name, declaring).is_some()
    }

    fn field(&self, element: &BinElement, name: &str, declaring: &str) -> Option<BinElement> {
        let BinKind::Dict(entries) = &element.kind else {
            return None;
        };
        // Prefer an exact (name, declaring) match, then fall back to the
        // name alone.
        let exact = entries.iter().find(|(key, _)| {
            matches!(key, BinKey::Field(n, d) if n == name && d == declaring)
        });
        let found = exact.or_else(|| {
            entries.iter().find(|(key, _)| match key {
                BinKey::Field(n, _) => n == name,
                BinKey::Scalar(Scalar::Str(s)) => s == name,
                BinKey::Scalar(_) => false,
            })
        });
        found.map(|(_, value)| value.clone())
    }

    fn format_null(&self) -> BinElement {
        BinElement::plain(BinKind::Null)
    }

    fn format_simple(&self, value: &Scalar) -> BinElement {
        BinElement::plain(BinKind::Simple(value.clone()))
    }

    fn format_list(&self, _is_tuple: bool, elements: Vec<BinElement>) -> BinElement {
        BinElement::plain(BinKind::List(elements))
    }

    fn format_key_value_pair(&self, key: BinElement, value: BinElement) -> BinElement {
        BinElement::plain(BinKind::Pair(Box::new(key), Box::new(value)))
    }

    fn format_dictionary(&self, entries: Vec<(Scalar, BinElement)>) -> BinElement {
        BinElement::plain(BinKind::Dict(
            entries
                .into_iter()
                .map(|(key, value)| (BinKey::Scalar(key), value))
                .collect(),
        ))
    }

    fn format_object(&self, fields: Vec<FieldElement<BinElement>>) -> BinElement {
        BinElement::plain(BinKind::Dict(
            fields
                .into_iter()
                .map(|field| {
                    (
                        BinKey::Field(field.name.to_owned(), field.declaring.to_owned()),
                        field.element,
                    )
                })
                .collect(),
        ))
    }

    fn format_reference(&self, id: u64) -> BinElement {
        BinElement::plain(BinKind::Ref(id))
    }

    fn format_referable(&self, mut element: BinElement, id: u64) -> BinElement {
        if element.refid.is_none() {
            trace!("promoting element to referable {id}");
            element.refid = Some(id);
        }
        element
    }

    fn format_follow_id(&self, id: &str) -> BinElement {
        BinElement::plain(BinKind::FollowId(id.to_owned()))
    }

    fn format_with_type(&self, mut element: BinElement, name: &str, is_full: bool) -> BinElement {
        if element.type_tag.is_none() {
            element.type_tag = Some((name.to_owned(), is_full));
        }
        element
    }
}
