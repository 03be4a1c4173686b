//! The XML format driver.
//!
//! Control markers are the attributes `type`, `fulltype`, `ref`, `refid`,
//! `id`, `null` and `encoding`. Object fields become child elements named
//! after the member (declaring-type disambiguation collapses to the name),
//! list items and dictionary entries are `<item>` elements, dictionary keys
//! ride in a `key` attribute and pair slots are `<key>`/`<value>` children.
//!
//! XML cannot carry raw control characters: strings containing characters
//! below U+0020 are written with `encoding="c-literal"`, and single
//! characters at or below U+0020 with `encoding="codepoint"` and the
//! integer code point as text.

use std::io;

use classify::{FieldElement, Format};
use classify_core::{Error, Result, Scalar, exact};
use log::trace;

use crate::node::{XmlNode, parse, write};

const ITEM: &str = "item";

/// The XML driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFormat;

impl XmlFormat {
    /// Create the driver.
    pub fn new() -> Self {
        XmlFormat
    }
}

/// Escape a string into the C-literal form used for control characters.
pub(crate) fn c_literal_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Decode the C-literal form.
pub(crate) fn c_literal_unescape(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('v') => out.push('\u{b}'),
            Some('f') => out.push('\u{c}'),
            Some('r') => out.push('\r'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(Error::format("truncated c-literal escape"));
                };
                let code = hi
                    .to_digit(16)
                    .zip(lo.to_digit(16))
                    .map(|(h, l)| h * 16 + l)
                    .ok_or_else(|| Error::format("invalid c-literal escape"))?;
                match char::from_u32(code) {
                    Some(decoded) => out.push(decoded),
                    None => return Err(Error::format("invalid c-literal escape")),
                }
            }
            _ => return Err(Error::format("invalid c-literal escape")),
        }
    }
    Ok(out)
}

impl Format for XmlFormat {
    type Element = XmlNode;

    fn read_from(&self, reader: &mut dyn io::Read) -> Result<XmlNode> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::format(format!("read failed: {e}")))?;
        parse(&text)
    }

    fn write_to(&self, element: &XmlNode, writer: &mut dyn io::Write) -> Result<()> {
        write(element, writer)
    }

    fn is_null(&self, element: &XmlNode) -> bool {
        matches!(element.attr("null"), Some("true") | Some("1"))
    }

    fn is_reference(&self, element: &XmlNode) -> bool {
        element.attr("ref").is_some()
    }

    fn is_referable(&self, element: &XmlNode) -> bool {
        element.attr("refid").is_some()
    }

    fn is_follow_id(&self, element: &XmlNode) -> bool {
        element.attr("id").is_some()
    }

    fn reference_id(&self, element: &XmlNode) -> Option<u64> {
        element
            .attr("ref")
            .or_else(|| element.attr("refid"))
            .and_then(|v| v.parse().ok())
    }

    fn follow_id(&self, element: &XmlNode) -> Option<String> {
        element.attr("id").map(str::to_owned)
    }

    fn type_tag(&self, element: &XmlNode) -> Option<(String, bool)> {
        if let Some(full) = element.attr("fulltype") {
            return Some((full.to_owned(), true));
        }
        element.attr("type").map(|t| (t.to_owned(), false))
    }

    fn simple_value(&self, element: &XmlNode) -> Result<Scalar> {
        match element.attr("encoding") {
            Some("codepoint") => {
                let code: u32 = element
                    .text
                    .trim()
                    .parse()
                    .map_err(|_| Error::format("invalid codepoint encoding"))?;
                char::from_u32(code)
                    .map(Scalar::Char)
                    .ok_or_else(|| Error::format("invalid codepoint encoding"))
            }
            Some("c-literal") => Ok(Scalar::Str(c_literal_unescape(&element.text)?)),
            Some(other) => Err(Error::format(format!("unknown encoding `{other}`"))),
            None => Ok(Scalar::Str(element.text.clone())),
        }
    }

    fn self_value(&self, element: &XmlNode) -> XmlNode {
        element.clone()
    }

    fn list(&self, element: &XmlNode, _tuple_size: Option<usize>) -> Result<Vec<XmlNode>> {
        Ok(element.children.clone())
    }

    fn key_value_pair(&self, element: &XmlNode) -> Result<(XmlNode, XmlNode)> {
        let key = element
            .child("key")
            .ok_or_else(|| Error::format("key/value pair without <key>"))?;
        let value = element
            .child("value")
            .ok_or_else(|| Error::format("key/value pair without <value>"))?;
        Ok((key.clone(), value.clone()))
    }

    fn dictionary(&self, element: &XmlNode) -> Result<Vec<(Scalar, XmlNode)>> {
        element
            .children
            .iter()
            .map(|child| {
                let key = child
                    .attr("key")
                    .ok_or_else(|| Error::format("dictionary entry without key attribute"))?;
                Ok((Scalar::Str(key.to_owned()), child.clone()))
            })
            .collect()
    }

    fn has_field(&self, element: &XmlNode, name: &str, _declaring: &str) -> bool {
        element.child(name).is_some()
    }

    fn field(&self, element: &XmlNode, name: &str, _declaring: &str) -> Option<XmlNode> {
        element.child(name).cloned()
    }

    fn format_null(&self) -> XmlNode {
        let mut node = XmlNode::new(ITEM);
        node.set_attr("null", "true");
        node
    }

    fn format_simple(&self, value: &Scalar) -> XmlNode {
        let mut node = XmlNode::new(ITEM);
        match value {
            Scalar::Char(c) if (*c as u32) <= 0x20 => {
                node.set_attr("encoding", "codepoint");
                node.text = (*c as u32).to_string();
            }
            Scalar::Str(s) if s.chars().any(|c| (c as u32) < 0x20) => {
                node.set_attr("encoding", "c-literal");
                node.text = c_literal_escape(s);
            }
            other => node.text = exact::scalar_to_string(other),
        }
        node
    }

    fn format_list(&self, _is_tuple: bool, elements: Vec<XmlNode>) -> XmlNode {
        let mut node = XmlNode::new(ITEM);
        node.children = elements;
        node
    }

    fn format_key_value_pair(&self, mut key: XmlNode, mut value: XmlNode) -> XmlNode {
        key.name = "key".to_owned();
        value.name = "value".to_owned();
        let mut node = XmlNode::new(ITEM);
        node.children = vec![key, value];
        node
    }

    fn format_dictionary(&self, entries: Vec<(Scalar, XmlNode)>) -> XmlNode {
        let mut node = XmlNode::new(ITEM);
        for (key, mut value) in entries {
            value.name = ITEM.to_owned();
            value.set_attr("key", exact::scalar_to_string(&key));
            node.children.push(value);
        }
        node
    }

    fn format_object(&self, fields: Vec<FieldElement<XmlNode>>) -> XmlNode {
        let mut node = XmlNode::new(ITEM);
        for field in fields {
            let mut child = field.element;
            child.name = field.name.to_owned();
            node.children.push(child);
        }
        node
    }

    fn format_reference(&self, id: u64) -> XmlNode {
        let mut node = XmlNode::new(ITEM);
        node.set_attr("ref", id.to_string());
        node
    }

    fn format_referable(&self, mut element: XmlNode, id: u64) -> XmlNode {
        if element.attr("refid").is_none() {
            trace!("promoting element to referable {id}");
            element.set_attr("refid", id.to_string());
        }
        element
    }

    fn format_follow_id(&self, id: &str) -> XmlNode {
        let mut node = XmlNode::new(ITEM);
        node.set_attr("id", id);
        node
    }

    fn format_with_type(&self, mut element: XmlNode, name: &str, is_full: bool) -> XmlNode {
        element.set_attr(if is_full { "fulltype" } else { "type" }, name);
        element
    }
}
