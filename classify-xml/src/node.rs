//! The XML element tree, with quick-xml parsing and writing.

use classify_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};

/// An XML element: name, attributes, child elements and text content.
///
/// Elements with children treat their text as insignificant whitespace;
/// leaf elements carry their text verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    /// The element name.
    pub name: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
    /// Text content.
    pub text: String,
}

impl XmlNode {
    /// An empty element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// The value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing one of the same name.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.into(),
            None => self.attrs.push((name.to_owned(), value.into())),
        }
    }

    /// The first child with the given element name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Parse one XML document into its root element.
pub fn parse(text: &str) -> Result<XmlNode> {
    let mut reader = quick_xml::Reader::from_str(text);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::format(format!("xml parse error: {e}")))?;
        match event {
            Event::Start(start) => stack.push(node_from_start(&start)?),
            Event::Empty(start) => {
                let node = node_from_start(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| Error::format("unbalanced closing tag"))?;
                if !node.children.is_empty() && node.text.trim().is_empty() {
                    node.text.clear();
                }
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                    let unescaped = quick_xml::escape::unescape(&raw)
                        .map_err(|e| Error::format(format!("xml escape error: {e}")))?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Event::GeneralRef(entity) => {
                if let Some(top) = stack.last_mut() {
                    let name = String::from_utf8_lossy(entity.as_ref()).into_owned();
                    top.text.push(resolve_entity(&name)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::format("unexpected end of document"));
    }
    root.ok_or_else(|| Error::format("document has no root element"))
}

/// Resolve the predefined entities and numeric character references.
fn resolve_entity(name: &str) -> Result<char> {
    match name {
        "amp" => return Ok('&'),
        "lt" => return Ok('<'),
        "gt" => return Ok('>'),
        "quot" => return Ok('"'),
        "apos" => return Ok('\''),
        _ => {}
    }
    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    };
    code.and_then(char::from_u32)
        .ok_or_else(|| Error::format(format!("unresolvable entity `&{name};`")))
}

fn node_from_start(start: &BytesStart<'_>) -> Result<XmlNode> {
    let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::format(format!("xml attribute error: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::format(format!("xml attribute error: {e}")))?
            .into_owned();
        node.attrs.push((key, value));
    }
    Ok(node)
}

fn attach(stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_some() {
                return Err(Error::format("multiple root elements"));
            }
            *root = Some(node);
        }
    }
    Ok(())
}

/// Write one element tree as a compact XML document.
pub fn write(node: &XmlNode, writer: &mut dyn std::io::Write) -> Result<()> {
    let mut out = String::new();
    write_node(&mut out, node);
    writer
        .write_all(out.as_bytes())
        .map_err(|e| Error::format(format!("write failed: {e}")))
}

fn write_node(out: &mut String, node: &XmlNode) {
    out.push('<');
    out.push_str(&node.name);
    for (key, value) in &node.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&quick_xml::escape::escape(value.as_str()));
        out.push('"');
    }
    if node.children.is_empty() && node.text.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    if !node.text.is_empty() {
        out.push_str(&quick_xml::escape::escape(node.text.as_str()));
    }
    for child in &node.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&node.name);
    out.push('>');
}
