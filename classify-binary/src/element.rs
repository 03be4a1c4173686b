//! The binary element tree.

use classify_core::Scalar;

/// A decoded binary element: a payload plus optional reference id and type
/// tag annotations (carried by flag bits on the wire).
#[derive(Debug, Clone, PartialEq)]
pub struct BinElement {
    /// The payload.
    pub kind: BinKind,
    /// Reference id, when the element is referable.
    pub refid: Option<u64>,
    /// Type tag as `(name, is_fully_qualified)`.
    pub type_tag: Option<(String, bool)>,
}

impl BinElement {
    /// An element with no annotations.
    pub fn plain(kind: BinKind) -> Self {
        BinElement {
            kind,
            refid: None,
            type_tag: None,
        }
    }
}

/// The key of one dictionary entry.
#[derive(Debug, Clone, PartialEq)]
pub enum BinKey {
    /// A scalar key (typed dictionary variants).
    Scalar(Scalar),
    /// An object field key: name plus declaring type (two-string variant;
    /// the declaring type is empty when no disambiguation is needed).
    Field(String, String),
}

/// The payload alternatives of a binary element.
#[derive(Debug, Clone, PartialEq)]
pub enum BinKind {
    /// The null marker.
    Null,
    /// A scalar stored in the smallest round-tripping representation.
    Simple(Scalar),
    /// An ordered sequence (lists and tuples).
    List(Vec<BinElement>),
    /// A key/value pair: key element then value element.
    Pair(Box<BinElement>, Box<BinElement>),
    /// A dictionary (also carries object-shaped field maps).
    Dict(Vec<(BinKey, BinElement)>),
    /// A reference to a referable by id.
    Ref(u64),
    /// A follow-id marker.
    FollowId(String),
}
