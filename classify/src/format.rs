//! The format-driver contract.
//!
//! The walkers depend on exactly this capability set over an opaque element
//! type; any wire format implementing it can carry any classifiable graph.
//! Drivers may attach reference ids and type tags onto an existing element
//! or wrap it; the walkers treat both uniformly through these accessors.

use std::io;

use classify_core::{Error, ErrorKind, Result, Scalar};

/// One named field of an object-shaped element.
#[derive(Debug)]
pub struct FieldElement<E> {
    /// The stable wire name.
    pub name: &'static str,
    /// The declaring type, for formats that disambiguate name collisions.
    pub declaring: &'static str,
    /// The field payload.
    pub element: E,
}

/// A pluggable encoder/decoder between elements and bytes.
pub trait Format {
    /// The opaque element type this driver produces and consumes.
    type Element: Clone + 'static;

    /// Decode one element tree from a byte source.
    fn read_from(&self, reader: &mut dyn io::Read) -> Result<Self::Element>;

    /// Encode one element tree into a byte sink.
    fn write_to(&self, element: &Self::Element, writer: &mut dyn io::Write) -> Result<()>;

    /// Whether the element is the null marker.
    fn is_null(&self, element: &Self::Element) -> bool;

    /// Whether the element stands for another element by id.
    fn is_reference(&self, element: &Self::Element) -> bool;

    /// Whether the element may be pointed to by a reference.
    fn is_referable(&self, element: &Self::Element) -> bool;

    /// Whether the element is a follow-id marker.
    fn is_follow_id(&self, element: &Self::Element) -> bool;

    /// The id of a reference or referable element.
    fn reference_id(&self, element: &Self::Element) -> Option<u64>;

    /// The id string of a follow-id marker.
    fn follow_id(&self, element: &Self::Element) -> Option<String>;

    /// The type tag, if any, as `(name, is_fully_qualified)`.
    fn type_tag(&self, element: &Self::Element) -> Option<(String, bool)>;

    /// The scalar payload of a simple element.
    fn simple_value(&self, element: &Self::Element) -> Result<Scalar>;

    /// The raw payload of a self-typed element, stripped of annotations.
    fn self_value(&self, element: &Self::Element) -> Self::Element;

    /// The children of a list or tuple element. `tuple_size` is a hint for
    /// formats that need the expected arity.
    fn list(&self, element: &Self::Element, tuple_size: Option<usize>)
    -> Result<Vec<Self::Element>>;

    /// The two slots of a key/value pair element.
    fn key_value_pair(&self, element: &Self::Element)
    -> Result<(Self::Element, Self::Element)>;

    /// The entries of a dictionary element, keys decoded to scalars.
    fn dictionary(&self, element: &Self::Element) -> Result<Vec<(Scalar, Self::Element)>>;

    /// Whether the object element carries the named field.
    fn has_field(&self, element: &Self::Element, name: &str, declaring: &str) -> bool;

    /// The named field of an object element.
    fn field(&self, element: &Self::Element, name: &str, declaring: &str)
    -> Option<Self::Element>;

    /// The null marker.
    fn format_null(&self) -> Self::Element;

    /// A simple element carrying a scalar.
    fn format_simple(&self, value: &Scalar) -> Self::Element;

    /// A self-typed element passed through unchanged.
    fn format_self(&self, element: Self::Element) -> Self::Element {
        element
    }

    /// A list or fixed-arity tuple element.
    fn format_list(&self, is_tuple: bool, elements: Vec<Self::Element>) -> Self::Element;

    /// A key/value pair element.
    fn format_key_value_pair(&self, key: Self::Element, value: Self::Element) -> Self::Element;

    /// A dictionary element.
    fn format_dictionary(&self, entries: Vec<(Scalar, Self::Element)>) -> Self::Element;

    /// An object element with named fields.
    fn format_object(&self, fields: Vec<FieldElement<Self::Element>>) -> Self::Element;

    /// A reference element standing for the referable with the given id.
    fn format_reference(&self, id: u64) -> Self::Element;

    /// Promote an element to a referable carrying the given id. Promoting
    /// an already promoted element is a no-op.
    fn format_referable(&self, element: Self::Element, id: u64) -> Self::Element;

    /// A follow-id marker.
    fn format_follow_id(&self, id: &str) -> Self::Element;

    /// Attach a type tag to an element.
    fn format_with_type(&self, element: Self::Element, name: &str, is_full: bool)
    -> Self::Element;

    /// The error reported when a reference never found its referable.
    fn missing_referable(&self, id: u64) -> Error {
        Error::new(ErrorKind::DanglingReference(id))
    }
}
