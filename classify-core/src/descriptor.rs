//! Type descriptors: the reflective classification of a type into a shape
//! plus its member catalogue.
//!
//! A [`Descriptor`] is computed lazily on first reference to a type, is
//! published into a process-wide cache and is never mutated afterwards.
//! Concurrent computations for the same type produce equal descriptors and
//! readers observe either no descriptor or a fully initialized one.

use core::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::cast::take;
use crate::error::{Error, Result};
use crate::scalar::{Scalar, SimpleKind};

/// A type that participates in classification.
///
/// Implementations describe how a type maps onto the closed shape catalogue;
/// they are provided for the standard simple types, containers and smart
/// pointers, and generated for user aggregates by `#[derive(Classify)]`.
pub trait Classify: Any {
    /// Build the descriptor for this type. Called at most once per process;
    /// use [`descriptor_of`] to obtain the cached copy.
    fn build_descriptor() -> Descriptor
    where
        Self: Sized;
}

/// Function returning the cached descriptor of some type. Stored instead of
/// the descriptor itself so that mutually recursive types can describe each
/// other without recursing at construction time.
pub type DescriptorFn = fn() -> &'static Descriptor;

/// Deferred production of an externally stored object, used by follow-id
/// members.
pub type Loader = Box<dyn FnOnce() -> Result<Box<dyn Any>>>;

static CACHE: OnceLock<RwLock<HashMap<TypeId, &'static Descriptor>>> = OnceLock::new();

/// The process-wide descriptor for `T`, computed on first use.
pub fn descriptor_of<T: Classify>() -> &'static Descriptor {
    let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let id = TypeId::of::<T>();
    if let Some(desc) = cache.read().unwrap().get(&id).copied() {
        return desc;
    }
    // Built outside the lock; a concurrent build of the same type produces
    // an equal descriptor and the first insert wins.
    let built = T::build_descriptor();
    let mut guard = cache.write().unwrap();
    *guard
        .entry(id)
        .or_insert_with(|| &*Box::leak(Box::new(built)))
}

/// The memoized classification record for one concrete type.
pub struct Descriptor {
    type_id: TypeId,
    name: String,
    full_name: &'static str,
    shape: Shape,
}

impl Descriptor {
    /// Create the descriptor for `T` with the given shape. Names are taken
    /// from the compiler's type name for `T`.
    pub fn of<T: Any>(shape: Shape) -> Descriptor {
        let full_name = core::any::type_name::<T>();
        Descriptor {
            type_id: TypeId::of::<T>(),
            name: short_type_name(full_name),
            full_name,
            shape,
        }
    }

    /// The `TypeId` of the described type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The short (unqualified) type name, generics included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully qualified type name.
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// The module path portion of the full name.
    pub fn module(&self) -> &str {
        match self.full_name.rfind("::") {
            Some(i) => &self.full_name[..i],
            None => "",
        }
    }

    /// The shape this type classifies as.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl core::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("shape", &shape_name(&self.shape))
            .finish()
    }
}

/// The semantic category a type resolves to for the purpose of traversal.
pub enum Shape {
    /// A scalar representable through the exact-conversion contract.
    Simple(SimpleVt),
    /// The declared type is a format driver's element type itself.
    SelfTyped,
    /// `Option<T>`: recurse on the inner type, null when empty.
    Nullable(NullableVt),
    /// `Box<T>`: a wire-transparent owning wrapper.
    Boxed(BoxedVt),
    /// A fixed-arity record of 2 to 8 positional slots.
    Tuple(TupleVt),
    /// A fixed two-slot record with named `key`/`value` slots.
    KeyValuePair(KvpVt),
    /// An insertable ordered sequence.
    List(ListVt),
    /// A map keyed by strings, integers or enums.
    Dictionary(DictVt),
    /// A reference-type aggregate with named members.
    Object(ObjectVt),
    /// An identity-carrying shared handle (`Rc`, `Arc`, `Rc<RefCell<_>>`).
    Referable(ReferableVt),
    /// A trait object resolved through a variant registry and type tags.
    Polymorphic(PolyVt),
    /// An externally stored object reference (`DeferredObject<T>`).
    FollowId(FollowIdVt),
}

pub(crate) fn shape_name(shape: &Shape) -> &'static str {
    match shape {
        Shape::Simple(_) => "Simple",
        Shape::SelfTyped => "SelfTyped",
        Shape::Nullable(_) => "Nullable",
        Shape::Boxed(_) => "Boxed",
        Shape::Tuple(_) => "Tuple",
        Shape::KeyValuePair(_) => "KeyValuePair",
        Shape::List(_) => "List",
        Shape::Dictionary(_) => "Dictionary",
        Shape::Object(_) => "Object",
        Shape::Referable(_) => "Referable",
        Shape::Polymorphic(_) => "Polymorphic",
        Shape::FollowId(_) => "FollowId",
    }
}

/// Simple-shape conversions between the concrete type and [`Scalar`].
pub struct SimpleVt {
    /// The category the type falls into (drives dictionary-key checks and
    /// the binary driver's tag choice).
    pub kind: SimpleKind,
    /// Convert a live value to its scalar carrier.
    pub to_scalar: fn(&dyn Any) -> Scalar,
    /// Convert a scalar back into a boxed value of the described type.
    pub from_scalar: fn(&Scalar) -> Result<Box<dyn Any>>,
}

/// Accessors for `Option<T>`.
pub struct NullableVt {
    /// Descriptor of the inner type.
    pub inner: DescriptorFn,
    /// Borrow the inner value when present.
    pub peek: for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>,
    /// Wrap a built inner value into `Some`.
    pub some: fn(Box<dyn Any>) -> Box<dyn Any>,
    /// Produce the empty value.
    pub none: fn() -> Box<dyn Any>,
}

/// Accessors for `Box<T>`.
pub struct BoxedVt {
    /// Descriptor of the boxed type.
    pub inner: DescriptorFn,
    /// Borrow the boxed value.
    pub peek: for<'a> fn(&'a dyn Any) -> &'a dyn Any,
    /// Re-box a built inner value.
    pub wrap: fn(Box<dyn Any>) -> Box<dyn Any>,
}

/// One positional slot of a tuple or key/value pair.
pub struct Slot {
    /// Descriptor of the slot type.
    pub descriptor: DescriptorFn,
    /// Borrow the slot out of the containing record.
    pub get: for<'a> fn(&'a dyn Any) -> &'a dyn Any,
}

/// Accessors for fixed-arity tuples.
pub struct TupleVt {
    /// The slots, in positional order; arity is `slots.len()`.
    pub slots: Vec<Slot>,
    /// Invoke the constructor with one built value per slot, in order.
    pub construct: fn(Vec<Box<dyn Any>>) -> Box<dyn Any>,
}

/// Accessors for the key/value pair record.
pub struct KvpVt {
    /// The `key` slot.
    pub key: Slot,
    /// The `value` slot.
    pub value: Slot,
    /// Construct the pair from built key and value.
    pub construct: fn(Box<dyn Any>, Box<dyn Any>) -> Box<dyn Any>,
}

/// Accessors for insertable ordered sequences.
pub struct ListVt {
    /// Descriptor of the element type.
    pub element: DescriptorFn,
    /// Number of elements.
    pub len: fn(&dyn Any) -> usize,
    /// Visit each element in natural order.
    pub visit: fn(&dyn Any, &mut dyn FnMut(&dyn Any)),
    /// Allocate the empty container.
    pub new: fn() -> Box<dyn Any>,
    /// Remove all elements (target reuse).
    pub clear: fn(&mut dyn Any),
    /// Append one built element.
    pub push: fn(&mut dyn Any, Box<dyn Any>),
}

/// Accessors for maps.
pub struct DictVt {
    /// Descriptor of the key type; must classify as a simple shape whose
    /// kind admits dictionary keys.
    pub key: DescriptorFn,
    /// Descriptor of the value type.
    pub value: DescriptorFn,
    /// Number of entries.
    pub len: fn(&dyn Any) -> usize,
    /// Visit each `(key, value)` entry.
    pub visit: fn(&dyn Any, &mut dyn FnMut(&dyn Any, &dyn Any)),
    /// Allocate the empty container.
    pub new: fn() -> Box<dyn Any>,
    /// Remove all entries (target reuse).
    pub clear: fn(&mut dyn Any),
    /// Insert one built entry.
    pub insert: fn(&mut dyn Any, Box<dyn Any>, Box<dyn Any>),
}

/// Attribute flags carried by an object member.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldFlags {
    /// Absence on read is an error when enforcement is switched on.
    pub mandatory: bool,
    /// Receives the enclosing parent object on read; skipped on write.
    pub parent: bool,
    /// Omitted on write when equal to the type's default value.
    pub ignore_if_default: bool,
    /// Omitted on write when the value is an empty collection.
    pub ignore_if_empty: bool,
}

/// One member of an object-shaped type.
pub struct Field {
    /// The stable wire name (source name with leading markers stripped).
    pub name: &'static str,
    /// The name of the declaring type.
    pub declaring: &'static str,
    /// Attribute flags.
    pub flags: FieldFlags,
    /// Descriptor of the member type; absent for parent members.
    pub descriptor: Option<DescriptorFn>,
    /// Borrow the member out of the object.
    pub get: Option<for<'a> fn(&'a dyn Any) -> &'a dyn Any>,
    /// Write a built value into the member.
    pub set: Option<fn(&mut dyn Any, Box<dyn Any>)>,
    /// Assign the enclosing parent handle into the member; returns whether
    /// the handle was of a compatible type.
    pub assign_parent: Option<fn(&mut dyn Any, &dyn Any) -> bool>,
    /// Whether the member equals its type's default value.
    pub is_default: Option<fn(&dyn Any) -> bool>,
    /// Whether the member is an empty collection.
    pub is_empty: Option<fn(&dyn Any) -> bool>,
    /// User predicate for ignore-if(v): omit on write when true.
    pub skip_if: Option<fn(&dyn Any) -> bool>,
}

/// Accessors and hooks for object-shaped types.
pub struct ObjectVt {
    /// The member catalogue, in declaration order.
    pub fields: Vec<Field>,
    /// The parameterless constructor, when one exists.
    pub default: Option<fn() -> Box<dyn Any>>,
    /// Object-level hook run before the object is serialized.
    pub before_serialize: Option<fn(&dyn Any)>,
    /// Object-level hook run after the element is produced; receives the
    /// concrete driver element as `&mut dyn Any`.
    pub after_serialize: Option<fn(&dyn Any, &mut dyn Any)>,
    /// Object-level hook run on the fresh instance before population;
    /// receives the concrete driver element as `&dyn Any`.
    pub before_deserialize: Option<fn(&mut dyn Any, &dyn Any)>,
    /// Object-level hook run after population.
    pub after_deserialize: Option<fn(&mut dyn Any, &dyn Any)>,
}

/// Accessors for identity-carrying shared handles.
pub struct ReferableVt {
    /// Descriptor of the pointee.
    pub inner: DescriptorFn,
    /// Stable address identifying the allocation during one operation.
    pub address: fn(&dyn Any) -> usize,
    /// Visit the pointee.
    pub with_inner: fn(&dyn Any, &mut dyn FnMut(&dyn Any)),
    /// Clone the handle (shares the allocation).
    pub clone_handle: fn(&dyn Any) -> Box<dyn Any>,
    /// Wrap a fully built pointee into a fresh handle.
    pub new_handle: fn(Box<dyn Any>) -> Box<dyn Any>,
    /// Allocate an empty handle up front so that cycles and forward
    /// references can resolve before the pointee is populated. Only handle
    /// types with interior mutability support this.
    pub placeholder: Option<fn() -> Option<Box<dyn Any>>>,
    /// Populate a placeholder handle with the built pointee.
    pub fill: Option<fn(&dyn Any, Box<dyn Any>)>,
}

/// One registered concrete type of a polymorphic declared type.
pub struct PolyVariant {
    /// Short type name used as the wire tag within the registry's module.
    pub name: String,
    /// Fully qualified type name used as the wire tag elsewhere.
    pub full_name: &'static str,
    /// Descriptor of the concrete type.
    pub descriptor: DescriptorFn,
    /// Wrap a built concrete value back into the declared trait object.
    pub wrap: fn(Box<dyn Any>) -> Box<dyn Any>,
}

/// Registry and accessors for trait-object members.
pub struct PolyVt {
    /// The module owning the registry; concrete types living there are
    /// tagged with their short names.
    pub module: &'static str,
    /// The registered concrete types.
    pub variants: Vec<PolyVariant>,
    /// Project a live trait object onto its concrete value and descriptor.
    pub inner: for<'a> fn(&'a dyn Any) -> (&'a dyn Any, &'static Descriptor),
}

impl PolyVt {
    /// Resolve a wire tag to a registered variant.
    pub fn resolve(&self, tag: &str, is_full: bool) -> Option<&PolyVariant> {
        self.variants.iter().find(|v| {
            if is_full {
                v.full_name == tag
            } else {
                v.name == tag
            }
        })
    }

    /// Find the variant describing a concrete descriptor.
    pub fn variant_of(&self, desc: &'static Descriptor) -> Option<&PolyVariant> {
        self.variants
            .iter()
            .find(|v| (v.descriptor)().type_id() == desc.type_id())
    }
}

/// Accessors for `DeferredObject<T>` members.
pub struct FollowIdVt {
    /// Descriptor of the deferred inner type.
    pub inner: DescriptorFn,
    /// The id string under which the object is stored externally.
    pub id: for<'a> fn(&'a dyn Any) -> &'a str,
    /// Borrow the inner value if it has been evaluated.
    pub peek: for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>,
    /// Construct a deferred member from an id and an optional loader.
    pub make: fn(String, Option<Loader>) -> Box<dyn Any>,
}

/// The default (parameterless-constructed) value for a descriptor, used for
/// referable placeholders: objects use their constructor, containers start
/// empty, nullables start empty.
pub fn default_value(desc: &'static Descriptor) -> Option<Box<dyn Any>> {
    match desc.shape() {
        Shape::Object(vt) => vt.default.map(|f| f()),
        Shape::List(vt) => Some((vt.new)()),
        Shape::Dictionary(vt) => Some((vt.new)()),
        Shape::Nullable(vt) => Some((vt.none)()),
        _ => None,
    }
}

/// Check that a dictionary key descriptor is admissible, in the shape the
/// classification rules require.
pub fn dictionary_key_vt(key: &'static Descriptor) -> Result<&'static SimpleVt> {
    match key.shape() {
        Shape::Simple(vt) if vt.kind.is_dictionary_key() => Ok(vt),
        _ => Err(Error::new(crate::error::ErrorKind::UnsupportedKeyType(
            key.name().to_owned(),
        ))),
    }
}

/// Derive the short form of a fully qualified type name: every module path
/// collapses to its final segment, inside generic arguments included.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push_str(&segment);
                segment.clear();
                out.push(c);
            }
            _ => segment.push(c),
        }
    }
    out.push_str(&segment);
    out
}

/// Conversion from the enclosing parent handle into a parent-marked member
/// type. Implemented for strong and weak shared handles and options thereof.
pub trait FromParentHandle: Sized + 'static {
    /// Downcast and convert the parent handle, if compatible.
    fn from_parent_handle(handle: &dyn Any) -> Option<Self>;
}

impl<T: 'static> FromParentHandle for std::rc::Rc<std::cell::RefCell<T>> {
    fn from_parent_handle(handle: &dyn Any) -> Option<Self> {
        handle.downcast_ref::<Self>().cloned()
    }
}

impl<T: 'static> FromParentHandle for std::rc::Weak<std::cell::RefCell<T>> {
    fn from_parent_handle(handle: &dyn Any) -> Option<Self> {
        handle
            .downcast_ref::<std::rc::Rc<std::cell::RefCell<T>>>()
            .map(std::rc::Rc::downgrade)
    }
}

impl<T: FromParentHandle> FromParentHandle for Option<T> {
    fn from_parent_handle(handle: &dyn Any) -> Option<Self> {
        T::from_parent_handle(handle).map(Some)
    }
}

/// Object-level processing hooks, opted into with `#[classify(processor)]`.
///
/// The element arguments are the concrete element type of the driver in
/// use, passed type-erased.
pub trait Processor {
    /// Runs before the object is serialized.
    fn before_serialize(&self) {}
    /// Runs after the element is produced; may mutate it.
    fn after_serialize(&self, _element: &mut dyn Any) {}
    /// Runs on the fresh instance before population.
    fn before_deserialize(&mut self, _element: &dyn Any) {}
    /// Runs after population.
    fn after_deserialize(&mut self, _element: &dyn Any) {}
}

/// Register the concrete types a trait object can carry, enabling the
/// polymorphic shape for `Box<dyn Trait>`.
///
/// ```ignore
/// classify_polymorphic!(dyn Animal => Dog, Cat);
/// ```
///
/// Serialized trait objects are tagged with the concrete type's short name
/// when it lives in the module invoking the macro, and with its fully
/// qualified name otherwise.
#[macro_export]
macro_rules! classify_polymorphic {
    (dyn $trait:path => $($variant:ty),+ $(,)?) => {
        impl $crate::Classify for ::std::boxed::Box<dyn $trait> {
            fn build_descriptor() -> $crate::Descriptor {
                $crate::Descriptor::of::<Self>($crate::Shape::Polymorphic($crate::PolyVt {
                    module: ::core::module_path!(),
                    variants: vec![$(
                        $crate::PolyVariant {
                            name: $crate::short_type_name(
                                ::core::any::type_name::<$variant>(),
                            ),
                            full_name: ::core::any::type_name::<$variant>(),
                            descriptor: $crate::descriptor_of::<$variant>,
                            wrap: |inner| {
                                let concrete = $crate::cast::take::<$variant>(inner);
                                ::std::boxed::Box::new(
                                    ::std::boxed::Box::new(concrete)
                                        as ::std::boxed::Box<dyn $trait>,
                                )
                            },
                        }
                    ),+],
                    inner: |value| {
                        let boxed = $crate::cast::cast_ref::<::std::boxed::Box<dyn $trait>>(value);
                        (
                            $crate::ClassifyDyn::classify_as_any(&**boxed),
                            $crate::ClassifyDyn::classify_descriptor(&**boxed),
                        )
                    },
                }))
            }
        }
    };
}

/// Object-safe access to a value's descriptor, required as a supertrait of
/// any trait used polymorphically.
pub trait ClassifyDyn: Any {
    /// The descriptor of the concrete runtime type.
    fn classify_descriptor(&self) -> &'static Descriptor;
    /// The value as `Any`, at its concrete type.
    fn classify_as_any(&self) -> &dyn Any;
}

impl<T: Classify> ClassifyDyn for T {
    fn classify_descriptor(&self) -> &'static Descriptor {
        descriptor_of::<T>()
    }

    fn classify_as_any(&self) -> &dyn Any {
        self
    }
}

/// Helper used by tuple constructors: pop built slot values in order.
pub fn pop_slot<T: 'static>(parts: &mut Vec<Box<dyn Any>>) -> T {
    take::<T>(parts.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_collapse_module_paths() {
        assert_eq!(short_type_name("alloc::vec::Vec<my_crate::a::Foo>"), "Vec<Foo>");
        assert_eq!(short_type_name("my_crate::Bar"), "Bar");
        assert_eq!(
            short_type_name("std::collections::HashMap<alloc::string::String, i32>"),
            "HashMap<String, i32>"
        );
    }
}
