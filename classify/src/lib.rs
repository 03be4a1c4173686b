//! Reflective, format-agnostic object-graph serialization.
//!
//! Classify converts live values of (almost) arbitrary aggregate types to
//! and from a format-neutral element tree and delegates the byte encoding
//! to a pluggable [`Format`] driver. Traversal is type-directed over a
//! closed shape catalogue; shared handles round-trip with their identity
//! intact, cycles included; unknown wire fields are tolerated and missing
//! ones keep their constructor defaults.
//!
//! ```ignore
//! use classify::Classify;
//!
//! #[derive(Classify, Default, Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let json = classify_json::to_string(&Point { x: 3, y: 4 })?;
//! let back: Point = classify_json::from_str(&json)?;
//! ```

#![warn(missing_docs)]

mod de;
mod format;
mod options;
mod path;
mod ser;

pub use classify_core::{
    BoxedVt, Classify, ClassifyDyn, DeferredObject, Descriptor, DescriptorFn, DictVt, Error,
    ErrorKind, Field, FieldFlags, FollowIdVt, FromParentHandle, KeyValue, KvpVt, ListVt, Loader,
    NullableVt, ObjectVt, PolyVariant, PolyVt, Processor, ReferableVt, Result, Scalar, Shape,
    SimpleKind, SimpleVt, Slot, TupleVt, cast, classify_polymorphic, default_value,
    descriptor_of, dictionary_key_vt, exact, pop_slot, short_type_name,
};
pub use classify_macros::Classify;

pub use de::{deserialize, deserialize_from_reader, deserialize_into, deserialize_with};
pub use format::{FieldElement, Format};
pub use options::{FollowIdReader, FollowIdWriter, Options, TypeOptions};
pub use ser::{serialize, serialize_to_writer, serialize_with};
