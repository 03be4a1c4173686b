//! Core building blocks of the classify ecosystem: the shape catalogue,
//! type descriptors, the exact-conversion contract, the dynamic scalar
//! union and the shared error type.
//!
//! The serializer and deserializer live in the `classify` crate; concrete
//! wire formats live in the driver crates (`classify-json`, `classify-xml`,
//! `classify-binary`). Everything here is format-agnostic.

#![warn(missing_docs)]

pub mod cast;
mod deferred;
mod descriptor;
mod error;
pub mod exact;
mod impls;
mod keyvalue;
mod scalar;

pub use deferred::DeferredObject;
pub use descriptor::{
    BoxedVt, Classify, ClassifyDyn, Descriptor, DescriptorFn, DictVt, Field, FieldFlags,
    FollowIdVt, FromParentHandle, KvpVt, ListVt, Loader, NullableVt, ObjectVt, PolyVariant,
    PolyVt, Processor, ReferableVt, Shape, SimpleVt, Slot, TupleVt, default_value,
    descriptor_of, dictionary_key_vt, pop_slot, short_type_name,
};
pub use error::{Error, ErrorKind, Result};
pub use keyvalue::KeyValue;
pub use scalar::{Scalar, SimpleKind};
