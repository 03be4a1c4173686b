//! The two-slot key/value record.

use crate::cast::{cast_ref, take};
use crate::descriptor::{Classify, Descriptor, KvpVt, Shape, Slot, descriptor_of};

/// A fixed two-element record with named slots.
///
/// Unlike a two-tuple, the slots carry the stable wire names `key` and
/// `value`; dictionaries enumerate as these pairs and formats may encode
/// them with a dedicated pair representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyValue<K, V> {
    /// The key slot.
    pub key: K,
    /// The value slot.
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    /// Create a pair.
    pub fn new(key: K, value: V) -> Self {
        KeyValue { key, value }
    }
}

impl<K: Classify, V: Classify> Classify for KeyValue<K, V> {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<Self>(Shape::KeyValuePair(KvpVt {
            key: Slot {
                descriptor: descriptor_of::<K>,
                get: |v| &cast_ref::<KeyValue<K, V>>(v).key,
            },
            value: Slot {
                descriptor: descriptor_of::<V>,
                get: |v| &cast_ref::<KeyValue<K, V>>(v).value,
            },
            construct: |k, v| {
                Box::new(KeyValue {
                    key: take::<K>(k),
                    value: take::<V>(v),
                })
            },
        }))
    }
}
