//! List and dictionary implementations for the standard containers.

use core::hash::Hash;
use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use crate::cast::{cast_mut, cast_ref, take};
use crate::descriptor::{Classify, Descriptor, DictVt, ListVt, Shape, descriptor_of};

impl<T: Classify> Classify for Vec<T> {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<Self>(Shape::List(ListVt {
            element: descriptor_of::<T>,
            len: |v| cast_ref::<Vec<T>>(v).len(),
            visit: |v, f| {
                for item in cast_ref::<Vec<T>>(v) {
                    f(item);
                }
            },
            new: || Box::new(Vec::<T>::new()),
            clear: |v| cast_mut::<Vec<T>>(v).clear(),
            push: |v, item| cast_mut::<Vec<T>>(v).push(take::<T>(item)),
        }))
    }
}

macro_rules! impl_dictionary {
    ($name:ident, $($bound:path),+) => {
        impl<K, V> Classify for $name<K, V>
        where
            K: Classify $(+ $bound)+,
            V: Classify,
        {
            fn build_descriptor() -> Descriptor {
                Descriptor::of::<Self>(Shape::Dictionary(DictVt {
                    key: descriptor_of::<K>,
                    value: descriptor_of::<V>,
                    len: |v| cast_ref::<$name<K, V>>(v).len(),
                    visit: |v, f| {
                        for (k, val) in cast_ref::<$name<K, V>>(v) {
                            f(k, val);
                        }
                    },
                    new: || Box::new($name::<K, V>::new()),
                    clear: |v| cast_mut::<$name<K, V>>(v).clear(),
                    insert: |v, k, val| {
                        cast_mut::<$name<K, V>>(v).insert(take::<K>(k), take::<V>(val));
                    },
                }))
            }
        }
    };
}

impl_dictionary!(HashMap, Eq, Hash);
impl_dictionary!(BTreeMap, Ord);
impl_dictionary!(IndexMap, Eq, Hash);
