//! Fixed-arity tuple implementations, arity 2 through 8.

use crate::cast::cast_ref;
use crate::descriptor::{Classify, Descriptor, Shape, Slot, TupleVt, descriptor_of, pop_slot};

macro_rules! impl_tuple {
    ($(($Full:ty; $($T:ident . $idx:tt),+))+) => {$(
        impl<$($T: Classify),+> Classify for $Full {
            fn build_descriptor() -> Descriptor {
                Descriptor::of::<Self>(Shape::Tuple(TupleVt {
                    slots: vec![$(
                        Slot {
                            descriptor: descriptor_of::<$T>,
                            get: |v| &cast_ref::<$Full>(v).$idx,
                        }
                    ),+],
                    construct: |mut parts| {
                        Box::new(($(pop_slot::<$T>(&mut parts),)+))
                    },
                }))
            }
        }
    )+};
}

impl_tuple! {
    ((A, B); A.0, B.1)
    ((A, B, C); A.0, B.1, C.2)
    ((A, B, C, D); A.0, B.1, C.2, D.3)
    ((A, B, C, D, E); A.0, B.1, C.2, D.3, E.4)
    ((A, B, C, D, E, F); A.0, B.1, C.2, D.3, E.4, F.5)
    ((A, B, C, D, E, F, G); A.0, B.1, C.2, D.3, E.4, F.5, G.6)
    ((A, B, C, D, E, F, G, H); A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7)
}
