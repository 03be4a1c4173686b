//! Simple-shape implementations, one per exact-convertible type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::cast::cast_ref;
use crate::descriptor::{Classify, Descriptor, Shape, SimpleVt};
use crate::exact::Exact;

macro_rules! impl_simple {
    ($($t:ty),+ $(,)?) => {$(
        impl Classify for $t {
            fn build_descriptor() -> Descriptor {
                Descriptor::of::<$t>(Shape::Simple(SimpleVt {
                    kind: <$t as Exact>::KIND,
                    to_scalar: |v| cast_ref::<$t>(v).to_scalar(),
                    from_scalar: |s| Ok(Box::new(<$t as Exact>::from_scalar(s)?)),
                }))
            }
        }
    )+};
}

impl_simple!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    Decimal,
    DateTime<Utc>,
);
