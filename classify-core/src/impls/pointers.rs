//! Nullable, boxed and identity-carrying pointer implementations.
//!
//! `Rc<RefCell<T>>` is the cyclic handle: it can be allocated before its
//! pointee is populated, so references to it resolve forward and across
//! cycles. `Arc<T>` preserves shared identity for acyclic graphs; its
//! pointee is built before the handle exists.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::cast::{cast_ref, take};
use crate::descriptor::{
    BoxedVt, Classify, Descriptor, NullableVt, ReferableVt, Shape, default_value, descriptor_of,
};

impl<T: Classify> Classify for Option<T> {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<Self>(Shape::Nullable(NullableVt {
            inner: descriptor_of::<T>,
            peek: |v| cast_ref::<Option<T>>(v).as_ref().map(|x| x as &dyn core::any::Any),
            some: |v| Box::new(Some(take::<T>(v))),
            none: || Box::new(None::<T>),
        }))
    }
}

impl<T: Classify> Classify for Box<T> {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<Self>(Shape::Boxed(BoxedVt {
            inner: descriptor_of::<T>,
            peek: |v| &**cast_ref::<Box<T>>(v),
            wrap: |v| Box::new(Box::new(take::<T>(v))),
        }))
    }
}

impl<T: Classify> Classify for Rc<RefCell<T>> {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<Self>(Shape::Referable(ReferableVt {
            inner: descriptor_of::<T>,
            address: |v| Rc::as_ptr(cast_ref::<Rc<RefCell<T>>>(v)) as usize,
            with_inner: |v, f| {
                let cell = cast_ref::<Rc<RefCell<T>>>(v);
                let borrowed = cell.borrow();
                f(&*borrowed);
            },
            clone_handle: |v| Box::new(Rc::clone(cast_ref::<Rc<RefCell<T>>>(v))),
            new_handle: |v| Box::new(Rc::new(RefCell::new(take::<T>(v)))),
            placeholder: Some(|| {
                default_value(descriptor_of::<T>())
                    .map(|b| Box::new(Rc::new(RefCell::new(take::<T>(b)))) as Box<dyn core::any::Any>)
            }),
            fill: Some(|handle, v| {
                *cast_ref::<Rc<RefCell<T>>>(handle).borrow_mut() = take::<T>(v);
            }),
        }))
    }
}

impl<T: Classify> Classify for Arc<T> {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<Self>(Shape::Referable(ReferableVt {
            inner: descriptor_of::<T>,
            address: |v| Arc::as_ptr(cast_ref::<Arc<T>>(v)) as usize,
            with_inner: |v, f| f(&**cast_ref::<Arc<T>>(v)),
            clone_handle: |v| Box::new(Arc::clone(cast_ref::<Arc<T>>(v))),
            new_handle: |v| Box::new(Arc::new(take::<T>(v))),
            placeholder: None,
            fill: None,
        }))
    }
}
