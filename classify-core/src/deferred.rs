//! Deferred references to externally stored objects.

use core::any::Any;
use core::fmt;
use std::cell::{OnceCell, RefCell};

use crate::cast::cast_ref;
use crate::descriptor::{Classify, Descriptor, FollowIdVt, Loader, Shape, descriptor_of};
use crate::error::{Error, ErrorKind, Result};

/// A member stored outside the current document, addressed by an id string.
///
/// On the wire the member is a bare follow-id marker; the value itself
/// travels through the external reader/writer callbacks configured in the
/// operation options. A deserialized `DeferredObject` holds a lazy loader
/// that runs on first access; without a configured reader, access fails
/// with a follow-id error.
pub struct DeferredObject<T> {
    id: String,
    cell: OnceCell<T>,
    loader: RefCell<Option<Loader>>,
}

impl<T: Any> DeferredObject<T> {
    /// A deferred object with an already evaluated value.
    pub fn new(id: impl Into<String>, value: T) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        DeferredObject {
            id: id.into(),
            cell,
            loader: RefCell::new(None),
        }
    }

    /// A deferred object produced by deserialization: evaluates through the
    /// loader on first access, or fails if none was configured.
    pub fn from_loader(id: impl Into<String>, loader: Option<Loader>) -> Self {
        DeferredObject {
            id: id.into(),
            cell: OnceCell::new(),
            loader: RefCell::new(loader),
        }
    }

    /// The external storage id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The value, if it has been evaluated.
    pub fn evaluated(&self) -> Option<&T> {
        self.cell.get()
    }

    /// The value, evaluating the loader on first access.
    pub fn get(&self) -> Result<&T> {
        if let Some(v) = self.cell.get() {
            return Ok(v);
        }
        let loader = self.loader.borrow_mut().take();
        match loader {
            Some(load) => {
                let boxed = load()?;
                let value = *boxed.downcast::<T>().map_err(|_| {
                    Error::conversion(format!(
                        "follow-id `{}` resolved to a value of the wrong type",
                        self.id
                    ))
                })?;
                Ok(self.cell.get_or_init(|| value))
            }
            None => Err(Error::new(ErrorKind::FollowIdUnresolvable(self.id.clone()))),
        }
    }
}

impl<T: Any> Default for DeferredObject<T> {
    fn default() -> Self {
        DeferredObject::from_loader("", None)
    }
}

impl<T: fmt::Debug> fmt::Debug for DeferredObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredObject")
            .field("id", &self.id)
            .field("evaluated", &self.cell.get())
            .finish()
    }
}

impl<T: Classify> Classify for DeferredObject<T> {
    fn build_descriptor() -> Descriptor {
        Descriptor::of::<Self>(Shape::FollowId(FollowIdVt {
            inner: descriptor_of::<T>,
            id: |v| cast_ref::<DeferredObject<T>>(v).id(),
            peek: |v| {
                cast_ref::<DeferredObject<T>>(v)
                    .evaluated()
                    .map(|x| x as &dyn Any)
            },
            make: |id, loader| Box::new(DeferredObject::<T>::from_loader(id, loader)),
        }))
    }
}
