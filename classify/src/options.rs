//! Per-operation options: per-type hooks, substitutions and follow-id
//! resolvers.
//!
//! An options bundle is immutable once a call begins; it is passed by
//! reference into every operation and never mutated by the walkers.

use core::any::{Any, TypeId};
use core::marker::PhantomData;
use std::collections::HashMap;
use std::sync::Arc;

use classify_core::cast::{cast_mut, cast_ref, take};
use classify_core::{
    Classify, Descriptor, DescriptorFn, Error, ErrorKind, Result, descriptor_of,
};

/// External reader for follow-id members: `(id, inner type, parent)` to the
/// stored value.
pub type FollowIdReader =
    dyn Fn(&str, &'static Descriptor, Option<&dyn Any>) -> Result<Box<dyn Any>>;

/// External writer for follow-id members: `(id, inner type, value)`.
pub type FollowIdWriter = dyn Fn(&str, &'static Descriptor, &dyn Any) -> Result<()>;

pub(crate) struct Substitution {
    pub descriptor: DescriptorFn,
    pub substitute_type: TypeId,
    pub to: Box<dyn Fn(&dyn Any) -> Box<dyn Any>>,
    pub from: Box<dyn Fn(Box<dyn Any>) -> Box<dyn Any>>,
}

#[derive(Default)]
pub(crate) struct TypeHooks {
    pub substitution: Option<Substitution>,
    pub before_serialize: Option<Box<dyn Fn(&dyn Any)>>,
    pub after_serialize: Option<Box<dyn Fn(&dyn Any, &mut dyn Any)>>,
    pub before_deserialize: Option<Box<dyn Fn(&mut dyn Any, &dyn Any)>>,
    pub after_deserialize: Option<Box<dyn Fn(&mut dyn Any, &dyn Any)>>,
}

/// Type-level overrides for one concrete type: an optional substitution
/// pair plus processing hooks. Registered into [`Options`] at most once per
/// type.
pub struct TypeOptions<T> {
    hooks: TypeHooks,
    _marker: PhantomData<fn(T)>,
}

impl<T: Classify> Default for TypeOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Classify> TypeOptions<T> {
    /// Empty overrides.
    pub fn new() -> Self {
        TypeOptions {
            hooks: TypeHooks::default(),
            _marker: PhantomData,
        }
    }

    /// Pass values of `T` through a surrogate type `S` on the wire. The
    /// surrogate must differ from `T`; registration fails otherwise.
    pub fn substitute<S: Classify>(
        mut self,
        to: impl Fn(&T) -> S + 'static,
        from: impl Fn(S) -> T + 'static,
    ) -> Self {
        self.hooks.substitution = Some(Substitution {
            descriptor: descriptor_of::<S>,
            substitute_type: TypeId::of::<S>(),
            to: Box::new(move |v| Box::new(to(cast_ref::<T>(v)))),
            from: Box::new(move |b| Box::new(from(take::<S>(b)))),
        });
        self
    }

    /// Hook run before a value of `T` is serialized.
    pub fn before_serialize(mut self, f: impl Fn(&T) + 'static) -> Self {
        self.hooks.before_serialize = Some(Box::new(move |v| f(cast_ref::<T>(v))));
        self
    }

    /// Hook run after the element for a value of `T` is produced; receives
    /// the concrete driver element type-erased and may mutate it.
    pub fn after_serialize(mut self, f: impl Fn(&T, &mut dyn Any) + 'static) -> Self {
        self.hooks.after_serialize = Some(Box::new(move |v, el| f(cast_ref::<T>(v), el)));
        self
    }

    /// Hook run on the fresh instance before population.
    pub fn before_deserialize(mut self, f: impl Fn(&mut T, &dyn Any) + 'static) -> Self {
        self.hooks.before_deserialize = Some(Box::new(move |v, el| f(cast_mut::<T>(v), el)));
        self
    }

    /// Hook run after the instance is populated.
    pub fn after_deserialize(mut self, f: impl Fn(&mut T, &dyn Any) + 'static) -> Self {
        self.hooks.after_deserialize = Some(Box::new(move |v, el| f(cast_mut::<T>(v), el)));
        self
    }
}

/// The options bundle for one serialize or deserialize operation.
#[derive(Default)]
pub struct Options {
    types: HashMap<TypeId, TypeHooks>,
    enforce_mandatory: bool,
    follow_id_reader: Option<Arc<FollowIdReader>>,
    follow_id_writer: Option<Box<FollowIdWriter>>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("enforce_mandatory", &self.enforce_mandatory)
            .field("follow_id_reader", &self.follow_id_reader.is_some())
            .field("follow_id_writer", &self.follow_id_writer.is_some())
            .finish()
    }
}

impl Options {
    /// Empty options.
    pub fn new() -> Self {
        Options::default()
    }

    /// Register overrides for one type. At most one registration per type;
    /// repeated registration or a self-substitution is an error.
    pub fn add_type<T: Classify>(mut self, options: TypeOptions<T>) -> Result<Self> {
        let id = TypeId::of::<T>();
        if let Some(sub) = &options.hooks.substitution
            && sub.substitute_type == id
        {
            return Err(Error::new(ErrorKind::OptionsConflict(format!(
                "substitute type equals the original `{}`",
                descriptor_of::<T>().name()
            ))));
        }
        if self.types.contains_key(&id) {
            return Err(Error::new(ErrorKind::OptionsConflict(format!(
                "options registered twice for `{}`",
                descriptor_of::<T>().name()
            ))));
        }
        self.types.insert(id, options.hooks);
        Ok(self)
    }

    /// Treat absence of a mandatory member as an error on read. Off by
    /// default, preserving the documented tolerance semantics.
    pub fn enforce_mandatory(mut self, on: bool) -> Self {
        self.enforce_mandatory = on;
        self
    }

    /// Configure the external reader invoked when a deserialized follow-id
    /// member is first accessed.
    pub fn follow_id_reader(
        mut self,
        f: impl Fn(&str, &'static Descriptor, Option<&dyn Any>) -> Result<Box<dyn Any>> + 'static,
    ) -> Self {
        self.follow_id_reader = Some(Arc::new(f));
        self
    }

    /// Configure the external writer invoked when an evaluated follow-id
    /// member is serialized.
    pub fn follow_id_writer(
        mut self,
        f: impl Fn(&str, &'static Descriptor, &dyn Any) -> Result<()> + 'static,
    ) -> Self {
        self.follow_id_writer = Some(Box::new(f));
        self
    }

    pub(crate) fn hooks_for(&self, id: TypeId) -> Option<&TypeHooks> {
        self.types.get(&id)
    }

    pub(crate) fn mandatory_enforced(&self) -> bool {
        self.enforce_mandatory
    }

    pub(crate) fn reader(&self) -> Option<&Arc<FollowIdReader>> {
        self.follow_id_reader.as_ref()
    }

    pub(crate) fn writer(&self) -> Option<&FollowIdWriter> {
        self.follow_id_writer.as_deref()
    }
}
