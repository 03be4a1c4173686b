//! The deserializer: reads elements through a format driver, allocates
//! targets and resolves references.
//!
//! Identity is rebuilt through an id-to-handle table. A referable handle
//! with interior mutability is allocated empty and registered before its
//! pointee is walked, so self-referential structures find themselves; a
//! reference that arrives before its referable registers a placeholder
//! promise that the referable later populates in place. Any promise still
//! unfulfilled once the root is built is a dangling reference.

use core::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use classify_core::{
    Classify, Descriptor, DictVt, Error, ErrorKind, ListVt, Loader, ObjectVt, Result, Shape,
    descriptor_of, dictionary_key_vt, exact,
};
use log::trace;

use crate::format::Format;
use crate::options::Options;
use crate::path::{Seg, render};

/// A borrowed referable handle plus the means to clone it, handed to
/// parent-marked members and follow-id loaders.
#[derive(Clone, Copy)]
struct ParentRef<'h> {
    any: &'h dyn Any,
    clone_handle: fn(&dyn Any) -> Box<dyn Any>,
}

struct RefEntry {
    handle: Box<dyn Any>,
    clone_handle: fn(&dyn Any) -> Box<dyn Any>,
    fulfilled: bool,
}

pub(crate) struct Declassifier<'a, F: Format> {
    format: &'a F,
    options: &'a Options,
    refs: HashMap<u64, RefEntry>,
    path: Vec<Seg>,
}

/// Deserialize a value from an element with default options.
pub fn deserialize<T: Classify, F: Format>(format: &F, element: &F::Element) -> Result<T> {
    deserialize_with(format, element, &Options::new())
}

/// Deserialize a value from an element.
pub fn deserialize_with<T: Classify, F: Format>(
    format: &F,
    element: &F::Element,
    options: &Options,
) -> Result<T> {
    let desc = descriptor_of::<T>();
    let mut declassifier = Declassifier::new(format, options);
    let value = declassifier.declassify(desc, element, None, None)?;
    declassifier.finish()?;
    Ok(classify_core::cast::take::<T>(value))
}

/// Read one element from a byte source and deserialize it.
pub fn deserialize_from_reader<T: Classify, F: Format>(
    format: &F,
    reader: &mut dyn std::io::Read,
    options: &Options,
) -> Result<T> {
    let element = format.read_from(reader)?;
    deserialize_with(format, &element, options)
}

/// Populate an existing top-level target from an element. The target is
/// reused only at this single level: objects have their members assigned in
/// place, containers are cleared and refilled.
pub fn deserialize_into<T: Classify, F: Format>(
    format: &F,
    element: &F::Element,
    target: &mut T,
    options: &Options,
) -> Result<()> {
    let desc = descriptor_of::<T>();
    let mut declassifier = Declassifier::new(format, options);
    let erased: &mut dyn Any = target;
    match desc.shape() {
        Shape::Object(vt) => {
            declassifier.populate_object(desc, vt, erased, element, None, None)?;
        }
        Shape::List(vt) => {
            (vt.clear)(erased);
            declassifier.fill_list(vt, erased, element, None)?;
        }
        Shape::Dictionary(vt) => {
            (vt.clear)(erased);
            declassifier.fill_dictionary(vt, erased, element, None)?;
        }
        _ => {
            return Err(Error::new(ErrorKind::UnsupportedValueType(format!(
                "`{}` cannot be populated in place",
                desc.name()
            ))));
        }
    }
    declassifier.finish()
}

impl<'a, F: Format> Declassifier<'a, F> {
    fn new(format: &'a F, options: &'a Options) -> Self {
        Declassifier {
            format,
            options,
            refs: HashMap::new(),
            path: Vec::new(),
        }
    }

    /// Verify that every promised reference found its referable.
    fn finish(&self) -> Result<()> {
        for (id, entry) in &self.refs {
            if !entry.fulfilled {
                return Err(self.format.missing_referable(*id));
            }
        }
        Ok(())
    }

    fn declassify(
        &mut self,
        desc: &'static Descriptor,
        element: &F::Element,
        parent: Option<ParentRef<'_>>,
        self_handle: Option<ParentRef<'_>>,
    ) -> Result<Box<dyn Any>> {
        let result = self.dispatch(desc, element, parent, self_handle);
        result.map_err(|e| {
            if e.path().is_none() {
                e.with_path(render(&self.path))
            } else {
                e
            }
        })
    }

    fn dispatch(
        &mut self,
        desc: &'static Descriptor,
        element: &F::Element,
        parent: Option<ParentRef<'_>>,
        self_handle: Option<ParentRef<'_>>,
    ) -> Result<Box<dyn Any>> {
        let options = self.options;

        if let Some(hooks) = options.hooks_for(desc.type_id())
            && let Some(sub) = &hooks.substitution
        {
            trace!("substituting `{}` on read", desc.name());
            let surrogate = self.declassify((sub.descriptor)(), element, parent, None)?;
            return Ok((sub.from)(surrogate));
        }

        if self.format.is_null(element) {
            return match desc.shape() {
                Shape::Nullable(vt) => Ok((vt.none)()),
                _ => Err(Error::conversion(format!(
                    "null value for non-optional `{}`",
                    desc.name()
                ))),
            };
        }

        // Unwrap transparent wrappers before reference resolution, so that a
        // reference element meets the handle type it actually points to.
        if let Shape::Nullable(vt) = desc.shape() {
            let inner = self.declassify((vt.inner)(), element, parent, self_handle)?;
            return Ok((vt.some)(inner));
        }
        if let Shape::Boxed(vt) = desc.shape() {
            let inner = self.declassify((vt.inner)(), element, parent, self_handle)?;
            return Ok((vt.wrap)(inner));
        }

        if self.format.is_reference(element) {
            return self.resolve_reference(desc, element);
        }

        match desc.shape() {
            Shape::Simple(vt) => {
                let scalar = self.format.simple_value(element)?;
                (vt.from_scalar)(&scalar)
            }
            Shape::SelfTyped => {
                if desc.type_id() == TypeId::of::<F::Element>() {
                    Ok(Box::new(self.format.self_value(element)))
                } else {
                    Err(Error::new(ErrorKind::UnsupportedValueType(format!(
                        "self-typed `{}` read through a different format",
                        desc.name()
                    ))))
                }
            }
            Shape::Nullable(_) | Shape::Boxed(_) => unreachable!("wrappers handled above"),
            Shape::Tuple(vt) => {
                let children = self.format.list(element, Some(vt.slots.len()))?;
                if children.len() != vt.slots.len() {
                    return Err(Error::format(format!(
                        "expected {} tuple slots, found {}",
                        vt.slots.len(),
                        children.len()
                    )));
                }
                let mut parts = Vec::with_capacity(vt.slots.len());
                for (i, (slot, child)) in vt.slots.iter().zip(&children).enumerate() {
                    self.path.push(Seg::Index(i));
                    let part = self.declassify((slot.descriptor)(), child, parent, None);
                    self.path.pop();
                    parts.push(part?);
                }
                Ok((vt.construct)(parts))
            }
            Shape::KeyValuePair(vt) => {
                let (key_el, value_el) = self.format.key_value_pair(element)?;
                self.path.push(Seg::Field("key"));
                let key = self.declassify((vt.key.descriptor)(), &key_el, parent, None);
                self.path.pop();
                self.path.push(Seg::Field("value"));
                let value = self.declassify((vt.value.descriptor)(), &value_el, parent, None);
                self.path.pop();
                Ok((vt.construct)(key?, value?))
            }
            Shape::List(vt) => {
                let mut target = (vt.new)();
                self.fill_list(vt, &mut *target, element, parent)?;
                Ok(target)
            }
            Shape::Dictionary(vt) => {
                let mut target = (vt.new)();
                self.fill_dictionary(vt, &mut *target, element, parent)?;
                Ok(target)
            }
            Shape::Object(vt) => {
                trace!("deserializing object `{}`", desc.name());
                let constructor = vt.default.ok_or_else(|| {
                    Error::new(ErrorKind::ConstructorMissing(desc.name().to_owned()))
                })?;
                let mut instance = constructor();
                self.populate_object(desc, vt, &mut *instance, element, parent, self_handle)?;
                Ok(instance)
            }
            Shape::Referable(vt) => self.build_referable(desc, vt, element, parent),
            Shape::Polymorphic(vt) => {
                let (tag, is_full) = self.format.type_tag(element).ok_or_else(|| {
                    Error::format(format!(
                        "missing type tag for polymorphic `{}`",
                        desc.name()
                    ))
                })?;
                let variant = vt
                    .resolve(&tag, is_full)
                    .or_else(|| vt.resolve(&tag, !is_full))
                    .ok_or_else(|| Error::format(format!("unknown type tag `{tag}`")))?;
                trace!("resolved type tag `{tag}`");
                let inner = self.declassify((variant.descriptor)(), element, parent, None)?;
                Ok((variant.wrap)(inner))
            }
            Shape::FollowId(vt) => {
                if !self.format.is_follow_id(element) {
                    return Err(Error::format(format!(
                        "expected a follow-id marker for `{}`",
                        desc.name()
                    )));
                }
                let id = self
                    .format
                    .follow_id(element)
                    .ok_or_else(|| Error::format("follow-id marker without id"))?;
                let loader: Option<Loader> = options.reader().map(|reader| {
                    let reader = Arc::clone(reader);
                    let inner_desc = (vt.inner)();
                    let id = id.clone();
                    let parent_handle = parent.map(|p| (p.clone_handle)(p.any));
                    Box::new(move || reader(&id, inner_desc, parent_handle.as_deref())) as Loader
                });
                Ok((vt.make)(id, loader))
            }
        }
    }

    fn resolve_reference(
        &mut self,
        desc: &'static Descriptor,
        element: &F::Element,
    ) -> Result<Box<dyn Any>> {
        let id = self
            .format
            .reference_id(element)
            .ok_or_else(|| Error::format("reference element without id"))?;
        if let Some(entry) = self.refs.get(&id) {
            if (*entry.handle).type_id() != desc.type_id() {
                return Err(Error::format(format!(
                    "reference {id} resolves to a different type than `{}`",
                    desc.name()
                )));
            }
            trace!("resolved reference {id}");
            return Ok((entry.clone_handle)(&*entry.handle));
        }
        // Forward reference: promise a placeholder that the referable will
        // later populate in place.
        if let Shape::Referable(vt) = desc.shape()
            && let Some(placeholder) = vt.placeholder
        {
            let handle = placeholder().ok_or_else(|| {
                Error::new(ErrorKind::ConstructorMissing((vt.inner)().name().to_owned()))
            })?;
            let returned = (vt.clone_handle)(&*handle);
            self.refs.insert(
                id,
                RefEntry {
                    handle,
                    clone_handle: vt.clone_handle,
                    fulfilled: false,
                },
            );
            trace!("promised forward reference {id}");
            return Ok(returned);
        }
        Err(Error::new(ErrorKind::DanglingReference(id)))
    }

    fn build_referable(
        &mut self,
        desc: &'static Descriptor,
        vt: &'static classify_core::ReferableVt,
        element: &F::Element,
        parent: Option<ParentRef<'_>>,
    ) -> Result<Box<dyn Any>> {
        let inner_desc = (vt.inner)();
        let refid = if self.format.is_referable(element) {
            self.format.reference_id(element)
        } else {
            None
        };

        if let (Some(placeholder), Some(fill)) = (vt.placeholder, vt.fill) {
            // Allocate (or adopt a promised) handle and register it before
            // walking the pointee, so cycles resolve.
            let adopted = match refid {
                Some(id) => match self.refs.get_mut(&id) {
                    Some(entry) if !entry.fulfilled => {
                        if (*entry.handle).type_id() != desc.type_id() {
                            return Err(Error::format(format!(
                                "referable id {id} promised at a different type than `{}`",
                                desc.name()
                            )));
                        }
                        entry.fulfilled = true;
                        Some((entry.clone_handle)(&*entry.handle))
                    }
                    Some(_) => {
                        return Err(Error::format(format!("duplicate referable id {id}")));
                    }
                    None => None,
                },
                None => None,
            };
            let handle = match adopted {
                Some(handle) => Some(handle),
                None => placeholder().inspect(|handle| {
                    if let Some(id) = refid {
                        self.refs.insert(
                            id,
                            RefEntry {
                                handle: (vt.clone_handle)(&**handle),
                                clone_handle: vt.clone_handle,
                                fulfilled: true,
                            },
                        );
                    }
                }),
            };
            if let Some(handle) = handle {
                let self_ref = ParentRef {
                    any: &*handle,
                    clone_handle: vt.clone_handle,
                };
                let pointee = self.declassify(inner_desc, element, parent, Some(self_ref))?;
                fill(&*handle, pointee);
                return Ok(handle);
            }
            // The pointee has no parameterless construction; fall through to
            // pointee-first building below.
        }

        // Pointee first: such handles support only backward references.
        let pointee = self.declassify(inner_desc, element, parent, None)?;
        let handle = (vt.new_handle)(pointee);
        if let Some(id) = refid {
            self.refs.insert(
                id,
                RefEntry {
                    handle: (vt.clone_handle)(&*handle),
                    clone_handle: vt.clone_handle,
                    fulfilled: true,
                },
            );
        }
        Ok(handle)
    }

    fn populate_object(
        &mut self,
        desc: &'static Descriptor,
        vt: &'static ObjectVt,
        instance: &mut dyn Any,
        element: &F::Element,
        parent: Option<ParentRef<'_>>,
        self_handle: Option<ParentRef<'_>>,
    ) -> Result<()> {
        let options = self.options;
        let hooks = options.hooks_for(desc.type_id());
        if let Some(h) = hooks
            && let Some(f) = &h.before_deserialize
        {
            f(instance, element);
        }
        if let Some(f) = vt.before_deserialize {
            f(instance, element);
        }

        for field in &vt.fields {
            if field.flags.parent {
                if let (Some(assign), Some(p)) = (field.assign_parent, parent) {
                    assign(instance, p.any);
                }
                continue;
            }
            let (Some(descriptor), Some(set)) = (field.descriptor, field.set) else {
                continue;
            };
            if self.format.has_field(element, field.name, field.declaring) {
                let field_el = self
                    .format
                    .field(element, field.name, field.declaring)
                    .ok_or_else(|| {
                        Error::format(format!("field `{}` vanished during read", field.name))
                    })?;
                self.path.push(Seg::Field(field.name));
                let value = self.declassify(descriptor(), &field_el, self_handle, None);
                self.path.pop();
                set(instance, value?);
            } else if field.flags.mandatory && options.mandatory_enforced() {
                return Err(Error::format(format!(
                    "mandatory member `{}` is absent",
                    field.name
                ))
                .with_path(render(&self.path)));
            }
            // Unknown wire fields are silently discarded; missing wire
            // fields leave the member at its constructor-assigned value.
        }

        if let Some(h) = hooks
            && let Some(f) = &h.after_deserialize
        {
            f(instance, element);
        }
        if let Some(f) = vt.after_deserialize {
            f(instance, element);
        }
        Ok(())
    }

    fn fill_list(
        &mut self,
        vt: &'static ListVt,
        target: &mut dyn Any,
        element: &F::Element,
        parent: Option<ParentRef<'_>>,
    ) -> Result<()> {
        let element_desc = (vt.element)();
        for (i, child) in self.format.list(element, None)?.iter().enumerate() {
            self.path.push(Seg::Index(i));
            let value = self.declassify(element_desc, child, parent, None);
            self.path.pop();
            (vt.push)(target, value?);
        }
        Ok(())
    }

    fn fill_dictionary(
        &mut self,
        vt: &'static DictVt,
        target: &mut dyn Any,
        element: &F::Element,
        parent: Option<ParentRef<'_>>,
    ) -> Result<()> {
        let key_vt = dictionary_key_vt((vt.key)())?;
        let value_desc = (vt.value)();
        for (key_scalar, child) in self.format.dictionary(element)? {
            let key = (key_vt.from_scalar)(&key_scalar)
                .map_err(|e| e.with_path(render(&self.path)))?;
            self.path.push(Seg::Key(exact::scalar_to_string(&key_scalar)));
            let value = self.declassify(value_desc, &child, parent, None);
            self.path.pop();
            (vt.insert)(target, key, value?);
        }
        Ok(())
    }
}
