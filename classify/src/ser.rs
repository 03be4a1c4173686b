//! The serializer: walks a live object graph and emits elements through a
//! format driver, tracking object identity as it goes.
//!
//! Identity runs in two passes over the same traversal order. A hook-free
//! pre-scan finds every shared handle and assigns ids in the order handles
//! are observed for the second time; the emit pass then writes the first
//! occurrence of a shared handle inline as a referable and every later one
//! as a reference. Cycles terminate because a handle is marked emitted
//! before its pointee is walked.

use core::any::Any;
use std::collections::HashMap;

use classify_core::{
    Classify, Descriptor, Error, ErrorKind, Field, Result, Shape, descriptor_of,
    dictionary_key_vt, exact,
};
use log::trace;

use crate::format::{FieldElement, Format};
use crate::options::Options;
use crate::path::{Seg, render};

#[derive(Clone, Copy)]
struct RefState {
    id: Option<u64>,
    emitted: bool,
}

pub(crate) struct Classifier<'a, F: Format> {
    format: &'a F,
    options: &'a Options,
    ids: HashMap<usize, RefState>,
    next_id: u64,
    path: Vec<Seg>,
}

/// Serialize a value into an element with default options.
pub fn serialize<T: Classify, F: Format>(format: &F, value: &T) -> Result<F::Element> {
    serialize_with(format, value, &Options::new())
}

/// Serialize a value into an element.
pub fn serialize_with<T: Classify, F: Format>(
    format: &F,
    value: &T,
    options: &Options,
) -> Result<F::Element> {
    let desc = descriptor_of::<T>();
    let mut classifier = Classifier {
        format,
        options,
        ids: HashMap::new(),
        next_id: 1,
        path: Vec::new(),
    };
    classifier.prescan(desc, value);
    classifier.classify(desc, value)
}

/// Serialize a value and write its bytes to a sink.
pub fn serialize_to_writer<T: Classify, F: Format>(
    format: &F,
    value: &T,
    writer: &mut dyn std::io::Write,
    options: &Options,
) -> Result<()> {
    let element = serialize_with(format, value, options)?;
    format.write_to(&element, writer)
}

impl<'a, F: Format> Classifier<'a, F> {
    /// Identity pre-scan: follows the raw graph without invoking hooks or
    /// substitutions, assigning an id when a handle is seen a second time.
    fn prescan(&mut self, desc: &'static Descriptor, value: &dyn Any) {
        if let Some(hooks) = self.options.hooks_for(desc.type_id())
            && hooks.substitution.is_some()
        {
            // The emit pass diverts to the surrogate; the original children
            // are never walked.
            return;
        }
        match desc.shape() {
            Shape::Referable(vt) => {
                let addr = (vt.address)(value);
                if !self.ids.contains_key(&addr) {
                    self.ids.insert(
                        addr,
                        RefState {
                            id: None,
                            emitted: false,
                        },
                    );
                    let inner = (vt.inner)();
                    (vt.with_inner)(value, &mut |pointee| self.prescan(inner, pointee));
                } else if let Some(state) = self.ids.get_mut(&addr)
                    && state.id.is_none()
                {
                    state.id = Some(self.next_id);
                    self.next_id += 1;
                }
            }
            Shape::Nullable(vt) => {
                if let Some(inner) = (vt.peek)(value) {
                    self.prescan((vt.inner)(), inner);
                }
            }
            Shape::Boxed(vt) => self.prescan((vt.inner)(), (vt.peek)(value)),
            Shape::Tuple(vt) => {
                for slot in &vt.slots {
                    self.prescan((slot.descriptor)(), (slot.get)(value));
                }
            }
            Shape::KeyValuePair(vt) => {
                self.prescan((vt.key.descriptor)(), (vt.key.get)(value));
                self.prescan((vt.value.descriptor)(), (vt.value.get)(value));
            }
            Shape::List(vt) => {
                let element = (vt.element)();
                (vt.visit)(value, &mut |item| self.prescan(element, item));
            }
            Shape::Dictionary(vt) => {
                let value_desc = (vt.value)();
                (vt.visit)(value, &mut |_key, val| self.prescan(value_desc, val));
            }
            Shape::Object(vt) => {
                for field in &vt.fields {
                    if field_omitted(field, value) {
                        continue;
                    }
                    if let (Some(get), Some(descriptor)) = (field.get, field.descriptor) {
                        self.prescan(descriptor(), get(value));
                    }
                }
            }
            Shape::Polymorphic(vt) => {
                let (inner, inner_desc) = (vt.inner)(value);
                self.prescan(inner_desc, inner);
            }
            Shape::Simple(_) | Shape::SelfTyped | Shape::FollowId(_) => {}
        }
    }

    fn classify(&mut self, desc: &'static Descriptor, value: &dyn Any) -> Result<F::Element> {
        let result = self.dispatch(desc, value);
        result.map_err(|e| {
            if e.path().is_none() {
                e.with_path(render(&self.path))
            } else {
                e
            }
        })
    }

    fn dispatch(&mut self, desc: &'static Descriptor, value: &dyn Any) -> Result<F::Element> {
        let options = self.options;

        if let Some(hooks) = options.hooks_for(desc.type_id())
            && let Some(sub) = &hooks.substitution
        {
            trace!("substituting `{}` on write", desc.name());
            let surrogate = (sub.to)(value);
            return self.classify((sub.descriptor)(), &*surrogate);
        }

        // A member whose declared type is the driver's own element type
        // passes through untouched.
        if let Some(element) = value.downcast_ref::<F::Element>() {
            return Ok(self.format.format_self(element.clone()));
        }

        match desc.shape() {
            Shape::Simple(vt) => Ok(self.format.format_simple(&(vt.to_scalar)(value))),
            Shape::SelfTyped => Err(Error::new(ErrorKind::UnsupportedValueType(format!(
                "self-typed `{}` serialized through a different format",
                desc.name()
            )))),
            Shape::Nullable(vt) => match (vt.peek)(value) {
                Some(inner) => self.classify((vt.inner)(), inner),
                None => Ok(self.format.format_null()),
            },
            Shape::Boxed(vt) => self.classify((vt.inner)(), (vt.peek)(value)),
            Shape::Tuple(vt) => {
                let mut children = Vec::with_capacity(vt.slots.len());
                for (i, slot) in vt.slots.iter().enumerate() {
                    self.path.push(Seg::Index(i));
                    let child = self.classify((slot.descriptor)(), (slot.get)(value));
                    self.path.pop();
                    children.push(child?);
                }
                Ok(self.format.format_list(true, children))
            }
            Shape::KeyValuePair(vt) => {
                self.path.push(Seg::Field("key"));
                let key = self.classify((vt.key.descriptor)(), (vt.key.get)(value));
                self.path.pop();
                self.path.push(Seg::Field("value"));
                let val = self.classify((vt.value.descriptor)(), (vt.value.get)(value));
                self.path.pop();
                Ok(self.format.format_key_value_pair(key?, val?))
            }
            Shape::List(vt) => {
                trace!("serializing list of {} elements", (vt.len)(value));
                let element_desc = (vt.element)();
                let mut children = Vec::with_capacity((vt.len)(value));
                let mut failure = None;
                let mut index = 0usize;
                (vt.visit)(value, &mut |item| {
                    if failure.is_some() {
                        return;
                    }
                    self.path.push(Seg::Index(index));
                    match self.classify(element_desc, item) {
                        Ok(el) => children.push(el),
                        Err(e) => failure = Some(e),
                    }
                    self.path.pop();
                    index += 1;
                });
                match failure {
                    Some(e) => Err(e),
                    None => Ok(self.format.format_list(false, children)),
                }
            }
            Shape::Dictionary(vt) => {
                let key_vt = dictionary_key_vt((vt.key)())?;
                let value_desc = (vt.value)();
                let mut entries = Vec::with_capacity((vt.len)(value));
                let mut failure = None;
                (vt.visit)(value, &mut |key, val| {
                    if failure.is_some() {
                        return;
                    }
                    let key_scalar = (key_vt.to_scalar)(key);
                    self.path.push(Seg::Key(exact::scalar_to_string(&key_scalar)));
                    match self.classify(value_desc, val) {
                        Ok(el) => entries.push((key_scalar, el)),
                        Err(e) => failure = Some(e),
                    }
                    self.path.pop();
                });
                match failure {
                    Some(e) => Err(e),
                    None => Ok(self.format.format_dictionary(entries)),
                }
            }
            Shape::Object(vt) => {
                trace!("serializing object `{}`", desc.name());
                let hooks = options.hooks_for(desc.type_id());
                if let Some(h) = hooks
                    && let Some(f) = &h.before_serialize
                {
                    f(value);
                }
                if let Some(f) = vt.before_serialize {
                    f(value);
                }
                let mut fields = Vec::new();
                for field in &vt.fields {
                    if field_omitted(field, value) {
                        continue;
                    }
                    let (Some(get), Some(descriptor)) = (field.get, field.descriptor) else {
                        continue;
                    };
                    self.path.push(Seg::Field(field.name));
                    let element = self.classify(descriptor(), get(value));
                    self.path.pop();
                    fields.push(FieldElement {
                        name: field.name,
                        declaring: field.declaring,
                        element: element?,
                    });
                }
                let mut element = self.format.format_object(fields);
                if let Some(h) = hooks
                    && let Some(f) = &h.after_serialize
                {
                    f(value, &mut element);
                }
                if let Some(f) = vt.after_serialize {
                    f(value, &mut element);
                }
                Ok(element)
            }
            Shape::Referable(vt) => {
                let addr = (vt.address)(value);
                if let Some(state) = self.ids.get(&addr).copied()
                    && let Some(id) = state.id
                {
                    if state.emitted {
                        trace!("emitting reference to id {id}");
                        return Ok(self.format.format_reference(id));
                    }
                    if let Some(state) = self.ids.get_mut(&addr) {
                        state.emitted = true;
                    }
                    let element = self.classify_pointee(vt, value)?;
                    return Ok(self.format.format_referable(element, id));
                }
                self.classify_pointee(vt, value)
            }
            Shape::Polymorphic(vt) => {
                let (inner, inner_desc) = (vt.inner)(value);
                let element = self.classify(inner_desc, inner)?;
                let (tag, is_full) = match vt.variant_of(inner_desc) {
                    Some(variant) => {
                        let module = match variant.full_name.rfind("::") {
                            Some(i) => &variant.full_name[..i],
                            None => "",
                        };
                        if module == vt.module && !variant.name.contains('<') {
                            (variant.name.clone(), false)
                        } else {
                            (variant.full_name.to_owned(), true)
                        }
                    }
                    None => (inner_desc.full_name().to_owned(), true),
                };
                trace!("tagging polymorphic value as `{tag}`");
                Ok(self.format.format_with_type(element, &tag, is_full))
            }
            Shape::FollowId(vt) => {
                let id = (vt.id)(value);
                let element = self.format.format_follow_id(id);
                if let Some(inner) = (vt.peek)(value)
                    && let Some(writer) = options.writer()
                {
                    writer(id, (vt.inner)(), inner)?;
                }
                Ok(element)
            }
        }
    }

    fn classify_pointee(
        &mut self,
        vt: &classify_core::ReferableVt,
        value: &dyn Any,
    ) -> Result<F::Element> {
        let inner_desc = (vt.inner)();
        let mut out = None;
        (vt.with_inner)(value, &mut |pointee| {
            out = Some(self.classify(inner_desc, pointee));
        });
        match out {
            Some(result) => result,
            None => Err(Error::format("referable handle yielded no pointee")),
        }
    }
}

fn field_omitted(field: &Field, object: &dyn Any) -> bool {
    if field.flags.parent {
        return true;
    }
    let Some(get) = field.get else { return true };
    let value = get(object);
    if field.flags.ignore_if_default
        && let Some(is_default) = field.is_default
        && is_default(value)
    {
        return true;
    }
    if field.flags.ignore_if_empty
        && let Some(is_empty) = field.is_empty
        && is_empty(value)
    {
        return true;
    }
    if let Some(skip) = field.skip_if
        && skip(value)
    {
        return true;
    }
    false
}
