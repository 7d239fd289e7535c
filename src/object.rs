//! The runtime `Object`: the single boxed representation every value takes,
//! whether it is a primitive, an array, a function, a pointer, or a class
//! instance.
//!
//! Every `Object` carries a type symbol, a `PropertyMap`, an optional
//! prototype link, and a payload holding whatever kind-specific data that
//! type implies. Two `Object`s sharing a `Gc` allocation are the same
//! object; cloning an `Object` clones the handle, never the data.

use std::rc::Rc;

use boa_gc::{Finalize, Gc, GcRefCell, Trace};

use crate::pointer::Pointer;
use crate::property_map::PropertyMap;
use crate::symbols::{FunctionSymbol, Type};

#[derive(Trace, Finalize)]
pub enum Payload {
    Null,
    Bool(bool),
    Number(f64),
    #[unsafe_ignore_trace]
    String(Rc<str>),
    Array(Vec<Pointer>),
    Function(FunctionValue),
    Pointer(Pointer),
    /// A plain property bag: class instances and object literals.
    None,
}

#[derive(Trace, Finalize)]
pub struct FunctionValue {
    #[unsafe_ignore_trace]
    pub symbol: Rc<FunctionSymbol>,
    pub this: Option<Object>,
}

#[derive(Trace, Finalize)]
struct ObjectData {
    #[unsafe_ignore_trace]
    ty: Type,
    properties: PropertyMap,
    proto: Option<Object>,
    payload: Payload,
}

#[derive(Clone, Trace, Finalize)]
pub struct Object(Gc<GcRefCell<ObjectData>>);

impl Object {
    pub fn new(ty: Type, proto: Option<Object>, payload: Payload) -> Self {
        Object(Gc::new(GcRefCell::new(ObjectData {
            ty,
            properties: PropertyMap::new(),
            proto,
            payload,
        })))
    }

    pub fn ty(&self) -> Type {
        self.0.borrow().ty.clone()
    }

    pub fn prototype(&self) -> Option<Object> {
        self.0.borrow().proto.clone()
    }

    pub fn set_prototype(&self, proto: Option<Object>) {
        self.0.borrow_mut().proto = proto;
    }

    /// Walks `self`, then its prototype chain, returning the first address
    /// found for `key`. An object's own property always shadows one
    /// inherited from its prototype.
    pub fn lookup_in_chain(&self, key: &str) -> Option<Pointer> {
        if let Some(ptr) = self.properties().get_addr(key) {
            return Some(ptr);
        }
        self.prototype().and_then(|proto| proto.lookup_in_chain(key))
    }

    pub fn properties(&self) -> std::cell::Ref<'_, PropertyMap> {
        std::cell::Ref::map(self.0.borrow(), |d| &d.properties)
    }

    pub fn properties_mut(&self) -> std::cell::RefMut<'_, PropertyMap> {
        std::cell::RefMut::map(self.0.borrow_mut(), |d| &mut d.properties)
    }

    pub fn with_payload<R>(&self, f: impl FnOnce(&Payload) -> R) -> R {
        f(&self.0.borrow().payload)
    }

    pub fn with_payload_mut<R>(&self, f: impl FnOnce(&mut Payload) -> R) -> R {
        f(&mut self.0.borrow_mut().payload)
    }

    pub fn identity_eq(&self, other: &Object) -> bool {
        Gc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.0.borrow().payload, Payload::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.0.borrow().payload {
            Payload::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.0.borrow().payload {
            Payload::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<Rc<str>> {
        match &self.0.borrow().payload {
            Payload::String(s) => Some(Rc::clone(s)),
            _ => None,
        }
    }

    pub fn array_len(&self) -> Option<usize> {
        match &self.0.borrow().payload {
            Payload::Array(elems) => Some(elems.len()),
            _ => None,
        }
    }

    pub fn array_get(&self, index: usize) -> Option<Pointer> {
        match &self.0.borrow().payload {
            Payload::Array(elems) => elems.get(index).cloned(),
            _ => None,
        }
    }

    pub fn array_push(&self, ptr: Pointer) {
        if let Payload::Array(elems) = &mut self.0.borrow_mut().payload {
            elems.push(ptr);
        }
    }

    /// Writes `value` at `index`, growing the backing store with fresh
    /// null-valued pointers (produced by `filler`) if `index` is beyond the
    /// current length. Negative indices are rejected by the caller before
    /// this is reached.
    pub fn array_set_grow(&self, index: usize, value: Object, filler: impl Fn() -> Object) {
        if let Payload::Array(elems) = &mut self.0.borrow_mut().payload {
            while elems.len() <= index {
                elems.push(Pointer::new(filler(), false));
            }
            let _ = elems[index].set(value);
        }
    }

    /// Returns the `Pointer` backing slot `index`, growing the array with
    /// fresh null-valued pointers (via `filler`) if necessary. Used by
    /// `&arr[i]` to produce a genuine address rather than a copied value.
    pub fn array_ensure_addr(&self, index: usize, filler: impl Fn() -> Object) -> Option<Pointer> {
        if let Payload::Array(elems) = &mut self.0.borrow_mut().payload {
            while elems.len() <= index {
                elems.push(Pointer::new(filler(), false));
            }
            Some(elems[index].clone())
        } else {
            None
        }
    }

    pub fn function_value(&self) -> Option<(Rc<FunctionSymbol>, Option<Object>)> {
        match &self.0.borrow().payload {
            Payload::Function(FunctionValue { symbol, this }) => {
                Some((Rc::clone(symbol), this.clone()))
            }
            _ => None,
        }
    }

    pub fn pointer_value(&self) -> Option<Pointer> {
        match &self.0.borrow().payload {
            Payload::Pointer(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.ty().name())
    }
}
