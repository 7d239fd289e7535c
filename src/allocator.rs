//! The single entry point for creating runtime `Object`s.
//!
//! Every constructor here fires `Hooks::on_new_object` after the object is
//! fully formed -- callers should never build an `Object` by hand
//! elsewhere, so that a host's allocation hook sees everything.

use std::rc::Rc;

use crate::hooks::Hooks;
use crate::object::{FunctionValue, Object, Payload};
use crate::pointer::Pointer;
use crate::symbols::{FunctionSymbol, Literal, Type};

pub struct Allocator<'h> {
    hooks: &'h dyn Hooks,
}

impl<'h> Allocator<'h> {
    pub fn new(hooks: &'h dyn Hooks) -> Self {
        Allocator { hooks }
    }

    fn finish(&self, object: Object) -> Object {
        self.hooks.on_new_object(&object);
        object
    }

    pub fn new_null(&self) -> Object {
        self.finish(Object::new(Type::Null, None, Payload::Null))
    }

    pub fn new_bool(&self, value: bool) -> Object {
        self.finish(Object::new(Type::Bool, None, Payload::Bool(value)))
    }

    pub fn new_number(&self, value: f64) -> Object {
        self.finish(Object::new(Type::Number, None, Payload::Number(value)))
    }

    pub fn new_string(&self, value: impl Into<Rc<str>>) -> Object {
        self.finish(Object::new(
            Type::String,
            None,
            Payload::String(value.into()),
        ))
    }

    pub fn new_array(&self, element_type: Type, elements: Vec<Pointer>) -> Object {
        self.finish(Object::new(
            Type::Array(Rc::new(element_type)),
            None,
            Payload::Array(elements),
        ))
    }

    pub fn new_function(&self, symbol: Rc<FunctionSymbol>, this: Option<Object>) -> Object {
        self.finish(Object::new(
            Type::Function,
            None,
            Payload::Function(FunctionValue { symbol, this }),
        ))
    }

    pub fn new_pointer(&self, target: Type, pointer: Pointer) -> Object {
        self.finish(Object::new(
            Type::Pointer(Rc::new(target)),
            None,
            Payload::Pointer(pointer),
        ))
    }

    /// Builds a bare property bag of `ty`, prototype-less until the
    /// Initializer Engine or caller attaches one.
    pub fn new(&self, ty: Type) -> Object {
        self.finish(Object::new(ty, None, Payload::None))
    }

    pub fn new_constant(&self, literal: &Literal) -> Object {
        match literal {
            Literal::Null => self.new_null(),
            Literal::Bool(b) => self.new_bool(*b),
            Literal::Number(n) => self.new_number(*n),
            Literal::String(s) => self.new_string(s.as_str()),
        }
    }
}
