//! Builds and caches per-class prototype objects.
//!
//! A prototype holds every *non-static* member of its class, and chains to
//! its base class's prototype exactly once via `Object::prototype`. The
//! chain is built base-first and memoized, so a deep hierarchy is only ever
//! walked once per class regardless of instance count.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::allocator::Allocator;
use crate::hooks::Hooks;
use crate::object::Object;
use crate::pointer::Pointer;
use crate::symbols::{ClassMemberKind, ClassSymbol, Type};

pub struct PrototypeRegistry {
    cache: RefCell<HashMap<*const ClassSymbol, Object>>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        PrototypeRegistry {
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the prototype object for `class`, building (and caching) it
    /// and every ancestor prototype it does not already have, base class
    /// first.
    pub fn get_prototype(&self, class: &Rc<ClassSymbol>, hooks: &dyn Hooks) -> Object {
        let key = Rc::as_ptr(class);
        if let Some(existing) = self.cache.borrow().get(&key) {
            return existing.clone();
        }

        let alloc = Allocator::new(hooks);
        let base_proto = class
            .base
            .borrow()
            .clone()
            .map(|base| self.get_prototype(&base, hooks));

        let proto = alloc.new(Type::PrototypeOf(Rc::clone(class)));
        proto.set_prototype(base_proto);

        for member in class.members.borrow().iter() {
            if member.is_static {
                continue;
            }
            match &member.kind {
                ClassMemberKind::Function(f) => {
                    let value = alloc.new_function(Rc::clone(f), None);
                    proto
                        .properties_mut()
                        .init_addr(&member.name, || Pointer::new(value, true));
                }
                ClassMemberKind::Variable(v) => {
                    let value = v
                        .default
                        .as_ref()
                        .map(|lit| alloc.new_constant(lit))
                        .unwrap_or_else(|| alloc.new_null());
                    proto
                        .properties_mut()
                        .init_addr(&member.name, || Pointer::new(value, v.readonly));
                }
                ClassMemberKind::NestedClass(_) => {}
            }
        }

        self.cache.borrow_mut().insert(key, proto.clone());
        proto
    }
}

impl Default for PrototypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
