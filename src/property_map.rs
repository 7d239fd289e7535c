//! Stable, insertion-ordered storage of an object's properties.
//!
//! Once a key has been given an address via `init_addr`, the same
//! `Pointer` is returned for that key for the object's lifetime -- callers
//! may stash a `Pointer` and rely on it staying live and correct even as
//! other properties are added.

use std::collections::HashMap;
use std::rc::Rc;

use boa_gc::{Finalize, Trace};

use crate::pointer::Pointer;

#[derive(Trace, Finalize, Clone)]
struct Entry {
    #[unsafe_ignore_trace]
    key: Rc<str>,
    ptr: Pointer,
}

#[derive(Trace, Finalize, Default, Clone)]
pub struct PropertyMap {
    entries: Vec<Entry>,
    #[unsafe_ignore_trace]
    index: HashMap<Rc<str>, usize>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_addr(&self, key: &str) -> Option<Pointer> {
        self.index.get(key).map(|&i| self.entries[i].ptr.clone())
    }

    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the existing pointer for `key`, or allocates a fresh one
    /// holding `value` (read-only as given) and returns that.
    pub fn init_addr(&mut self, key: &str, value_if_absent: impl FnOnce() -> Pointer) -> Pointer {
        if let Some(&i) = self.index.get(key) {
            return self.entries[i].ptr.clone();
        }
        let rc_key: Rc<str> = Rc::from(key);
        let ptr = value_if_absent();
        self.index.insert(Rc::clone(&rc_key), self.entries.len());
        self.entries.push(Entry {
            key: rc_key,
            ptr: ptr.clone(),
        });
        ptr
    }

    pub fn set(&mut self, key: &str, default_readonly: bool, value: crate::object::Object) {
        match self.get_addr(key) {
            Some(ptr) => {
                let _ = ptr.set(value);
            }
            None => {
                self.init_addr(key, || Pointer::new(value.clone(), default_readonly));
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pointer)> {
        self.entries.iter().map(|e| (e.key.as_ref(), &e.ptr))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PropertyMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.keys().map(|k| (k, "<ptr>"))).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object::{Object, Payload};
    use crate::symbols::Type;

    fn number(n: f64) -> Object {
        Object::new(Type::Number, None, Payload::Number(n))
    }

    #[test]
    fn init_addr_returns_the_same_pointer_for_a_repeated_key() {
        let mut map = PropertyMap::new();
        let first = map.init_addr("x", || Pointer::new(number(1.0), false));
        let second = map.init_addr("x", || Pointer::new(number(99.0), false));
        assert!(first.identity_eq(&second));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut map = PropertyMap::new();
        map.init_addr("b", || Pointer::new(number(2.0), false));
        map.init_addr("a", || Pointer::new(number(1.0), false));
        map.init_addr("c", || Pointer::new(number(3.0), false));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn get_addr_on_missing_key_is_none() {
        let map = PropertyMap::new();
        assert!(map.get_addr("missing").is_none());
        assert!(!map.has("missing"));
    }
}
