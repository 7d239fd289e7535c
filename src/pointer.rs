//! The `Pointer` (a.k.a. Cell): a mutable, optionally read-only memory cell
//! holding a single `Object` reference.
//!
//! Pointers back every addressable location in the runtime: array slots,
//! property values, and the payload of `new Pointer` expressions. Identity
//! matters -- two `Pointer`s are the same location iff they share the same
//! underlying `Gc` allocation, never by comparing pointee values.

use boa_gc::{Finalize, Gc, GcRefCell, Trace};

use crate::object::Object;

#[derive(Trace, Finalize)]
struct PointerData {
    value: GcRefCell<Object>,
    #[unsafe_ignore_trace]
    readonly: std::cell::Cell<bool>,
}

/// A shared, traceable reference cell. Cloning a `Pointer` clones the
/// handle, not the cell -- both clones observe the same writes.
#[derive(Clone, Trace, Finalize)]
pub struct Pointer(Gc<PointerData>);

/// Returned when a write targets a pointer that has been frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadonlyViolation;

impl Pointer {
    pub fn new(value: Object, readonly: bool) -> Self {
        Pointer(Gc::new(PointerData {
            value: GcRefCell::new(value),
            readonly: std::cell::Cell::new(readonly),
        }))
    }

    pub fn get(&self) -> Object {
        self.0.value.borrow().clone()
    }

    pub fn is_readonly(&self) -> bool {
        self.0.readonly.get()
    }

    /// Writes through the pointer. Fails without mutating if the pointer
    /// has been frozen; the evaluator turns this into an assignment
    /// diagnostic rather than a panic.
    pub fn set(&self, value: Object) -> Result<(), ReadonlyViolation> {
        if self.0.readonly.get() {
            return Err(ReadonlyViolation);
        }
        *self.0.value.borrow_mut() = value;
        Ok(())
    }

    /// Bypasses the read-only check once, used by the Initializer Engine to
    /// install a property's computed value before freezing it.
    pub fn set_initializing(&self, value: Object) {
        *self.0.value.borrow_mut() = value;
    }

    /// Marks the cell read-only. Idempotent, and never reversible -- once a
    /// `readonly` property has been initialized it stays frozen for the
    /// object's lifetime.
    pub fn freeze(&self) {
        self.0.readonly.set(true);
    }

    pub fn identity_eq(&self, other: &Pointer) -> bool {
        Gc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pointer")
            .field("readonly", &self.is_readonly())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object::{Object, Payload};
    use crate::symbols::Type;

    fn null() -> Object {
        Object::new(Type::Null, None, Payload::Null)
    }

    fn number(n: f64) -> Object {
        Object::new(Type::Number, None, Payload::Number(n))
    }

    #[test]
    fn set_then_get_round_trips() {
        let ptr = Pointer::new(number(1.0), false);
        ptr.set(number(2.0)).expect("writable pointer accepts set");
        assert_eq!(ptr.get().as_number(), Some(2.0));
    }

    #[test]
    fn freeze_rejects_further_writes() {
        let ptr = Pointer::new(number(1.0), false);
        ptr.freeze();
        assert_eq!(ptr.set(number(2.0)), Err(ReadonlyViolation));
        assert_eq!(ptr.get().as_number(), Some(1.0));
    }

    #[test]
    fn freeze_is_idempotent() {
        let ptr = Pointer::new(null(), false);
        ptr.freeze();
        ptr.freeze();
        assert!(ptr.is_readonly());
    }

    #[test]
    fn clone_shares_the_same_cell() {
        let ptr = Pointer::new(number(1.0), false);
        let alias = ptr.clone();
        alias.set(number(9.0)).unwrap();
        assert_eq!(ptr.get().as_number(), Some(9.0));
        assert!(ptr.identity_eq(&alias));
    }
}
