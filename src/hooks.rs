//! Host observation points, mirroring the way the teacher's JS host wires a
//! `HostHooks` trait object into the engine: a host embedding this core can
//! observe allocation and binding events without the evaluator depending on
//! the host's own types.

use crate::object::Object;
use crate::symbols::{FunctionSymbol, ModuleSymbol};
use std::rc::Rc;

pub trait Hooks {
    fn on_new_object(&self, _object: &Object) {}
    fn on_variable_assign(&self, _target: &Object, _key: &str, _old: Option<&Object>, _value: &Object) {}
    fn on_enter_package(&self) {}
    fn on_leave_package(&self) {}
    fn on_enter_module(&self, _module: &Rc<ModuleSymbol>) {}
    fn on_leave_module(&self, _module: &Rc<ModuleSymbol>) {}
    fn on_enter_function(&self, _function: &Rc<FunctionSymbol>) {}
    fn on_leave_function(&self, _function: &Rc<FunctionSymbol>) {}
}

/// The default, observation-free implementation.
pub struct NoopHooks;

impl Hooks for NoopHooks {}

pub const NOOP_HOOKS: &'static dyn Hooks = &NoopHooks;
