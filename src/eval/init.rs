//! The Initializer Engine: lazily, and at most once, brings a module's
//! globals or a class's statics into existence.
//!
//! Both paths follow the same shape: mark the symbol "in progress" before
//! touching anything it depends on (so a dependency cycle resolves to a
//! partially-initialized bag instead of infinite recursion), initialize
//! dependencies, populate properties, run the symbol's own initializer
//! function if it has one, then freeze every `readonly` cell that was
//! populated.

use std::rc::Rc;

use crate::diagnostics::{codes, DiagnosticSink};
use crate::exceptions::render_unhandled;
use crate::object::Object;
use crate::pointer::Pointer;
use crate::symbols::{ClassMemberKind, ClassSymbol, ModuleMemberKind, ModuleSymbol, SourcePos, VariableSymbol};
use crate::unwind::{EvalResult, Unwind};

use super::{ClassState, Evaluator, Frame, InitState, ModuleState};

impl<'h> Evaluator<'h> {
    /// Runs a module/class initializer body. A thrown exception is reported
    /// as an unhandled-init diagnostic rather than propagated -- the
    /// initializer's failure must not abort the rest of the evaluation.
    fn run_init_body(&self, init_fn: &Rc<crate::symbols::FunctionSymbol>, frame: &mut Frame, at: Option<SourcePos>) {
        match self.invoke_body(init_fn, frame) {
            Ok(_) => {}
            Err(Unwind::Throw(exception)) => {
                let frames = self.last_throw_frames();
                let message = render_unhandled(&exception, &frames, "    ");
                self.diagnostics.errorf(codes::UNHANDLED_INIT_EXCEPTION, at, message);
            }
            Err(other) => unreachable!("break/continue cannot escape an initializer body: {other:?}"),
        }
    }

    /// Installs `var`'s default value, unfrozen -- a `readonly` static or
    /// global is still writable at this point, so its owning `init` body can
    /// assign it. The caller freezes it once the initializer has run.
    fn init_property(&self, bag: &Object, name: &str, var: &Rc<VariableSymbol>) {
        let value = var
            .default
            .as_ref()
            .map(|lit| self.alloc().new_constant(lit))
            .unwrap_or_else(|| self.alloc().new_null());
        let ptr = bag
            .properties_mut()
            .init_addr(name, || Pointer::new(value.clone(), false));
        ptr.set_initializing(value);
    }

    /// Lazily initializes `module`'s globals, recursing into its imports
    /// first. Returns the bag holding every module-level function and
    /// variable as a property.
    pub fn ensure_module_init(&self, module: &Rc<ModuleSymbol>) -> EvalResult<Object> {
        let key = Rc::as_ptr(module.as_ref());

        {
            let mut modules = self.modules.borrow_mut();
            if let Some(existing) = modules.get(&key) {
                if existing.state != InitState::NotStarted {
                    return Ok(existing.globals.clone());
                }
            } else {
                let globals = self.alloc().new(crate::symbols::Type::Dynamic);
                modules.insert(
                    key,
                    ModuleState {
                        globals,
                        state: InitState::NotStarted,
                    },
                );
            }
            modules.get_mut(&key).unwrap().state = InitState::InProgress;
        }

        log::debug!("initializing module '{}'", module.name);
        self.hooks.on_enter_module(module);

        for import in &module.imports {
            self.ensure_module_init(import)?;
        }

        let globals = self.modules.borrow().get(&key).unwrap().globals.clone();

        for member in module.members.borrow().iter() {
            match &member.kind {
                ModuleMemberKind::Function(f) => {
                    let value = self.alloc().new_function(Rc::clone(f), None);
                    globals
                        .properties_mut()
                        .init_addr(&member.name, || Pointer::new(value, true));
                }
                ModuleMemberKind::Variable(v) => self.init_property(&globals, &member.name, v),
                ModuleMemberKind::Class(_) => {}
            }
        }

        if let Some(init_fn) = module.init.borrow().clone() {
            let mut scope = crate::scope::LocalScope::new();
            let mut frame = Frame {
                scope: &mut scope,
                this: None,
                module: Rc::clone(module),
            };
            self.run_init_body(&init_fn, &mut frame, module.pos);
        }

        for member in module.members.borrow().iter() {
            if let ModuleMemberKind::Variable(v) = &member.kind {
                if v.readonly {
                    if let Some(ptr) = globals.properties().get_addr(&member.name) {
                        ptr.freeze();
                    }
                }
            }
        }

        self.modules.borrow_mut().get_mut(&key).unwrap().state = InitState::Done;
        self.hooks.on_leave_module(module);
        Ok(globals)
    }

    /// Lazily initializes `class`'s statics, recursing into its base class
    /// first. Returns the bag holding every static member as a property.
    pub fn ensure_class_init(&self, class: &Rc<ClassSymbol>) -> EvalResult<Object> {
        let key = Rc::as_ptr(class.as_ref());

        {
            let mut classes = self.classes.borrow_mut();
            if let Some(existing) = classes.get(&key) {
                if existing.state != InitState::NotStarted {
                    return Ok(existing.statics.clone());
                }
            } else {
                let statics = self.alloc().new(crate::symbols::Type::Dynamic);
                classes.insert(
                    key,
                    ClassState {
                        statics,
                        state: InitState::NotStarted,
                    },
                );
            }
            classes.get_mut(&key).unwrap().state = InitState::InProgress;
        }

        if let Some(base) = class.base.borrow().clone() {
            self.ensure_class_init(&base)?;
        }

        let statics = self.classes.borrow().get(&key).unwrap().statics.clone();

        for member in class.members.borrow().iter() {
            if !member.is_static {
                continue;
            }
            match &member.kind {
                ClassMemberKind::Function(f) => {
                    let value = self.alloc().new_function(Rc::clone(f), None);
                    statics
                        .properties_mut()
                        .init_addr(&member.name, || Pointer::new(value, true));
                }
                ClassMemberKind::Variable(v) => self.init_property(&statics, &member.name, v),
                ClassMemberKind::NestedClass(_) => {}
            }
        }

        if let Some(init_fn) = class.init.borrow().clone() {
            let mut scope = crate::scope::LocalScope::new();
            let mut frame = Frame {
                scope: &mut scope,
                this: None,
                module: Rc::clone(&class.parent_module),
            };
            self.run_init_body(&init_fn, &mut frame, class.pos);
        }

        for member in class.members.borrow().iter() {
            if member.is_static {
                if let ClassMemberKind::Variable(v) = &member.kind {
                    if v.readonly {
                        if let Some(ptr) = statics.properties().get_addr(&member.name) {
                            ptr.freeze();
                        }
                    }
                }
            }
        }

        self.classes.borrow_mut().get_mut(&key).unwrap().state = InitState::Done;
        Ok(statics)
    }
}
