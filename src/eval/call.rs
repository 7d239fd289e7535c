//! The call protocol: binding arguments, checking the `this`/static policy,
//! pushing an activation frame, and mapping a `Return` unwind back into an
//! ordinary value.

use std::rc::Rc;

use crate::exceptions::RuntimeException;
use crate::object::Object;
use crate::scope::LocalScope;
use crate::symbols::{FunctionKind, FunctionParent, FunctionSymbol, SourcePos};
use crate::unwind::{EvalResult, Unwind};

use super::{Evaluator, Frame};

/// Pops the call stack on drop, regardless of how the call returns --
/// normal completion, an early `?`, or a thrown exception all unwind
/// through here exactly once.
struct CallStackGuard<'a, 'h> {
    evaluator: &'a Evaluator<'h>,
}

impl Drop for CallStackGuard<'_, '_> {
    fn drop(&mut self) {
        self.evaluator.call_stack.borrow_mut().pop();
    }
}

impl<'h> Evaluator<'h> {
    fn enter_call(&self, function: Rc<FunctionSymbol>, caller_pos: Option<SourcePos>) -> CallStackGuard<'_, 'h> {
        self.call_stack.borrow_mut().push(function, caller_pos);
        CallStackGuard { evaluator: self }
    }

    /// Runs a function body with no arguments and no bound `this`; used by
    /// the Initializer Engine to invoke module and class static
    /// initializers, which take no parameters.
    pub(crate) fn invoke_body(
        &self,
        function: &Rc<FunctionSymbol>,
        frame: &mut Frame,
    ) -> EvalResult<Option<Object>> {
        self.invoke_body_at(function, frame, None)
    }

    pub(crate) fn invoke_body_at(
        &self,
        function: &Rc<FunctionSymbol>,
        frame: &mut Frame,
        caller_pos: Option<SourcePos>,
    ) -> EvalResult<Option<Object>> {
        let _guard = self.enter_call(Rc::clone(function), caller_pos);
        self.hooks.on_enter_function(function);
        let result = self.eval_block(&function.body, frame);
        self.hooks.on_leave_function(function);
        match result {
            Ok(()) => Ok(None),
            Err(Unwind::Return(value)) => Ok(value),
            Err(other @ Unwind::Throw(_)) => Err(other),
            Err(Unwind::Break(_)) | Err(Unwind::Continue(_)) => {
                unreachable!("break/continue cannot escape a function body")
            }
        }
    }

    /// Invokes `function`, bound to `this` if it is an instance method,
    /// with `args` already evaluated in the caller's context. This is the
    /// single place parameters are bound and the this-policy is enforced.
    pub fn invoke(
        &self,
        function: &Rc<FunctionSymbol>,
        this: Option<Object>,
        args: Vec<Object>,
        caller_pos: Option<SourcePos>,
    ) -> EvalResult<Object> {
        let is_instance_method = match &function.parent {
            FunctionParent::Class(_) => !function.is_static,
            FunctionParent::Module(_) => false,
        };

        if is_instance_method && this.is_none() {
            return Err(RuntimeException::NullObject.throw(self));
        }
        if !is_instance_method && this.is_some() {
            debug_assert!(false, "static/module function invoked with a bound this");
        }

        if function.kind == FunctionKind::Constructor {
            debug_assert!(this.is_some(), "constructor invoked without a target instance");
        }

        let module = Rc::clone(
            function
                .parent_module()
                .expect("every function belongs to a module, directly or via its class"),
        );

        if let FunctionParent::Class(class) = &function.parent {
            if function.is_static {
                self.ensure_class_init(class)?;
            }
        } else {
            self.ensure_module_init(&module)?;
        }

        let mut scope = LocalScope::new();
        for (param, value) in function.params.iter().zip(args.into_iter()) {
            scope.declare(&param.name, crate::pointer::Pointer::new(value, false));
        }

        let mut frame = Frame {
            scope: &mut scope,
            this,
            module,
        };

        let result = self.invoke_body_at(function, &mut frame, caller_pos)?;
        Ok(result.unwrap_or_else(|| self.alloc().new_null()))
    }
}
