//! The three host-facing entry points: evaluating a whole package, a single
//! module, or one function directly. All three funnel into
//! `Evaluator::invoke`; this module's job is argument binding and turning
//! an unhandled `Throw` or a diagnostics-only failure into the host-facing
//! `Error`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::{codes, DiagnosticSink};
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::exceptions::render_unhandled;
use crate::object::Object;
use crate::symbols::{FunctionSymbol, Literal, ModuleSymbol, PackageSymbol};
use crate::unwind::Unwind;

/// A call's actual arguments, by parameter name, as the host supplies them:
/// pre-constructed literals the Evaluator promotes to Objects via the
/// Allocator.
pub type Args = HashMap<String, Literal>;

fn diagnostics_failure(evaluator: &Evaluator<'_>) -> Error {
    Error::Diagnostics(evaluator.diagnostics.errors())
}

fn unwind_to_error(evaluator: &Evaluator<'_>, unwind: Unwind) -> Error {
    match unwind {
        Unwind::Throw(value) => {
            let frames = evaluator.last_throw_frames();
            let message = render_unhandled(&value, &frames, "    ");
            log::warn!("unhandled exception escaped top-level evaluation: {message}");
            evaluator.diagnostics.errorf(codes::UNHANDLED_EXCEPTION, None, message.clone());
            Error::Unhandled(message)
        }
        Unwind::Return(_) | Unwind::Break(_) | Unwind::Continue(_) => {
            unreachable!("return/break/continue cannot escape a top-level evaluation")
        }
    }
}

/// Evaluates a package by running its default module's entrypoint.
pub fn evaluate_package(evaluator: &Evaluator<'_>, package: &PackageSymbol, args: &Args) -> Result<Object> {
    log::debug!("evaluating package '{}'", package.name);
    evaluator.hooks.on_enter_package();
    let outcome = (|| {
        let default_module = package.default_module.clone().ok_or_else(|| {
            evaluator.diagnostics.errorf(
                codes::PACKAGE_HAS_NO_DEFAULT_MODULE,
                None,
                format!("package '{}' has no default module", package.name),
            );
            diagnostics_failure(evaluator)
        })?;
        evaluate_module(evaluator, &default_module, args)
    })();
    evaluator.hooks.on_leave_package();
    outcome
}

/// Evaluates a module by running its entrypoint function.
pub fn evaluate_module(evaluator: &Evaluator<'_>, module: &Rc<ModuleSymbol>, args: &Args) -> Result<Object> {
    let entry = module.entrypoint().ok_or_else(|| {
        evaluator.diagnostics.errorf(
            codes::MODULE_HAS_NO_ENTRYPOINT,
            None,
            format!("module '{}' has no entrypoint function", module.name),
        );
        diagnostics_failure(evaluator)
    })?;
    evaluate_function(evaluator, &entry, None, args)
}

/// Evaluates a single function directly, e.g. for a host driving a
/// specific exported entry point with caller-supplied, by-name arguments.
///
/// Every formal parameter must appear exactly once in `args`; missing or
/// extra names are diagnostic errors rather than a thrown exception, since
/// they indicate a mismatch the Binder should have already caught.
pub fn evaluate_function(
    evaluator: &Evaluator<'_>,
    function: &Rc<FunctionSymbol>,
    this: Option<Object>,
    args: &Args,
) -> Result<Object> {
    let mut missing = Vec::new();
    let mut ordered = Vec::with_capacity(function.params.len());
    for param in &function.params {
        match args.get(&param.name) {
            Some(literal) => ordered.push((param, literal)),
            None => missing.push(param.name.as_str()),
        }
    }
    if !missing.is_empty() {
        evaluator.diagnostics.errorf(
            codes::FUNCTION_ARG_NOT_FOUND,
            function.pos,
            format!("function '{}' is missing argument(s): {}", function.name, missing.join(", ")),
        );
    }

    let known: std::collections::HashSet<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
    let mut extra: Vec<&str> = args.keys().map(String::as_str).filter(|name| !known.contains(name)).collect();
    extra.sort_unstable();
    if !extra.is_empty() {
        evaluator.diagnostics.errorf(
            codes::FUNCTION_ARG_UNKNOWN,
            function.pos,
            format!("function '{}' was given unknown argument(s): {}", function.name, extra.join(", ")),
        );
    }

    if !evaluator.diagnostics.success() {
        return Err(diagnostics_failure(evaluator));
    }

    let mut values = Vec::with_capacity(ordered.len());
    for (param, literal) in ordered {
        let value = evaluator.alloc().new_constant(literal);
        if !value.ty().is_assignable_to(&param.ty) {
            evaluator.diagnostics.errorf(
                codes::FUNCTION_ARG_INCORRECT_TYPE,
                function.pos,
                format!(
                    "argument '{}' expects type '{}', got '{}'",
                    param.name,
                    param.ty.name(),
                    value.ty().name()
                ),
            );
        }
        values.push(value);
    }

    if !evaluator.diagnostics.success() {
        return Err(diagnostics_failure(evaluator));
    }

    evaluator
        .invoke(function, this, values, function.pos)
        .map_err(|unwind| unwind_to_error(evaluator, unwind))
}
