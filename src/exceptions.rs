//! The built-in exceptions the Evaluator itself raises (as opposed to ones a
//! running program throws explicitly), plus the "unhandled exception"
//! rendering used when a `Throw` unwind reaches the top of a call stack
//! with no enclosing `try`.

use thiserror::Error;

use crate::eval::Evaluator;
use crate::object::Object;
use crate::scope::StackFrame;
use crate::unwind::Unwind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeException {
    #[error("object reference not set to an instance of an object")]
    NullObject,
    #[error("unable to cast object of type '{from}' to type '{to}'")]
    InvalidCast { from: String, to: String },
    #[error("array size cannot be negative")]
    NegativeArrayLength,
    #[error("incorrect number of elements for array literal of length {expected}: got {actual}")]
    IncorrectArrayElementCount { expected: usize, actual: usize },
    #[error("expression is not implemented: {what}")]
    Unimplemented { what: &'static str },
}

impl RuntimeException {
    pub fn throw(&self, evaluator: &Evaluator<'_>) -> Unwind {
        let value = evaluator.alloc().new_string(self.to_string());
        evaluator.raise(value)
    }
}

/// Renders an exception object and the active call stack the way a host
/// would print an uncaught exception: one "at" line per frame, innermost
/// first, indented by the caller's chosen prefix.
pub fn render_unhandled(value: &Object, frames: &[StackFrame], indent: &str) -> String {
    let message = value
        .as_string()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("<{}>", value.ty().name()));

    let mut out = format!("Unhandled exception: {message}");
    for frame in frames.iter().rev() {
        out.push('\n');
        out.push_str(indent);
        out.push_str("at ");
        out.push_str(&frame.function.name);
        if let Some(pos) = frame.caller_pos {
            out.push_str(&format!(" ({pos})"));
        }
    }
    out
}
