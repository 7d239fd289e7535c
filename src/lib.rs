//! A tree-walking evaluator for MuIL: the runtime object model, the
//! statement/expression evaluator, the Initializer Engine, and the
//! `Unwind`-based non-local control flow that ties them together.
//!
//! Lexing, parsing, and binding/type-checking live upstream of this crate;
//! it consumes an already-bound symbol graph ([`symbols`]) and an AST
//! ([`ast`]) and runs it.

mod allocator;
mod ast;
pub mod diagnostics;
mod error;
mod eval;
mod exceptions;
mod hooks;
mod interpreter;
mod object;
mod pointer;
mod property_map;
mod prototype;
mod scope;
pub mod symbols;
mod unwind;

pub use ast::{BinaryOp, Block, CatchClause, Expr, LocationSymbol, Statement, UnaryOp};
pub use error::{Error, Result};
pub use eval::Evaluator;
pub use exceptions::{render_unhandled, RuntimeException};
pub use hooks::{Hooks, NoopHooks, NOOP_HOOKS};
pub use interpreter::{evaluate_function, evaluate_module, evaluate_package, Args};
pub use object::Object;
pub use pointer::Pointer;
pub use scope::StackFrame;
pub use unwind::{EvalResult, Unwind};
