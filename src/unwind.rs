//! `Unwind`: the single channel every non-local exit from a statement or
//! expression travels through. Ordinary completion is `Ok(..)`; any of
//! return/break/continue/throw is `Err(Unwind::..)`, propagated with `?`
//! through every caller frame until something matches it. "No unwind" is
//! never confused with a bare `return;`, which is `Err(Unwind::Return(None))`.

use crate::object::Object;

#[derive(Debug, Clone)]
pub enum Unwind {
    Return(Option<Object>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Object),
}

pub type EvalResult<T> = Result<T, Unwind>;
