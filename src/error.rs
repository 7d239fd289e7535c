//! The host-facing error type: what `EvaluatePackage`/`EvaluateModule`/
//! `EvaluateFunction` return when they cannot produce a value, as distinct
//! from the in-flight `Unwind` channel the evaluator itself uses.

use derive_more::{Display, Error, From};

#[derive(Debug, Display, Error, From)]
pub enum Error {
    #[display(fmt = "evaluation failed with {_0} diagnostic(s)")]
    Diagnostics(#[error(not(source))] usize),
    #[display(fmt = "{_0}")]
    Unhandled(#[error(not(source))] String),
}

pub type Result<T> = std::result::Result<T, Error>;
