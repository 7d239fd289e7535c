//! The diagnostic sink: the channel for binder- and evaluator-produced
//! static/semantic errors that do not themselves unwind the evaluation.
//!
//! Diagnostic codes in the 500-599 band are reserved for binder-class
//! errors (mirroring the host toolchain's own numbering); the evaluator
//! reuses a handful of them for semantic violations it detects directly
//! (argument mismatches, illegal l-values, and the like).

use std::cell::RefCell;
use std::fmt;

use crate::symbols::SourcePos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiagnosticCode(pub u32);

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MU{:03}", self.0)
    }
}

pub mod codes {
    use super::DiagnosticCode;

    pub const PACKAGE_HAS_NO_DEFAULT_MODULE: DiagnosticCode = DiagnosticCode(540);
    pub const MODULE_HAS_NO_ENTRYPOINT: DiagnosticCode = DiagnosticCode(541);
    pub const FUNCTION_ARG_MISMATCH: DiagnosticCode = DiagnosticCode(542);
    pub const FUNCTION_ARG_NOT_FOUND: DiagnosticCode = DiagnosticCode(543);
    pub const FUNCTION_ARG_UNKNOWN: DiagnosticCode = DiagnosticCode(544);
    pub const FUNCTION_ARG_INCORRECT_TYPE: DiagnosticCode = DiagnosticCode(545);
    pub const ILLEGAL_READONLY_LVALUE: DiagnosticCode = DiagnosticCode(546);
    pub const UNHANDLED_EXCEPTION: DiagnosticCode = DiagnosticCode(547);
    pub const UNHANDLED_INIT_EXCEPTION: DiagnosticCode = DiagnosticCode(548);
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub at: Option<SourcePos>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.at {
            Some(pos) => write!(f, "{} {}: {} ({})", self.code, self.message, pos, self.code.0),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Records typed, numbered diagnostics with source locations.
///
/// This is the evaluator's only non-unwind-carried error channel: it
/// accumulates so that a single run can surface several problems, rather
/// than aborting at the first.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);

    fn errorf(&self, code: DiagnosticCode, at: Option<SourcePos>, message: impl Into<String>) {
        self.report(Diagnostic {
            code,
            severity: Severity::Error,
            message: message.into(),
            at,
        });
    }

    fn warnf(&self, code: DiagnosticCode, at: Option<SourcePos>, message: impl Into<String>) {
        self.report(Diagnostic {
            code,
            severity: Severity::Warning,
            message: message.into(),
            at,
        });
    }

    fn errors(&self) -> usize;
    fn warnings(&self) -> usize;

    fn success(&self) -> bool {
        self.errors() == 0
    }
}

/// An in-memory sink, suitable for embedding the evaluator and for tests.
#[derive(Debug, Default)]
pub struct VecDiagnosticSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl VecDiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl DiagnosticSink for VecDiagnosticSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    fn errors(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    fn warnings(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}
