//! The symbol and type graph that the Binder is assumed to have produced.
//!
//! Lexing, parsing and binding are out of scope for this core; what follows
//! is the shape of the typed, name-resolved program graph the Evaluator
//! consumes. Real embedders wire their own binder up to these types; the
//! tests in this crate build small graphs by hand.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A literal value as produced by the Binder (e.g. a default value, or an
/// argument passed into `EvaluateFunction`). Promoted to a runtime `Object`
/// via the Allocator's `new_constant`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// A type reference as resolved by the Binder. `PrototypeOf` is synthesized
/// by the Prototype Registry and never appears in source-level type
/// annotations.
#[derive(Debug, Clone)]
pub enum Type {
    Null,
    Bool,
    Number,
    String,
    Dynamic,
    Array(Rc<Type>),
    Pointer(Rc<Type>),
    Function,
    Class(Rc<ClassSymbol>),
    PrototypeOf(Rc<ClassSymbol>),
}

impl Type {
    pub fn name(&self) -> String {
        match self {
            Type::Null => "null".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Number => "number".to_string(),
            Type::String => "string".to_string(),
            Type::Dynamic => "dynamic".to_string(),
            Type::Array(elem) => format!("{}[]", elem.name()),
            Type::Pointer(target) => format!("*{}", target.name()),
            Type::Function => "function".to_string(),
            Type::Class(c) => c.name.clone(),
            Type::PrototypeOf(c) => format!("PrototypeOf({})", c.name),
        }
    }

    /// Walks the class hierarchy to decide whether `self` is `target` or a
    /// subtype of it. Primitives and `Dynamic` use simple structural rules;
    /// this is intentionally not a full type-checker, since that is the
    /// Binder's job -- it exists only to back the evaluator's own runtime
    /// checks (casts, array sizing).
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        match (self, target) {
            (_, Type::Dynamic) => true,
            (Type::Null, Type::Array(_) | Type::Pointer(_) | Type::Function | Type::Class(_)) => {
                true
            }
            (Type::Null, Type::Null) => true,
            (Type::Bool, Type::Bool) => true,
            (Type::Number, Type::Number) => true,
            (Type::String, Type::String) => true,
            (Type::Function, Type::Function) => true,
            (Type::Array(a), Type::Array(b)) => a.is_assignable_to(b),
            (Type::Pointer(a), Type::Pointer(b)) => a.is_assignable_to(b),
            (Type::Class(from), Type::Class(to)) => class_extends(from, to),
            _ => false,
        }
    }
}

fn class_extends(from: &Rc<ClassSymbol>, to: &Rc<ClassSymbol>) -> bool {
    let mut current = Some(Rc::clone(from));
    while let Some(c) = current {
        if Rc::ptr_eq(&c, to) {
            return true;
        }
        current = c.base.borrow().clone();
    }
    false
}

#[derive(Debug)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: Type,
    pub default: Option<Literal>,
    pub readonly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Plain,
    Constructor,
}

#[derive(Debug)]
pub enum FunctionParent {
    Class(Rc<ClassSymbol>),
    Module(Rc<ModuleSymbol>),
}

#[derive(Debug)]
pub struct FunctionSymbol {
    pub name: String,
    pub parent: FunctionParent,
    pub is_static: bool,
    pub kind: FunctionKind,
    pub params: Vec<Rc<VariableSymbol>>,
    pub return_type: Option<Type>,
    pub body: Rc<Block>,
    pub pos: Option<SourcePos>,
}

impl FunctionSymbol {
    pub fn parent_class(&self) -> Option<&Rc<ClassSymbol>> {
        match &self.parent {
            FunctionParent::Class(c) => Some(c),
            FunctionParent::Module(_) => None,
        }
    }

    pub fn parent_module(&self) -> Option<&Rc<ModuleSymbol>> {
        match &self.parent {
            FunctionParent::Module(m) => Some(m),
            FunctionParent::Class(c) => Some(&c.parent_module),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClassMemberKind {
    Function(Rc<FunctionSymbol>),
    Variable(Rc<VariableSymbol>),
    NestedClass(Rc<ClassSymbol>),
}

#[derive(Debug)]
pub struct ClassMember {
    pub name: String,
    pub is_static: bool,
    pub kind: ClassMemberKind,
}

/// A class's members, behind a `RefCell` for the same reason `base` is:
/// a method's `FunctionSymbol` holds an `Rc<ClassSymbol>` pointing back at
/// the class that owns it, so the binder must construct the (empty) class
/// first, build its methods against that `Rc`, then fill the member list in
/// -- a two-phase construction the rest of this crate only ever reads after
/// the binder has finished.
#[derive(Debug)]
pub struct ClassSymbol {
    pub name: String,
    pub parent_module: Rc<ModuleSymbol>,
    pub base: RefCell<Option<Rc<ClassSymbol>>>,
    pub members: RefCell<Vec<ClassMember>>,
    /// The class's static initializer (`static init { ... }`), distinct
    /// from the `constructor` member. A `RefCell` for the same two-phase
    /// construction reason as `members`: the initializer's own
    /// `FunctionSymbol` points back at this class.
    pub init: RefCell<Option<Rc<FunctionSymbol>>>,
    pub pos: Option<SourcePos>,
}

impl ClassSymbol {
    pub fn member(&self, name: &str) -> Option<ClassMemberKind> {
        self.members
            .borrow()
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.kind.clone())
    }

    pub fn is_static_member(&self, name: &str) -> Option<bool> {
        self.members.borrow().iter().find(|m| m.name == name).map(|m| m.is_static)
    }

    pub fn constructor(&self) -> Option<Rc<FunctionSymbol>> {
        self.member("constructor").and_then(|kind| match kind {
            ClassMemberKind::Function(f) if f.kind == FunctionKind::Constructor => Some(f),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum ModuleMemberKind {
    Function(Rc<FunctionSymbol>),
    Variable(Rc<VariableSymbol>),
    Class(Rc<ClassSymbol>),
}

#[derive(Debug)]
pub struct ModuleMember {
    pub name: String,
    pub kind: ModuleMemberKind,
}

pub const ENTRYPOINT_FUNCTION: &str = "entrypoint";

/// A module's members, behind a `RefCell` for the same two-phase
/// construction reason as [`ClassSymbol::members`]: a module-level
/// function's `FunctionSymbol` holds an `Rc<ModuleSymbol>` pointing back at
/// this module.
#[derive(Debug)]
pub struct ModuleSymbol {
    pub name: String,
    pub imports: Vec<Rc<ModuleSymbol>>,
    pub members: RefCell<Vec<ModuleMember>>,
    /// The module's initializer (`module init { ... }`), behind a `RefCell`
    /// for the same reason as `members`.
    pub init: RefCell<Option<Rc<FunctionSymbol>>>,
    pub pos: Option<SourcePos>,
}

impl ModuleSymbol {
    pub fn member(&self, name: &str) -> Option<ModuleMemberKind> {
        self.members
            .borrow()
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.kind.clone())
    }

    pub fn entrypoint(&self) -> Option<Rc<FunctionSymbol>> {
        self.member(ENTRYPOINT_FUNCTION).and_then(|kind| match kind {
            ModuleMemberKind::Function(f) => Some(f),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub struct PackageSymbol {
    pub name: String,
    pub default_module: Option<Rc<ModuleSymbol>>,
}

/// An alias symbol that transparently forwards to another symbol. Export
/// chains are resolved by `Symbol::resolve`; cycles are a binder bug and
/// are asserted against rather than handled gracefully.
#[derive(Debug)]
pub struct ExportSymbol {
    pub name: String,
    pub referent: RefCell<Option<Symbol>>,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    ClassMember {
        class: Rc<ClassSymbol>,
        name: String,
    },
    ModuleMember {
        module: Rc<ModuleSymbol>,
        name: String,
    },
    Export(Rc<ExportSymbol>),
}

impl Symbol {
    /// Chases export aliases until it bottoms out on a real symbol. A
    /// self-referential export indicates a broken binder and is a hard
    /// assertion, not a recoverable error.
    pub fn resolve(mut self) -> Symbol {
        loop {
            match self {
                Symbol::Export(export) => {
                    let referent = export
                        .referent
                        .borrow()
                        .clone()
                        .expect("export symbol should have a resolved referent");
                    self = referent;
                }
                other => return other,
            }
        }
    }
}
