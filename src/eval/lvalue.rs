//! L-value evaluation: resolving an expression to an addressable location,
//! used both to read (`LoadLocation`/`LoadDynamic` as r-values) and to write
//! (the target of an `Assign` expression).
//!
//! `super` is handled here rather than as an ordinary value: `super.member`
//! searches starting at `this`'s prototype's prototype (skipping the
//! current class's own prototype to reach the base class's), but any
//! function found there is still bound to the original `this`, not to the
//! super lookup's starting object.

use crate::ast::{Expr, LocationSymbol, UnaryOp};
use crate::diagnostics::{codes, DiagnosticSink};
use crate::exceptions::RuntimeException;
use crate::object::Object;
use crate::pointer::Pointer;
use crate::symbols::Symbol;
use crate::unwind::EvalResult;

use super::{Evaluator, Frame};

pub(crate) enum Location {
    Local(Pointer),
    Property { object: Object, key: String },
    ArrayIndex { array: Object, index: i64 },
    /// `*p`: the cell `p` itself addresses, not a cell holding `p`.
    Deref(Pointer),
}

impl<'h> Evaluator<'h> {
    /// Verifies `this` is bound, throwing `NullObject` otherwise.
    pub(crate) fn require_this(&self, frame: &Frame) -> EvalResult<Object> {
        frame
            .this
            .clone()
            .ok_or_else(|| RuntimeException::NullObject.throw(self))
    }

    /// Throws `NullObject` if `receiver` is null, otherwise returns it back.
    fn require_non_null(&self, receiver: Object) -> EvalResult<Object> {
        if receiver.is_null() {
            Err(RuntimeException::NullObject.throw(self))
        } else {
            Ok(receiver)
        }
    }

    /// Evaluates an object sub-expression used as an l-value/r-value base,
    /// returning `(search_base, bound_this)`. For everything but `super`
    /// these are the same object.
    pub(crate) fn resolve_receiver(&self, expr: &Expr, frame: &mut Frame) -> EvalResult<(Object, Object)> {
        match expr {
            Expr::Super => {
                let this = self.require_this(frame)?;
                let search_base = this
                    .prototype()
                    .and_then(|p| p.prototype())
                    .unwrap_or_else(|| self.alloc().new_null());
                Ok((search_base, this))
            }
            Expr::This => {
                let this = self.require_this(frame)?;
                Ok((this.clone(), this))
            }
            other => {
                let v = self.require_non_null(self.eval_expression(other, frame)?)?;
                Ok((v.clone(), v))
            }
        }
    }

    pub(crate) fn eval_location(&self, expr: &Expr, frame: &mut Frame) -> EvalResult<Location> {
        match expr {
            Expr::LoadLocation { object, symbol } => match (object, symbol) {
                (None, LocationSymbol::Local(name)) => {
                    let ptr = frame
                        .scope
                        .lookup(name)
                        .expect("local variable reference without a declaration");
                    Ok(Location::Local(ptr))
                }
                (None, LocationSymbol::Member(Symbol::ClassMember { class, name })) => {
                    let is_static = class
                        .is_static_member(name)
                        .expect("bound class member reference must exist on its class");
                    let object = if is_static {
                        self.ensure_class_init(class)?
                    } else {
                        self.require_this(frame)?
                    };
                    Ok(Location::Property {
                        object,
                        key: name.clone(),
                    })
                }
                (None, LocationSymbol::Member(Symbol::ModuleMember { module, name })) => {
                    let object = self.ensure_module_init(module)?;
                    Ok(Location::Property {
                        object,
                        key: name.clone(),
                    })
                }
                (None, LocationSymbol::Member(Symbol::Export(_))) => {
                    let resolved = symbol_as_member(symbol);
                    self.eval_resolved_member(resolved, frame)
                }
                (Some(obj_expr), LocationSymbol::Member(sym)) => {
                    let name = member_name(sym);
                    let (search_base, _bound_this) = self.resolve_receiver(obj_expr, frame)?;
                    Ok(Location::Property {
                        object: search_base,
                        key: name,
                    })
                }
                (Some(_), LocationSymbol::Local(_)) => {
                    unreachable!("a local variable reference never carries an explicit object")
                }
            },

            Expr::LoadDynamic { object, name } => {
                let obj = self.require_non_null(self.eval_expression(object, frame)?)?;
                let key_value = self.eval_expression(name, frame)?;
                if obj.array_len().is_some() {
                    let index = key_value.as_number().unwrap_or(0.0) as i64;
                    Ok(Location::ArrayIndex { array: obj, index })
                } else {
                    Ok(Location::Property {
                        object: obj,
                        key: self.to_property_key(&key_value),
                    })
                }
            }

            Expr::Unary {
                op: UnaryOp::Deref,
                operand,
            } => {
                let v = self.eval_expression(operand, frame)?;
                let ptr = v
                    .pointer_value()
                    .ok_or_else(|| RuntimeException::NullObject.throw(self))?;
                Ok(Location::Deref(ptr))
            }

            other => unreachable!("expression is not an l-value: {other:?}"),
        }
    }

    /// Returns the actual backing `Pointer` for a location, creating one on
    /// demand for a property or array slot that has never been addressed
    /// before. Used by `&x` to produce a genuine pointer value rather than
    /// a copy.
    pub(crate) fn location_addr(&self, location: &Location) -> Pointer {
        match location {
            Location::Local(ptr) | Location::Deref(ptr) => ptr.clone(),
            Location::Property { object, key } => {
                let current = self.location_get(location);
                object
                    .properties_mut()
                    .init_addr(key, || Pointer::new(current, false))
            }
            Location::ArrayIndex { array, index } => {
                let alloc = self.alloc();
                let idx = (*index).max(0) as usize;
                array
                    .array_ensure_addr(idx, || alloc.new_null())
                    .expect("ArrayIndex location always targets an array payload")
            }
        }
    }

    fn eval_resolved_member(&self, symbol: Symbol, frame: &mut Frame) -> EvalResult<Location> {
        match symbol {
            Symbol::ClassMember { class, name } => {
                let is_static = class
                    .is_static_member(&name)
                    .expect("resolved class member must exist on its class");
                let object = if is_static {
                    self.ensure_class_init(&class)?
                } else {
                    self.require_this(frame)?
                };
                Ok(Location::Property { object, key: name })
            }
            Symbol::ModuleMember { module, name } => {
                let object = self.ensure_module_init(&module)?;
                Ok(Location::Property { object, key: name })
            }
            Symbol::Export(_) => unreachable!("Symbol::resolve always chases past exports"),
        }
    }

    pub(crate) fn to_property_key(&self, value: &Object) -> String {
        if let Some(s) = value.as_string() {
            s.to_string()
        } else if let Some(n) = value.as_number() {
            format!("{n}")
        } else if let Some(b) = value.as_bool() {
            b.to_string()
        } else {
            String::new()
        }
    }

    pub(crate) fn location_get(&self, location: &Location) -> Object {
        match location {
            Location::Local(ptr) => ptr.get(),
            Location::Property { object, key } => object
                .lookup_in_chain(key)
                .map(|p| p.get())
                .unwrap_or_else(|| self.alloc().new_null()),
            Location::ArrayIndex { array, index } => {
                if *index < 0 {
                    self.alloc().new_null()
                } else {
                    array
                        .array_get(*index as usize)
                        .map(|p| p.get())
                        .unwrap_or_else(|| self.alloc().new_null())
                }
            }
            Location::Deref(ptr) => ptr.get(),
        }
    }

    pub(crate) fn location_set(&self, location: &Location, value: Object, at: Option<crate::symbols::SourcePos>) {
        match location {
            Location::Local(ptr) => {
                if ptr.set(value.clone()).is_err() {
                    self.diagnostics.errorf(
                        codes::ILLEGAL_READONLY_LVALUE,
                        at,
                        "cannot assign to a readonly variable",
                    );
                }
            }
            Location::Property { object, key } => {
                let existing = object.properties().get_addr(key);
                let old = existing.as_ref().map(|ptr| ptr.get());
                match existing {
                    Some(ptr) => {
                        if ptr.set(value.clone()).is_err() {
                            self.diagnostics.errorf(
                                codes::ILLEGAL_READONLY_LVALUE,
                                at,
                                format!("cannot assign to readonly property '{key}'"),
                            );
                        }
                    }
                    None => {
                        object
                            .properties_mut()
                            .init_addr(key, || Pointer::new(value.clone(), false));
                    }
                }
                self.hooks.on_variable_assign(object, key, old.as_ref(), &value);
            }
            Location::ArrayIndex { array, index } => {
                if *index < 0 {
                    self.diagnostics.errorf(
                        codes::ILLEGAL_READONLY_LVALUE,
                        at,
                        "array index may not be negative",
                    );
                    return;
                }
                let alloc = self.alloc();
                array.array_set_grow(*index as usize, value, || alloc.new_null());
            }
            Location::Deref(ptr) => {
                if ptr.set(value).is_err() {
                    self.diagnostics.errorf(
                        codes::ILLEGAL_READONLY_LVALUE,
                        at,
                        "cannot assign through a readonly pointer",
                    );
                }
            }
        }
    }
}

pub(crate) fn member_name(symbol: &Symbol) -> String {
    match symbol {
        Symbol::ClassMember { name, .. } => name.clone(),
        Symbol::ModuleMember { name, .. } => name.clone(),
        Symbol::Export(export) => export.name.clone(),
    }
}

fn symbol_as_member(symbol: &LocationSymbol) -> Symbol {
    match symbol {
        LocationSymbol::Member(s) => s.clone().resolve(),
        LocationSymbol::Local(_) => unreachable!("not a member symbol"),
    }
}
