//! Expression evaluation and the operator table.
//!
//! `&&` and `||` short-circuit correctly here: the right operand is only
//! evaluated when it can change the result. Everything else -- arithmetic,
//! comparison, bitwise ops -- evaluates both sides first.

use crate::ast::{BinaryOp, Expr, LocationSymbol, UnaryOp};
use crate::diagnostics::{codes, DiagnosticSink};
use crate::exceptions::RuntimeException;
use crate::object::Object;
use crate::pointer::Pointer;
use crate::symbols::{ClassMemberKind, FunctionParent, Symbol, Type};
use crate::unwind::EvalResult;

use super::lvalue::member_name;
use super::{Evaluator, Frame};

fn value_equals(a: &Object, b: &Object) -> bool {
    if a.is_null() && b.is_null() {
        return true;
    }
    if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_string(), b.as_string()) {
        return x == y;
    }
    a.identity_eq(b)
}

fn to_i64(n: f64) -> i64 {
    if n.is_nan() {
        0
    } else {
        n as i64
    }
}

impl<'h> Evaluator<'h> {
    fn display_value(&self, value: &Object) -> String {
        if let Some(s) = value.as_string() {
            s.to_string()
        } else if let Some(n) = value.as_number() {
            n.to_string()
        } else if let Some(b) = value.as_bool() {
            b.to_string()
        } else if value.is_null() {
            "null".to_string()
        } else {
            format!("[{}]", value.ty().name())
        }
    }

    fn apply_binary(&self, op: BinaryOp, l: &Object, r: &Object) -> Object {
        let alloc = self.alloc();
        match op {
            BinaryOp::Add => {
                if l.as_string().is_some() || r.as_string().is_some() {
                    alloc.new_string(format!("{}{}", self.display_value(l), self.display_value(r)))
                } else {
                    alloc.new_number(l.as_number().unwrap_or(0.0) + r.as_number().unwrap_or(0.0))
                }
            }
            BinaryOp::Sub => alloc.new_number(l.as_number().unwrap_or(0.0) - r.as_number().unwrap_or(0.0)),
            BinaryOp::Mul => alloc.new_number(l.as_number().unwrap_or(0.0) * r.as_number().unwrap_or(0.0)),
            BinaryOp::Div => alloc.new_number(l.as_number().unwrap_or(0.0) / r.as_number().unwrap_or(0.0)),
            BinaryOp::Mod => alloc.new_number(l.as_number().unwrap_or(0.0) % r.as_number().unwrap_or(0.0)),
            BinaryOp::Pow => alloc.new_number(l.as_number().unwrap_or(0.0).powf(r.as_number().unwrap_or(0.0))),
            BinaryOp::Lt => alloc.new_bool(l.as_number().unwrap_or(0.0) < r.as_number().unwrap_or(0.0)),
            BinaryOp::Le => alloc.new_bool(l.as_number().unwrap_or(0.0) <= r.as_number().unwrap_or(0.0)),
            BinaryOp::Gt => alloc.new_bool(l.as_number().unwrap_or(0.0) > r.as_number().unwrap_or(0.0)),
            BinaryOp::Ge => alloc.new_bool(l.as_number().unwrap_or(0.0) >= r.as_number().unwrap_or(0.0)),
            BinaryOp::EqEq => alloc.new_bool(value_equals(l, r)),
            BinaryOp::NotEq => alloc.new_bool(!value_equals(l, r)),
            BinaryOp::BitAnd => alloc.new_number((to_i64(l.as_number().unwrap_or(0.0)) & to_i64(r.as_number().unwrap_or(0.0))) as f64),
            BinaryOp::BitOr => alloc.new_number((to_i64(l.as_number().unwrap_or(0.0)) | to_i64(r.as_number().unwrap_or(0.0))) as f64),
            BinaryOp::BitXor => alloc.new_number((to_i64(l.as_number().unwrap_or(0.0)) ^ to_i64(r.as_number().unwrap_or(0.0))) as f64),
            BinaryOp::Shl => alloc.new_number(((to_i64(l.as_number().unwrap_or(0.0))) << (to_i64(r.as_number().unwrap_or(0.0)) & 63)) as f64),
            BinaryOp::Shr => alloc.new_number(((to_i64(l.as_number().unwrap_or(0.0))) >> (to_i64(r.as_number().unwrap_or(0.0)) & 63)) as f64),
            BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are handled by the caller"),
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr, frame: &mut Frame) -> EvalResult<Object> {
        if op.is_short_circuiting() {
            let l = self.eval_expression(left, frame)?;
            let lb = l.as_bool().unwrap_or(false);
            let alloc = self.alloc();
            return match op {
                BinaryOp::And => {
                    if !lb {
                        Ok(alloc.new_bool(false))
                    } else {
                        let r = self.eval_expression(right, frame)?;
                        Ok(alloc.new_bool(r.as_bool().unwrap_or(false)))
                    }
                }
                BinaryOp::Or => {
                    if lb {
                        Ok(alloc.new_bool(true))
                    } else {
                        let r = self.eval_expression(right, frame)?;
                        Ok(alloc.new_bool(r.as_bool().unwrap_or(false)))
                    }
                }
                _ => unreachable!(),
            };
        }

        let l = self.eval_expression(left, frame)?;
        let r = self.eval_expression(right, frame)?;
        Ok(self.apply_binary(op, &l, &r))
    }

    fn eval_unary(&self, op: UnaryOp, operand: &Expr, frame: &mut Frame) -> EvalResult<Object> {
        match op {
            UnaryOp::AddressOf => {
                let location = self.eval_location(operand, frame)?;
                let ptr = self.location_addr(&location);
                let target_ty = ptr.get().ty();
                return Ok(self.alloc().new_pointer(target_ty, ptr));
            }
            UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                let location = self.eval_location(operand, frame)?;
                let old = self.location_get(&location);
                let delta = if matches!(op, UnaryOp::PreIncrement | UnaryOp::PostIncrement) {
                    1.0
                } else {
                    -1.0
                };
                let new = self.alloc().new_number(old.as_number().unwrap_or(0.0) + delta);
                // Both the prefix and postfix forms store back to the same
                // l-value exactly once.
                self.location_set(&location, new.clone(), None);
                return Ok(match op {
                    UnaryOp::PreIncrement | UnaryOp::PreDecrement => new,
                    _ => old,
                });
            }
            _ => {}
        }

        let v = self.eval_expression(operand, frame)?;
        let alloc = self.alloc();
        Ok(match op {
            UnaryOp::Plus => alloc.new_number(v.as_number().unwrap_or(0.0)),
            UnaryOp::Minus => alloc.new_number(-v.as_number().unwrap_or(0.0)),
            UnaryOp::Not => alloc.new_bool(!v.as_bool().unwrap_or(false)),
            UnaryOp::BitwiseNot => alloc.new_number(!to_i64(v.as_number().unwrap_or(0.0)) as f64),
            UnaryOp::Deref => v.pointer_value().map(|p| p.get()).unwrap_or_else(|| alloc.new_null()),
            UnaryOp::AddressOf | UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                unreachable!("handled above")
            }
        })
    }

    fn eval_new(&self, ty: &Type, args: &[Expr], frame: &mut Frame) -> EvalResult<Object> {
        let class = match ty {
            Type::Class(c) => c.clone(),
            _ => unreachable!("`new` target must be a class type"),
        };
        self.ensure_class_init(&class)?;

        let evaluated_args = args
            .iter()
            .map(|a| self.eval_expression(a, frame))
            .collect::<EvalResult<Vec<_>>>()?;

        let proto = self.prototypes.get_prototype(&class, self.hooks);
        let instance = self.alloc().new(Type::Class(class.clone()));
        instance.set_prototype(Some(proto));

        match class.constructor() {
            Some(ctor) => {
                self.invoke(&ctor, Some(instance.clone()), evaluated_args, None)?;
            }
            None if !evaluated_args.is_empty() => {
                self.diagnostics.errorf(
                    codes::FUNCTION_ARG_MISMATCH,
                    None,
                    format!(
                        "class '{}' has no constructor but {} argument(s) were supplied",
                        class.name,
                        evaluated_args.len()
                    ),
                );
            }
            None => {}
        }

        Ok(instance)
    }

    fn eval_invoke(&self, function: &Expr, args: &[Expr], frame: &mut Frame) -> EvalResult<Object> {
        let evaluated_args = args
            .iter()
            .map(|a| self.eval_expression(a, frame))
            .collect::<EvalResult<Vec<_>>>()?;

        let (func_obj, call_site_this) = match function {
            Expr::LoadLocation {
                object: Some(obj_expr),
                symbol: LocationSymbol::Member(sym),
            } => {
                let name = member_name(sym);
                let (search_base, bound_this) = self.resolve_receiver(obj_expr, frame)?;
                let func = search_base
                    .lookup_in_chain(&name)
                    .map(|p| p.get())
                    .unwrap_or_else(|| self.alloc().new_null());
                (func, Some(bound_this))
            }
            Expr::LoadLocation {
                object: None,
                symbol: LocationSymbol::Member(Symbol::ClassMember { class, name }),
            } => {
                let is_static = class
                    .is_static_member(name)
                    .expect("bound class member reference must exist on its class");
                if is_static {
                    let statics = self.ensure_class_init(class)?;
                    let func = statics
                        .properties()
                        .get_addr(name)
                        .map(|p| p.get())
                        .unwrap_or_else(|| self.alloc().new_null());
                    (func, None)
                } else {
                    let this = self.require_this(frame)?;
                    let func = this
                        .lookup_in_chain(name)
                        .map(|p| p.get())
                        .unwrap_or_else(|| self.alloc().new_null());
                    (func, Some(this))
                }
            }
            Expr::LoadLocation {
                object: None,
                symbol: LocationSymbol::Member(Symbol::ModuleMember { module, name }),
            } => {
                let globals = self.ensure_module_init(module)?;
                let func = globals
                    .properties()
                    .get_addr(name)
                    .map(|p| p.get())
                    .unwrap_or_else(|| self.alloc().new_null());
                (func, None)
            }
            other => {
                let func = self.eval_expression(other, frame)?;
                (func, None)
            }
        };

        let (symbol, bound_this) = func_obj
            .function_value()
            .ok_or_else(|| RuntimeException::NullObject.throw(self))?;

        let this = if bound_this.is_some() {
            bound_this
        } else if matches!(&symbol.parent, FunctionParent::Class(_)) && !symbol.is_static {
            call_site_this
        } else {
            None
        };

        self.invoke(&symbol, this, evaluated_args, None)
    }

    fn eval_assign(
        &self,
        target: &Expr,
        op: Option<BinaryOp>,
        value: &Expr,
        frame: &mut Frame,
    ) -> EvalResult<Object> {
        let location = self.eval_location(target, frame)?;
        let rhs = self.eval_expression(value, frame)?;
        let new_value = match op {
            Some(op) => {
                let current = self.location_get(&location);
                self.apply_binary(op, &current, &rhs)
            }
            None => rhs,
        };
        self.location_set(&location, new_value.clone(), None);
        Ok(new_value)
    }

    pub(crate) fn eval_expression(&self, expr: &Expr, frame: &mut Frame) -> EvalResult<Object> {
        match expr {
            Expr::Null => Ok(self.alloc().new_null()),
            Expr::Bool(b) => Ok(self.alloc().new_bool(*b)),
            Expr::Number(n) => Ok(self.alloc().new_number(*n)),
            Expr::String(s) => Ok(self.alloc().new_string(s.as_str())),

            Expr::Array {
                element_type,
                size,
                elements,
            } => {
                let evaluated = elements
                    .iter()
                    .map(|e| self.eval_expression(e, frame))
                    .collect::<EvalResult<Vec<_>>>()?;

                let target_len = match size {
                    Some(size_expr) => {
                        let n = self.eval_expression(size_expr, frame)?;
                        let n = n.as_number().unwrap_or(0.0);
                        if n < 0.0 {
                            return Err(RuntimeException::NegativeArrayLength.throw(self));
                        }
                        let n = n as usize;
                        if evaluated.len() > n {
                            return Err(RuntimeException::IncorrectArrayElementCount {
                                expected: n,
                                actual: evaluated.len(),
                            }
                            .throw(self));
                        }
                        n
                    }
                    None => evaluated.len(),
                };

                let alloc = self.alloc();
                let array = alloc.new_array(element_type.clone(), Vec::new());
                for (i, v) in evaluated.into_iter().enumerate() {
                    array.array_push(Pointer::new(v.clone(), false));
                    self.hooks.on_variable_assign(&array, &i.to_string(), None, &v);
                }
                while array.array_len().unwrap_or(0) < target_len {
                    let idx = array.array_len().unwrap_or(0);
                    let filler = alloc.new_null();
                    array.array_push(Pointer::new(filler.clone(), false));
                    self.hooks.on_variable_assign(&array, &idx.to_string(), None, &filler);
                }
                Ok(array)
            }

            Expr::Object { ty, properties } => {
                let proto = if let Type::Class(class) = ty {
                    self.ensure_class_init(class)?;
                    Some(self.prototypes.get_prototype(class, self.hooks))
                } else {
                    None
                };
                let bag = self.alloc().new(ty.clone());
                if let Some(proto) = proto {
                    bag.set_prototype(Some(proto));
                }
                for (key, value_expr) in properties {
                    let v = self.eval_expression(value_expr, frame)?;
                    let existing = bag.properties().get_addr(key);
                    match existing {
                        Some(ptr) => {
                            let _ = ptr.set(v);
                        }
                        None => {
                            bag.properties_mut().init_addr(key, || Pointer::new(v, false));
                        }
                    }
                }

                // Readonly class fields are writable during construction but
                // frozen the moment the literal finishes.
                if let Type::Class(class) = ty {
                    for (key, _) in properties {
                        if let Some(ClassMemberKind::Variable(v)) = class.member(key) {
                            if v.readonly {
                                if let Some(ptr) = bag.properties().get_addr(key) {
                                    ptr.freeze();
                                }
                            }
                        }
                    }
                }

                Ok(bag)
            }

            Expr::LoadLocation { .. } | Expr::LoadDynamic { .. } => {
                let location = self.eval_location(expr, frame)?;
                Ok(self.location_get(&location))
            }

            Expr::New { ty, args } => self.eval_new(ty, args, frame),
            Expr::Invoke { function, args } => self.eval_invoke(function, args, frame),

            Expr::Lambda => Err(RuntimeException::Unimplemented { what: "lambda expression" }.throw(self)),
            Expr::IsInst => Err(RuntimeException::Unimplemented { what: "isinst expression" }.throw(self)),
            Expr::TypeOf => Err(RuntimeException::Unimplemented { what: "typeof expression" }.throw(self)),

            Expr::Unary { op, operand } => self.eval_unary(*op, operand, frame),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, frame),
            Expr::Assign { target, op, value } => self.eval_assign(target, *op, value, frame),

            Expr::Cast { ty, operand } => {
                let v = self.eval_expression(operand, frame)?;
                if v.ty().is_assignable_to(ty) {
                    Ok(v)
                } else {
                    Err(RuntimeException::InvalidCast {
                        from: v.ty().name(),
                        to: ty.name(),
                    }
                    .throw(self))
                }
            }

            Expr::Conditional {
                condition,
                consequent,
                alternate,
            } => {
                let c = self.eval_expression(condition, frame)?;
                if c.as_bool().unwrap_or(false) {
                    self.eval_expression(consequent, frame)
                } else {
                    self.eval_expression(alternate, frame)
                }
            }

            Expr::Sequence(exprs) => {
                let mut last = self.alloc().new_null();
                for e in exprs {
                    last = self.eval_expression(e, frame)?;
                }
                Ok(last)
            }

            Expr::This => self.require_this(frame),
            Expr::Super => {
                let this = self.require_this(frame)?;
                Ok(this
                    .prototype()
                    .and_then(|p| p.prototype())
                    .unwrap_or_else(|| self.alloc().new_null()))
            }
        }
    }
}
