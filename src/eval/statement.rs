//! Statement evaluation. Every statement returns `Ok(())` on ordinary
//! completion or `Err(Unwind)` for a return, break, continue, or thrown
//! exception; nothing here inspects an unwind's payload except `try` and a
//! labeled statement, which are the only two constructs that can absorb
//! one.

use std::rc::Rc;

use crate::ast::{Block, CatchClause, Statement};
use crate::pointer::Pointer;
use crate::unwind::{EvalResult, Unwind};

use super::{Evaluator, Frame};

impl<'h> Evaluator<'h> {
    pub(crate) fn eval_block(&self, block: &Block, frame: &mut Frame) -> EvalResult<()> {
        let mut guard = frame.scope.enter_block();
        let mut inner = Frame {
            scope: &mut guard,
            this: frame.this.clone(),
            module: Rc::clone(&frame.module),
        };
        for stmt in &block.statements {
            self.eval_statement(stmt, &mut inner)?;
        }
        Ok(())
    }

    fn eval_catch(&self, catch: &CatchClause, exception: crate::object::Object, frame: &mut Frame) -> EvalResult<()> {
        let mut guard = frame.scope.enter_block();
        if let Some(param) = &catch.param {
            guard.declare(&param.name, Pointer::new(exception, false));
        }
        let mut inner = Frame {
            scope: &mut guard,
            this: frame.this.clone(),
            module: Rc::clone(&frame.module),
        };
        for stmt in &catch.block.statements {
            self.eval_statement(stmt, &mut inner)?;
        }
        Ok(())
    }

    pub(crate) fn eval_statement(&self, statement: &Statement, frame: &mut Frame) -> EvalResult<()> {
        match statement {
            Statement::Block(block) => self.eval_block(block, frame),

            Statement::LocalVariableDeclaration { var, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval_expression(expr, frame)?,
                    None => var
                        .default
                        .as_ref()
                        .map(|lit| self.alloc().new_constant(lit))
                        .unwrap_or_else(|| self.alloc().new_null()),
                };
                frame
                    .scope
                    .declare(&var.name, Pointer::new(value, var.readonly));
                Ok(())
            }

            Statement::TryCatchFinally {
                try_block,
                catches,
                finally_block,
            } => {
                let result = match self.eval_block(try_block, frame) {
                    Err(Unwind::Throw(exception)) => {
                        let handler = catches.iter().find(|clause| match &clause.param {
                            Some(param) => exception.ty().is_assignable_to(&param.ty),
                            None => true,
                        });
                        match handler {
                            Some(clause) => self.eval_catch(clause, exception, frame),
                            None => Err(Unwind::Throw(exception)),
                        }
                    }
                    other => other,
                };

                if let Some(finally_block) = finally_block {
                    // A `finally` that itself unwinds (return/throw/break)
                    // wins over whatever the try/catch produced.
                    self.eval_block(finally_block, frame)?;
                }

                result
            }

            Statement::Break { label } => Err(Unwind::Break(label.clone())),
            Statement::Continue { label } => Err(Unwind::Continue(label.clone())),

            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval_expression(condition, frame)?;
                if cond.as_bool().unwrap_or(false) {
                    self.eval_statement(then_branch, frame)
                } else if let Some(else_branch) = else_branch {
                    self.eval_statement(else_branch, frame)
                } else {
                    Ok(())
                }
            }

            Statement::Labeled { label, statement } => match self.eval_statement(statement, frame) {
                Err(Unwind::Break(Some(l))) if l == *label => Ok(()),
                // A labeled `continue` targeting this statement is treated
                // exactly like a labeled `break`: it terminates the
                // statement rather than resuming a loop iteration. This
                // mirrors a known limitation upstream -- labeled `continue`
                // is not loop-aware -- and is kept intentionally rather
                // than fixed.
                Err(Unwind::Continue(Some(l))) if l == *label => Ok(()),
                other => other,
            },

            Statement::Return { value } => {
                let v = match value {
                    Some(expr) => Some(self.eval_expression(expr, frame)?),
                    None => None,
                };
                Err(Unwind::Return(v))
            }

            Statement::Throw { value } => {
                let v = self.eval_expression(value, frame)?;
                Err(self.raise(v))
            }

            Statement::While { condition, body } => {
                loop {
                    let cond = self.eval_expression(condition, frame)?;
                    if !cond.as_bool().unwrap_or(false) {
                        break;
                    }
                    match self.eval_statement(body, frame) {
                        Ok(()) => {}
                        Err(Unwind::Break(None)) => break,
                        Err(Unwind::Continue(None)) => continue,
                        other => return other,
                    }
                }
                Ok(())
            }

            Statement::Empty => Ok(()),

            Statement::Multi(statements) => {
                for stmt in statements {
                    self.eval_statement(stmt, frame)?;
                }
                Ok(())
            }

            Statement::Expression(expr) => {
                self.eval_expression(expr, frame)?;
                Ok(())
            }
        }
    }
}
