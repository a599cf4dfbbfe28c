//! Function-body checking.
//!
//! One recursive match over the closed statement enum. Loop and branch
//! conditions must be integral, iteration runs over bounded integers or
//! scalar sets, block locals get their types and initialisers checked, and
//! returns are matched against the enclosing function's declared return
//! type under the parameter-passing rules.

use crate::ast::{Block, Expr, ExprKind, Statement};
use crate::check::predicates::{is_assignable, is_integral, is_void};
use crate::check::TypeChecker;

impl TypeChecker {
    pub(crate) fn check_block(&mut self, block: &mut Block) {
        // Parameters live in the same frame as the locals.
        for symbol in block.frame.iter() {
            self.check_type(symbol.ty(), false, false);
        }

        for var in &mut block.decls {
            let Some(mut init) = var.init.take() else {
                continue;
            };
            if self.check_expression(&mut init) {
                if init.changes_any_variable(self.registry()) {
                    // Stronger than C: record initialisers may be reordered,
                    // so their evaluation order must not be observable.
                    self.error(init.span, "$Initialiser_must_be_side-effect_free");
                    var.init = Some(init);
                } else {
                    let ty = var.uid.ty().clone();
                    var.init = Some(self.check_initialiser(&ty, init));
                }
            } else {
                var.init = Some(init);
            }
        }

        for stat in &mut block.stats {
            self.check_statement(stat);
        }
    }

    pub(crate) fn check_statement(&mut self, stat: &mut Statement) {
        match stat {
            Statement::Empty | Statement::Break | Statement::Continue => {}

            Statement::Expr(expr) => {
                self.check_assignment_expression(expr);
            }

            Statement::Assert(expr) => {
                if self.check_expression(expr) && expr.changes_any_variable(self.registry()) {
                    self.error(expr.span, "$Assertion_must_be_side-effect_free");
                }
            }

            Statement::For {
                init,
                cond,
                step,
                body,
            } => {
                self.check_assignment_expression(init);
                if self.check_expression(cond) {
                    self.check_condition(cond);
                }
                self.check_assignment_expression(step);
                self.check_statement(body);
            }

            Statement::Iteration { symbol, body, .. } => {
                let ty = symbol.ty().clone();
                self.check_type(&ty, false, false);
                // Iteration is only defined over scalar sets and bounded
                // integers.
                if !ty.is_scalar() && !ty.is_integer() {
                    self.error(ty.span(), "$Scalar_set_or_integer_expected");
                } else if !ty.is_range() {
                    self.error(ty.span(), "$Range_expected");
                }
                self.check_statement(body);
            }

            Statement::While { cond, body } | Statement::DoWhile { body, cond } => {
                if self.check_expression(cond) {
                    self.check_condition(cond);
                }
                self.check_statement(body);
            }

            Statement::Block(block) => self.check_block(block),

            // Switch arms behave as blocks; their selectors were already
            // resolved during construction.
            Statement::Switch { body, .. }
            | Statement::Case { body, .. }
            | Statement::Default { body } => self.check_block(body),

            Statement::If {
                cond,
                then_stat,
                else_stat,
            } => {
                if self.check_expression(cond) {
                    self.check_condition(cond);
                }
                self.check_statement(then_stat);
                if let Some(else_stat) = else_stat {
                    self.check_statement(else_stat);
                }
            }

            Statement::Return(value) => {
                if let Some(value) = value {
                    self.check_expression(value);
                    // Return values follow the parameter-passing rules
                    // against the declared return type.
                    if let Some(ret) = self.return_type().cloned() {
                        self.check_parameter_compatible(&ret, value);
                    }
                }
            }
        }
    }

    /// An expression in statement position, a for-clause, or an edge or
    /// sequence-chart update: it must be assignable or void, and a value
    /// computed for nothing draws a warning.
    pub(crate) fn check_assignment_expression(&mut self, expr: &mut Expr) -> bool {
        if !self.check_expression(expr) {
            return false;
        }
        if !is_assignable(&expr.ty) && !is_void(expr) {
            self.error(expr.span, "$Invalid_assignment_expression");
            return false;
        }
        // The constant 1 is the builder's stand-in for an absent update.
        if expr.kind != ExprKind::Constant || expr.int_value() != Some(1) {
            self.check_ignored_value(expr);
        }
        true
    }

    /// Warn about expressions whose value is ignored and which change
    /// nothing. Unlike the side-effect analysis proper, writing a local
    /// counts as an effect here.
    pub(crate) fn check_ignored_value(&mut self, expr: &Expr) {
        if expr.kind != ExprKind::Exit && !expr.changes_any_variable(self.registry()) {
            self.warning(expr.span, "$Expression_does_not_have_any_effect");
        } else if expr.kind == ExprKind::Comma {
            self.check_ignored_value(expr.get(1));
        }
    }

    /// Conditions of `if`/`while`/`for` must be integral.
    pub(crate) fn check_condition(&mut self, expr: &Expr) -> bool {
        if !is_integral(expr) {
            self.error(expr.span, "$Boolean_expected");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Frame, Symbol, System};
    use crate::check::TypeChecker;
    use crate::foundation::{Span, Type, TypeKind};

    fn sp() -> Span {
        Span::default()
    }

    fn checker() -> TypeChecker {
        TypeChecker::new(&System::new(), false)
    }

    fn run(stat: &mut Statement) -> Vec<String> {
        let mut checker = checker();
        checker.check_statement(stat);
        checker
            .take_diagnostics()
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_while_condition_must_be_integral() {
        let x = Symbol::new("x", Type::primitive(TypeKind::Clock));
        let cond = Expr::binary(
            ExprKind::Lt,
            Expr::identifier(&x, sp()),
            Expr::int_constant(5, sp()),
            sp(),
            Type::unknown(),
        );
        let mut stat = Statement::While {
            cond,
            body: Box::new(Statement::Empty),
        };
        assert_eq!(run(&mut stat), vec!["$Boolean_expected"]);
    }

    #[test]
    fn test_iteration_requires_a_range() {
        let i = Symbol::new("i", Type::primitive(TypeKind::Int));
        let mut stat = Statement::Iteration {
            symbol: i.clone(),
            frame: Frame::new(),
            body: Box::new(Statement::Empty),
        };
        assert_eq!(run(&mut stat), vec!["$Range_expected"]);

        let c = Symbol::new("c", Type::primitive(TypeKind::Clock));
        let mut stat = Statement::Iteration {
            symbol: c,
            frame: Frame::new(),
            body: Box::new(Statement::Empty),
        };
        assert_eq!(run(&mut stat), vec!["$Scalar_set_or_integer_expected"]);
    }

    #[test]
    fn test_assert_must_be_side_effect_free() {
        let v = Symbol::new("v", Type::primitive(TypeKind::Int));
        let assign = Expr::binary(
            ExprKind::Assign,
            Expr::identifier(&v, sp()),
            Expr::int_constant(1, sp()),
            sp(),
            Type::unknown(),
        );
        let mut stat = Statement::Assert(assign);
        assert_eq!(run(&mut stat), vec!["$Assertion_must_be_side-effect_free"]);
    }

    #[test]
    fn test_local_initialiser_checked_without_computability() {
        // Block locals may be initialised from non-constant values.
        let v = Symbol::new("v", Type::primitive(TypeKind::Int));
        let mut frame = Frame::new();
        let local = frame.declare("t", Type::primitive(TypeKind::Int));
        let mut block = Block {
            frame,
            decls: vec![crate::ast::Variable {
                uid: local,
                init: Some(Expr::identifier(&v, sp())),
            }],
            stats: Vec::new(),
        };
        let mut checker = checker();
        checker.check_block(&mut block);
        assert!(checker.take_diagnostics().is_empty());
    }
}
