//! Invariant decomposition.
//!
//! A state invariant of kind invariant-with-rate mixes ordinary clock
//! bounds with rate equations `x' == e`. The decomposer flattens the
//! conjunction, extracts the cost rate, notes clock rates (stopwatches) and
//! strict upper bounds, and rebuilds the residual invariant without the
//! cost-rate equation.

use crate::ast::{Expr, ExprKind};
use crate::check::predicates::{is_cost, is_invariant};
use crate::foundation::{Type, TypeKind};

#[derive(Debug, Default)]
pub struct RateDecomposer {
    /// The residual invariant; `None` when every conjunct was a cost rate.
    pub invariant: Option<Expr>,
    pub cost_rate: Option<Expr>,
    pub has_strict_invariant: bool,
    pub has_clock_rates: bool,
    pub count_cost_rates: usize,
}

impl RateDecomposer {
    pub fn new() -> RateDecomposer {
        RateDecomposer::default()
    }

    /// Conjoin `expr` onto the residual invariant with the given result
    /// kind.
    fn keep(&mut self, expr: Expr, kind: TypeKind) {
        self.invariant = Some(match self.invariant.take() {
            None => expr,
            Some(inv) => {
                let span = expr.span;
                Expr::binary(ExprKind::And, inv, expr, span, Type::primitive(kind))
            }
        });
    }

    /// Decompose one invariant conjunct. `in_forall` is set while scanning
    /// the body of a `forall`: rate equations found there are noted but the
    /// whole quantifier is kept in the residual.
    pub fn decompose(&mut self, expr: &Expr, in_forall: bool) {
        if is_invariant(expr) {
            if expr.kind == ExprKind::Lt {
                // Strict upper bounds only.
                self.has_strict_invariant = true;
            }
            if !in_forall {
                self.keep(expr.clone(), TypeKind::Invariant);
            }
        } else if expr.kind == ExprKind::And {
            self.decompose(expr.get(0), in_forall);
            self.decompose(expr.get(1), in_forall);
        } else if expr.kind == ExprKind::Eq {
            let (rated, rhs) = if expr.get(0).ty.kind() == TypeKind::Rate {
                (expr.get(0).get(0), expr.get(1))
            } else {
                (expr.get(1).get(0), expr.get(0))
            };
            if is_cost(rated) {
                self.cost_rate = Some(rhs.clone());
                self.count_cost_rates += 1;
            } else {
                self.has_clock_rates = true;
                if !in_forall {
                    self.keep(expr.clone(), TypeKind::InvariantWr);
                }
            }
        } else {
            // A forall whose body constrains rates: scan the body for clock
            // rates but keep the quantifier itself.
            if expr.kind == ExprKind::Forall {
                self.decompose(expr.get(1), true);
            }
            self.keep(expr.clone(), TypeKind::InvariantWr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Symbol;
    use crate::foundation::Span;

    fn sp() -> Span {
        Span::default()
    }

    fn clock_le(name: &str, bound: i64) -> Expr {
        let x = Symbol::new(name, Type::primitive(TypeKind::Clock));
        Expr::binary(
            ExprKind::Le,
            Expr::identifier(&x, sp()),
            Expr::int_constant(bound, sp()),
            sp(),
            Type::primitive(TypeKind::Invariant),
        )
    }

    fn rate_eq(name: &str, kind: TypeKind, value: i64) -> Expr {
        let c = Symbol::new(name, Type::primitive(kind));
        let rated = Expr::unary(
            ExprKind::Rate,
            Expr::identifier(&c, sp()),
            sp(),
            Type::primitive(TypeKind::Rate),
        );
        Expr::binary(
            ExprKind::Eq,
            rated,
            Expr::int_constant(value, sp()),
            sp(),
            Type::primitive(TypeKind::InvariantWr),
        )
    }

    fn and_wr(a: Expr, b: Expr) -> Expr {
        Expr::binary(
            ExprKind::And,
            a,
            b,
            sp(),
            Type::primitive(TypeKind::InvariantWr),
        )
    }

    #[test]
    fn test_cost_rate_is_extracted() {
        let inv = and_wr(clock_le("x", 3), rate_eq("c", TypeKind::Cost, 2));
        let mut decomposer = RateDecomposer::new();
        decomposer.decompose(&inv, false);

        assert_eq!(decomposer.count_cost_rates, 1);
        assert_eq!(
            decomposer.cost_rate.as_ref().and_then(Expr::int_value),
            Some(2)
        );
        let residual = decomposer.invariant.expect("clock bound survives");
        assert!(residual.same_as(&clock_le("x", 3)));
        assert!(!decomposer.has_clock_rates);
        assert!(!decomposer.has_strict_invariant);
    }

    #[test]
    fn test_two_cost_rates_counted() {
        let inv = and_wr(rate_eq("c", TypeKind::Cost, 2), rate_eq("c", TypeKind::Cost, 3));
        let mut decomposer = RateDecomposer::new();
        decomposer.decompose(&inv, false);
        assert_eq!(decomposer.count_cost_rates, 2);
        assert!(decomposer.invariant.is_none());
    }

    #[test]
    fn test_clock_rate_stays_in_residual() {
        let inv = rate_eq("x", TypeKind::Clock, 0);
        let mut decomposer = RateDecomposer::new();
        decomposer.decompose(&inv, false);
        assert!(decomposer.has_clock_rates);
        assert!(decomposer.cost_rate.is_none());
        assert!(decomposer.invariant.expect("kept").same_as(&inv));
    }

    #[test]
    fn test_strict_bound_flagged() {
        let x = Symbol::new("x", Type::primitive(TypeKind::Clock));
        let strict = Expr::binary(
            ExprKind::Lt,
            Expr::identifier(&x, sp()),
            Expr::int_constant(4, sp()),
            sp(),
            Type::primitive(TypeKind::Invariant),
        );
        let mut decomposer = RateDecomposer::new();
        decomposer.decompose(&strict, false);
        assert!(decomposer.has_strict_invariant);
    }

    #[test]
    fn test_forall_kept_whole_but_scanned() {
        let i = Symbol::new("i", Type::primitive(TypeKind::Int));
        let body = rate_eq("x", TypeKind::Clock, 0);
        let forall = Expr::binary(
            ExprKind::Forall,
            Expr::identifier(&i, sp()),
            body,
            sp(),
            Type::primitive(TypeKind::InvariantWr),
        );
        let mut decomposer = RateDecomposer::new();
        decomposer.decompose(&forall, false);
        assert!(decomposer.has_clock_rates);
        let residual = decomposer.invariant.expect("forall kept");
        assert_eq!(residual.kind, ExprKind::Forall);
    }
}
