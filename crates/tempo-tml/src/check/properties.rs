//! Top-level property validation.
//!
//! A property must be side-effect free and denote a formula (or the
//! consistency of a timed I/O graph). Path quantifiers do not nest — except
//! under game properties and the statistical queries, which carry their own
//! operand-shape checks: run counts, time or cost bounds, predicates,
//! probability bounds, aggregation operators and until-conditions.
//! Partial-observation control additionally restricts the observation
//! constraints on clocks: weak lower bounds, strict upper bounds, no clock
//! differences.

use crate::ast::{Expr, ExprKind};
use crate::check::predicates::{
    has_mitl_in_quantified_sub, is_clock, is_constant_double, is_constant_integer, is_constraint,
    is_diff, is_double_value, is_formula, is_game_property, is_integer, is_integral,
};
use crate::check::TypeChecker;
use crate::foundation::TypeKind;

impl TypeChecker {
    /// Check one top-level property expression.
    pub fn visit_property(&mut self, expr: &mut Expr) {
        if !self.check_expression(expr) {
            return;
        }
        if expr.changes_any_variable(self.registry()) {
            self.error(expr.span, "$Property_must_be_side-effect_free");
        }
        let consistency_graph =
            expr.ty.is(TypeKind::TioGraph) && expr.kind == ExprKind::Consistency;
        if !consistency_graph && !is_formula(expr) {
            self.error(expr.span, "$Property_must_be_a_valid_formula");
        }
        if is_game_property(expr) {
            // Game properties host full formulas below them.
        } else if !matches!(
            expr.kind,
            ExprKind::SupVar
                | ExprKind::InfVar
                | ExprKind::Scenario
                | ExprKind::ProbaMinBox
                | ExprKind::ProbaMinDiamond
                | ExprKind::ProbaBox
                | ExprKind::ProbaDiamond
                | ExprKind::ProbaExp
                | ExprKind::ProbaCmp
                | ExprKind::Simulate
                | ExprKind::SimulateReach
                | ExprKind::MitlFormula
        ) {
            for sub in &expr.subs {
                // No nesting of path quantifiers, constraints excepted.
                if !is_constraint(sub) {
                    self.error(sub.span, "$Nesting_of_path_quantifiers_is_not_allowed");
                }
            }
        }
        if expr.kind == ExprKind::PoControl {
            self.check_observation_constraints(expr);
        }
        if has_mitl_in_quantified_sub(expr) && expr.kind != ExprKind::MitlFormula {
            self.error(expr.span, "MITL inside forall or exists in non-MITL property");
        }
    }

    /// Observations on clock constraints must be weak for lower bounds and
    /// strict for upper bounds; clock differences are not observable.
    pub(crate) fn check_observation_constraints(&mut self, expr: &Expr) {
        for sub in &expr.subs {
            self.check_observation_constraints(sub);
        }

        let invalid = match expr.kind {
            // int < clock and int >= clock: lower bound with the wrong
            // strictness.
            ExprKind::Lt | ExprKind::Ge => {
                is_integral(expr.get(0)) && is_clock(expr.get(1))
            }
            // clock <= int and clock > int: upper bound with the wrong
            // strictness.
            ExprKind::Le | ExprKind::Gt => {
                is_clock(expr.get(0)) && is_integral(expr.get(1))
            }
            ExprKind::Eq | ExprKind::Neq => {
                (is_clock(expr.get(0)) && is_integral(expr.get(1)))
                    || (is_integral(expr.get(0)) && is_clock(expr.get(1)))
            }
            _ => false,
        };

        if invalid {
            self.error(expr.span, "$Clock_lower_bound_must_be_weak_and_upper_bound_strict");
        } else if matches!(
            expr.kind,
            ExprKind::Lt | ExprKind::Le | ExprKind::Gt | ExprKind::Ge | ExprKind::Eq | ExprKind::Neq
        ) {
            let clock_difference = (is_clock(expr.get(0)) && is_clock(expr.get(1)))
                || (is_diff(expr.get(0)) && is_integer(expr.get(1)))
                || (is_integer(expr.get(0)) && is_diff(expr.get(1)));
            if clock_difference {
                self.error(expr.span, "$Clock_differences_are_not_supported");
            }
        }
    }

    /// The number of runs of a statistical query: a compile-time integer
    /// constant.
    pub(crate) fn check_nr_of_runs(&mut self, runs: &Expr) -> bool {
        if !self.is_compile_time_computable(runs) {
            self.error(runs.span, "$Must_be_computable_at_compile_time");
            return false;
        }
        if !is_constant_integer(runs) {
            self.error(runs.span, "$Integer_expected");
            return false;
        }
        true
    }

    /// The bound variable of a statistical query: a constant (the bound
    /// kind selector) or a clock to bound the run by.
    pub(crate) fn check_bound_type_or_bounded_expr(&mut self, expr: &Expr) -> bool {
        if !is_constant_integer(expr) && !is_clock(expr) {
            self.error(expr.span, "$Clock_expected");
            return false;
        }
        true
    }

    /// The run bound itself: a compile-time integral value.
    pub(crate) fn check_bound(&mut self, bound: &Expr) -> bool {
        if !self.is_compile_time_computable(bound) {
            self.error(bound.span, "$Must_be_computable_at_compile_time");
            return false;
        }
        if !is_integral(bound) {
            self.error(bound.span, "$Integer_expected");
            return false;
        }
        true
    }

    /// The reachability predicate of a statistical query: a side-effect
    /// free boolean or constraint.
    pub(crate) fn check_predicate(&mut self, predicate: &Expr) -> bool {
        if !is_integral(predicate) && !is_constraint(predicate) {
            self.error(predicate.span, "$Boolean_expected");
            return false;
        }
        if predicate.changes_any_variable(self.registry()) {
            self.error(predicate.span, "$Property_must_be_side-effect_free");
            return false;
        }
        true
    }

    /// A probability bound: a double constant.
    pub(crate) fn check_prob_bound(&mut self, bound: &Expr) -> bool {
        if !is_constant_double(bound) {
            self.error(bound.span, "Floating point number expected as probability bound");
            return false;
        }
        true
    }

    /// The until-condition of a probability query. A box query demands the
    /// literal `false` there.
    pub(crate) fn check_until_cond(&mut self, kind: ExprKind, until: &Expr) -> bool {
        let mut ok = true;
        if kind == ExprKind::ProbaDiamond && !is_integral(until) && !is_constraint(until) {
            self.error(until.span, "$Boolean_expected");
            ok = false;
        }
        if kind == ExprKind::ProbaBox
            && until.kind == ExprKind::Constant
            && until.ty.is_boolean()
            && until.int_value() != Some(0)
        {
            self.error(until.span, "Must be false");
            ok = false;
        }
        ok
    }

    /// An expression monitored during simulation: numeric or clock-bearing,
    /// side-effect free.
    pub(crate) fn check_monitored_expr(&mut self, expr: &Expr) -> bool {
        if !is_integral(expr)
            && !is_clock(expr)
            && !is_double_value(expr)
            && !expr.ty.is(TypeKind::DoubleInvGuard)
            && !is_constraint(expr)
        {
            self.error(expr.span, "$Integer_or_clock_expected");
            return false;
        }
        if expr.changes_any_variable(self.registry()) {
            self.error(expr.span, "$Property_must_be_side-effect_free");
            return false;
        }
        true
    }

    /// Path quantifier selectors are encoded as integer constants.
    pub(crate) fn check_path_quant(&mut self, expr: &Expr) -> bool {
        if !is_constant_integer(expr) {
            self.error(expr.span, "Bug: bad path quantifier");
            return false;
        }
        true
    }

    /// Aggregation operators are encoded 0 (min) or 1 (max).
    pub(crate) fn check_aggregation_op(&mut self, expr: &Expr) -> bool {
        if !is_constant_integer(expr) {
            self.error(expr.span, "Bug: bad aggregation operator expression");
            return false;
        }
        if expr.int_value().unwrap_or(0) > 1 {
            self.error(expr.span, "Bug: bad aggregation operator value");
            return false;
        }
        true
    }
}
