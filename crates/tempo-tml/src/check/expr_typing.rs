//! Expression typing — the operator algebra.
//!
//! `check_expression` types every node of an expression tree in post order:
//! the children are checked first, and the node itself is only considered
//! once all children passed. The dispatch below is deliberately data-like —
//! one arm per kind, each arm a cascade of accepted operand shapes in
//! priority order, first match wins. An arm that falls through every shape
//! leaves the type unknown, which is reported as a plain type error.
//!
//! The clock-bearing comparison rules give the boolean-ish kinds their
//! meaning: `clock <= bound` is an invariant, `clock == int` a guard,
//! `clock != int` a constraint, `rate(cost) == e` an invariant-with-rate.
//! Kinds without an arm here (identifiers, literals, field accesses, sync
//! labels, lists) were already typed during construction and pass through
//! unchanged.

use crate::ast::{Expr, ExprKind};
use crate::check::compat::{
    are_assignment_compatible, are_eq_compatible, are_inline_if_compatible, is_modifiable_lvalue,
    is_same_scalar_type,
};
use crate::check::predicates::*;
use crate::check::TypeChecker;
use crate::foundation::{Type, TypeKind};

fn prim(kind: TypeKind) -> Type {
    Type::primitive(kind)
}

impl TypeChecker {
    /// Type check `expr` and attach a type to every subexpression. Returns
    /// true if no type error was found. Does not evaluate ranges, so no
    /// out-of-range diagnostics originate here.
    pub fn check_expression(&mut self, expr: &mut Expr) -> bool {
        let mut ok = true;
        for sub in &mut expr.subs {
            ok &= self.check_expression(sub);
        }
        // Skip the node itself when a child already failed.
        if !ok {
            return false;
        }

        let mut ty = Type::unknown();
        match expr.kind {
            ExprKind::Fraction => {
                if is_integral(expr.get(0)) && is_integral(expr.get(1)) {
                    ty = prim(TypeKind::Fraction);
                }
            }

            ExprKind::Plus => {
                let (a, b) = (expr.get(0), expr.get(1));
                if is_integral(a) && is_integral(b) {
                    ty = prim(TypeKind::Int);
                } else if (is_integer(a) && is_clock(b)) || (is_clock(a) && is_integer(b)) {
                    ty = prim(TypeKind::Clock);
                } else if (is_diff(a) && is_integer(b)) || (is_integer(a) && is_diff(b)) {
                    ty = prim(TypeKind::Diff);
                } else if is_number(a) && is_number(b) {
                    ty = prim(TypeKind::Double);
                }
            }

            ExprKind::Minus => {
                let (a, b) = (expr.get(0), expr.get(1));
                if is_integral(a) && is_integral(b) {
                    ty = prim(TypeKind::Int);
                } else if is_clock(a) && is_integer(b) {
                    // Only clock - int; the mirrored form would defeat the
                    // clock-guard translation.
                    ty = prim(TypeKind::Clock);
                } else if (is_diff(a) && is_integer(b))
                    || (is_integer(a) && is_diff(b))
                    || (is_clock(a) && is_clock(b))
                {
                    ty = prim(TypeKind::Diff);
                } else if is_number(a) && is_number(b) {
                    ty = prim(TypeKind::Double);
                }
            }

            ExprKind::And => {
                let (a, b) = (expr.get(0), expr.get(1));
                if is_integral(a) && is_integral(b) {
                    ty = prim(TypeKind::Bool);
                } else if is_invariant(a) && is_invariant(b) {
                    ty = prim(TypeKind::Invariant);
                } else if is_invariant_wr(a) && is_invariant_wr(b) {
                    ty = prim(TypeKind::InvariantWr);
                } else if is_guard(a) && is_guard(b) {
                    ty = prim(TypeKind::Guard);
                } else if is_constraint(a) && is_constraint(b) {
                    ty = prim(TypeKind::Constraint);
                } else if is_formula(a) && is_formula(b) {
                    ty = prim(TypeKind::Formula);
                }
            }

            ExprKind::Or => {
                let (a, b) = (expr.get(0), expr.get(1));
                if is_integral(a) && is_integral(b) {
                    ty = prim(TypeKind::Bool);
                } else if (is_integral(a) && is_invariant(b)) || (is_invariant(a) && is_integral(b))
                {
                    ty = prim(TypeKind::Invariant);
                } else if (is_integral(a) && is_invariant_wr(b))
                    || (is_invariant_wr(a) && is_integral(b))
                {
                    ty = prim(TypeKind::InvariantWr);
                } else if (is_integral(a) && is_guard(b)) || (is_guard(a) && is_integral(b)) {
                    ty = prim(TypeKind::Guard);
                } else if is_constraint(a) && is_constraint(b) {
                    ty = prim(TypeKind::Constraint);
                }
            }

            ExprKind::Xor => {
                if is_integral(expr.get(0)) && is_integral(expr.get(1)) {
                    ty = prim(TypeKind::Bool);
                }
            }

            ExprKind::Eq => {
                let (a, b) = (expr.get(0), expr.get(1));
                if (is_clock(a) && is_clock(b))
                    || (is_clock(a) && is_integer(b))
                    || (is_integer(a) && is_clock(b))
                    || (is_diff(a) && is_integer(b))
                    || (is_integer(a) && is_diff(b))
                {
                    ty = prim(TypeKind::Guard);
                } else if are_eq_compatible(&a.ty, &b.ty) {
                    ty = prim(TypeKind::Bool);
                } else if (a.ty.kind() == TypeKind::Rate && (is_integral(b) || is_double_value(b)))
                    || ((is_integral(a) || is_double_value(a)) && b.ty.kind() == TypeKind::Rate)
                {
                    ty = prim(TypeKind::InvariantWr);
                } else if is_number(a) && is_number(b) {
                    ty = prim(TypeKind::Bool);
                }
            }

            ExprKind::Neq => {
                let (a, b) = (expr.get(0), expr.get(1));
                if are_eq_compatible(&a.ty, &b.ty) {
                    ty = prim(TypeKind::Bool);
                } else if (is_clock(a) && is_clock(b))
                    || (is_clock(a) && is_integer(b))
                    || (is_integer(a) && is_clock(b))
                    || (is_diff(a) && is_integer(b))
                    || (is_integer(a) && is_diff(b))
                {
                    ty = prim(TypeKind::Constraint);
                } else if is_number(a) && is_number(b) {
                    ty = prim(TypeKind::Bool);
                }
            }

            ExprKind::Lt | ExprKind::Le | ExprKind::Ge | ExprKind::Gt => {
                let (a, b) = (expr.get(0), expr.get(1));
                if is_integral(a) && is_integral(b) {
                    ty = prim(TypeKind::Bool);
                } else if (is_clock(a) && is_clock(b))
                    || (is_clock(a) && is_bound(b))
                    || (is_clock(b) && is_bound(a))
                    || (is_diff(a) && is_bound(b))
                    || (is_diff(b) && is_bound(a))
                {
                    ty = prim(TypeKind::Invariant);
                } else if (is_clock(a) && is_integer(b)) || (is_integer(a) && is_clock(b)) {
                    ty = prim(TypeKind::Guard);
                } else if is_number(a) && is_number(b) {
                    ty = prim(TypeKind::Bool);
                }
            }

            ExprKind::Mult | ExprKind::Div | ExprKind::Min | ExprKind::Max => {
                let (a, b) = (expr.get(0), expr.get(1));
                if is_integral(a) && is_integral(b) {
                    ty = prim(TypeKind::Int);
                } else if is_number(a) && is_number(b) {
                    ty = prim(TypeKind::Double);
                }
            }

            ExprKind::Mod
            | ExprKind::BitAnd
            | ExprKind::BitOr
            | ExprKind::BitXor
            | ExprKind::ShiftLeft
            | ExprKind::ShiftRight => {
                if is_integral(expr.get(0)) && is_integral(expr.get(1)) {
                    ty = prim(TypeKind::Int);
                }
            }

            ExprKind::Not => {
                if is_integral(expr.get(0)) {
                    ty = prim(TypeKind::Bool);
                } else if is_constraint(expr.get(0)) {
                    ty = prim(TypeKind::Constraint);
                }
            }

            ExprKind::UnaryMinus => {
                if is_integral(expr.get(0)) {
                    ty = prim(TypeKind::Int);
                } else if is_number(expr.get(0)) {
                    ty = prim(TypeKind::Double);
                }
            }

            ExprKind::Rate => {
                if is_cost(expr.get(0)) || is_clock(expr.get(0)) {
                    ty = prim(TypeKind::Rate);
                }
            }

            ExprKind::Assign => {
                if !are_assignment_compatible(&expr.get(0).ty, &expr.get(1).ty, false) {
                    self.error(expr.span, "$Incompatible_types");
                    return false;
                } else if !is_modifiable_lvalue(expr.get(0)) {
                    self.error(expr.get(0).span, "$Left_hand_side_value_expected");
                    return false;
                }
                ty = expr.get(0).ty.clone();
            }

            ExprKind::AssPlus => {
                if (!is_integer(expr.get(0)) && !is_cost(expr.get(0)))
                    || !is_integral(expr.get(1))
                {
                    self.error(
                        expr.span,
                        "$Increment_operator_can_only_be_used_for_integers_and_cost_variables",
                    );
                } else if !is_modifiable_lvalue(expr.get(0)) {
                    self.error(expr.get(0).span, "$Left_hand_side_value_expected");
                }
                ty = expr.get(0).ty.clone();
            }

            ExprKind::AssMinus
            | ExprKind::AssDiv
            | ExprKind::AssMod
            | ExprKind::AssMult
            | ExprKind::AssAnd
            | ExprKind::AssOr
            | ExprKind::AssXor
            | ExprKind::AssShiftLeft
            | ExprKind::AssShiftRight => {
                if !is_integral(expr.get(0)) || !is_integral(expr.get(1)) {
                    self.error(
                        expr.span,
                        "$Non-integer_types_must_use_regular_assignment_operator",
                    );
                    return false;
                } else if !is_modifiable_lvalue(expr.get(0)) {
                    self.error(expr.get(0).span, "$Left_hand_side_value_expected");
                    return false;
                }
                ty = expr.get(0).ty.clone();
            }

            ExprKind::PreIncrement
            | ExprKind::PostIncrement
            | ExprKind::PreDecrement
            | ExprKind::PostDecrement => {
                if !is_modifiable_lvalue(expr.get(0)) {
                    self.error(expr.get(0).span, "$Left_hand_side_value_expected");
                    return false;
                } else if !is_integer(expr.get(0)) {
                    self.error(expr.span, "$Integer_expected");
                    return false;
                }
                ty = prim(TypeKind::Int);
            }

            // Three-argument math calls check the extra operand, then share
            // the binary and unary number rules.
            ExprKind::Fma | ExprKind::RandomTri => {
                if !self.check_number_args(expr, 3) {
                    return false;
                }
                ty = prim(TypeKind::Double);
            }

            ExprKind::Fmod
            | ExprKind::Fmax
            | ExprKind::Fmin
            | ExprKind::Fdim
            | ExprKind::Pow
            | ExprKind::Hypot
            | ExprKind::Atan2
            | ExprKind::NextAfter
            | ExprKind::CopySign
            | ExprKind::RandomArcsine
            | ExprKind::RandomBeta
            | ExprKind::RandomGamma
            | ExprKind::RandomNormal
            | ExprKind::RandomWeibull => {
                if !self.check_number_args(expr, 2) {
                    return false;
                }
                ty = prim(TypeKind::Double);
            }

            ExprKind::Fabs
            | ExprKind::Exp
            | ExprKind::Exp2
            | ExprKind::Expm1
            | ExprKind::Ln
            | ExprKind::Log
            | ExprKind::Log10
            | ExprKind::Log2
            | ExprKind::Log1p
            | ExprKind::Sqrt
            | ExprKind::Cbrt
            | ExprKind::Sin
            | ExprKind::Cos
            | ExprKind::Tan
            | ExprKind::Asin
            | ExprKind::Acos
            | ExprKind::Atan
            | ExprKind::Sinh
            | ExprKind::Cosh
            | ExprKind::Tanh
            | ExprKind::Asinh
            | ExprKind::Acosh
            | ExprKind::Atanh
            | ExprKind::Erf
            | ExprKind::Erfc
            | ExprKind::Tgamma
            | ExprKind::Lgamma
            | ExprKind::Ceil
            | ExprKind::Floor
            | ExprKind::Trunc
            | ExprKind::Round
            | ExprKind::Logb
            | ExprKind::Random
            | ExprKind::RandomPoisson => {
                if !self.check_number_args(expr, 1) {
                    return false;
                }
                ty = prim(TypeKind::Double);
            }

            ExprKind::Ldexp => {
                if !is_integral(expr.get(1)) {
                    self.error(expr.get(1).span, "$Integer_expected");
                    return false;
                }
                if !is_number(expr.get(0)) {
                    self.error(expr.get(0).span, "$Number_expected");
                    return false;
                }
                ty = prim(TypeKind::Double);
            }

            ExprKind::Abs | ExprKind::FpClassify => {
                if !is_integral(expr.get(0)) {
                    self.error(expr.get(0).span, "$Integer_expected");
                    return false;
                }
                ty = prim(TypeKind::Int);
            }

            ExprKind::Ilogb | ExprKind::Fint => {
                if !is_number(expr.get(0)) {
                    self.error(expr.get(0).span, "$Number_expected");
                    return false;
                }
                ty = prim(TypeKind::Int);
            }

            ExprKind::IsFinite
            | ExprKind::IsInf
            | ExprKind::IsNan
            | ExprKind::IsNormal
            | ExprKind::SignBit
            | ExprKind::IsUnordered => {
                if !is_number(expr.get(0)) {
                    self.error(expr.get(0).span, "$Number_expected");
                    return false;
                }
                ty = prim(TypeKind::Bool);
            }

            ExprKind::InlineIf => {
                if !is_integral(expr.get(0)) {
                    self.error(expr.span, "$First_argument_of_inline_if_must_be_an_integer");
                    return false;
                }
                if !are_inline_if_compatible(&expr.get(1).ty, &expr.get(2).ty) {
                    self.error(expr.span, "$Incompatible_arguments_to_inline_if");
                    return false;
                }
                ty = expr.get(1).ty.clone();
            }

            ExprKind::Comma => {
                if !is_assignable(&expr.get(0).ty) && !is_void(expr.get(0)) {
                    self.error(expr.get(0).span, "$Incompatible_type_for_comma_expression");
                    return false;
                }
                if !is_assignable(&expr.get(1).ty) && !is_void(expr.get(1)) {
                    self.error(expr.get(1).span, "$Incompatible_type_for_comma_expression");
                    return false;
                }
                self.check_ignored_value(expr.get(0));
                ty = expr.get(1).ty.clone();
            }

            ExprKind::Call => {
                let fn_ty = expr.get(0).ty.clone();
                if !fn_ty.is_function() {
                    self.error(expr.get(0).span, "$Type_error");
                    return false;
                }
                let fn_ty = fn_ty.strip().clone();
                let parameters = fn_ty.size().saturating_sub(1);
                if expr.size() - 1 != parameters {
                    self.error(expr.span, "Wrong number of arguments");
                    return false;
                }
                let mut result = true;
                for i in 0..parameters {
                    let param = fn_ty.get(i + 1).clone();
                    result &= self.check_parameter_compatible(&param, expr.get(i + 1));
                }
                return result;
            }

            ExprKind::Index => {
                let base = expr.get(0).ty.clone();
                let index = expr.get(1).ty.clone();
                if !base.is_array() {
                    self.error(expr.get(0).span, "$Array_expected");
                    return false;
                }
                ty = base.elem();

                let size = base.array_size();
                if size.is_integer() && index.is_integral() {
                    // Integer-indexed array, integral index.
                } else if size.is_scalar() && index.is_scalar() {
                    if !is_same_scalar_type(&size, &index) {
                        self.error(expr.get(1).span, "$Incompatible_type");
                        return false;
                    }
                } else {
                    self.error(expr.get(1).span, "$Incompatible_type");
                }
            }

            ExprKind::Forall => {
                let bound_ty = expr.get(0).symbol.as_ref().map(|s| s.ty().clone());
                if let Some(bound_ty) = bound_ty {
                    self.check_type(&bound_ty, false, false);
                }
                let body = expr.get(1);
                if is_integral(body) {
                    ty = prim(TypeKind::Bool);
                } else if is_invariant(body) {
                    ty = prim(TypeKind::Invariant);
                } else if is_invariant_wr(body) {
                    ty = prim(TypeKind::InvariantWr);
                } else if is_guard(body) {
                    ty = prim(TypeKind::Guard);
                } else if is_constraint(body) {
                    ty = prim(TypeKind::Constraint);
                } else {
                    self.error(expr.get(1).span, "$Boolean_expected");
                }
                if expr.get(1).changes_any_variable(self.registry()) {
                    self.error(expr.get(1).span, "$Expression_must_be_side-effect_free");
                }
            }

            ExprKind::Exists => {
                let bound_ty = expr.get(0).symbol.as_ref().map(|s| s.ty().clone());
                if let Some(bound_ty) = bound_ty {
                    self.check_type(&bound_ty, false, false);
                }
                let body = expr.get(1);
                if is_integral(body) {
                    ty = prim(TypeKind::Bool);
                } else if is_constraint(body) {
                    ty = prim(TypeKind::Constraint);
                } else {
                    self.error(expr.get(1).span, "$Boolean_expected");
                }
                if expr.get(1).changes_any_variable(self.registry()) {
                    self.error(expr.get(1).span, "$Expression_must_be_side-effect_free");
                }
            }

            ExprKind::Sum => {
                let bound_ty = expr.get(0).symbol.as_ref().map(|s| s.ty().clone());
                if let Some(bound_ty) = bound_ty {
                    self.check_type(&bound_ty, false, false);
                }
                let body = expr.get(1);
                if is_integral(body) {
                    ty = prim(TypeKind::Int);
                } else if is_number(body) {
                    ty = prim(TypeKind::Double);
                } else {
                    self.error(expr.get(1).span, "$Number_expected");
                }
                if expr.get(1).changes_any_variable(self.registry()) {
                    self.error(expr.get(1).span, "$Expression_must_be_side-effect_free");
                }
            }

            ExprKind::SumDynamic => {
                let body = expr.get(2);
                if is_integral(body) || is_double_value(body) {
                    ty = body.ty.clone();
                } else if is_invariant(body) || is_guard(body) {
                    ty = prim(TypeKind::DoubleInvGuard);
                } else {
                    self.error(
                        expr.span,
                        "A sum can only be made over integer, double, invariant or guard expressions.",
                    );
                    return false;
                }
            }

            ExprKind::ForallDynamic | ExprKind::ExistsDynamic => {
                if is_integral(expr.get(2)) {
                    ty = prim(TypeKind::Bool);
                } else {
                    self.error(expr.get(2).span, "$Boolean_expected");
                    return false;
                }
            }

            ExprKind::Spawn => {
                let name = expr
                    .get(0)
                    .symbol
                    .as_ref()
                    .map(|s| s.name().to_string())
                    .unwrap_or_default();
                let Some(sig) = self.dynamic_template(&name).cloned() else {
                    self.error(expr.span, "Appears as an attempt to spawn a non-dynamic template");
                    return false;
                };
                if sig.parameters.len() != expr.size() - 1 {
                    self.error(expr.span, "Wrong number of arguments");
                    return false;
                }
                for (i, param) in sig.parameters.iter().enumerate() {
                    if !self.check_parameter_compatible(param, expr.get(i + 1)) {
                        return false;
                    }
                }
                if !sig.defined {
                    self.error(expr.span, "Template is only declared - not defined");
                    return false;
                }
                ty = prim(TypeKind::Int);
            }

            ExprKind::NumOf => {
                let name = expr
                    .get(0)
                    .symbol
                    .as_ref()
                    .map(|s| s.name().to_string())
                    .unwrap_or_default();
                if self.dynamic_template(&name).is_some() {
                    ty = prim(TypeKind::Int);
                } else {
                    self.error(expr.span, "Not a dynamic template");
                    return false;
                }
            }

            ExprKind::Exit => {
                if !self.in_dynamic_template() {
                    self.error(
                        expr.span,
                        "Exit can only be used in templates declared as dynamic",
                    );
                    return false;
                }
                ty = prim(TypeKind::Int);
            }

            ExprKind::Af
            | ExprKind::Ag
            | ExprKind::Ef
            | ExprKind::Eg
            | ExprKind::EfControl
            | ExprKind::Control
            | ExprKind::ControlTopt
            | ExprKind::ControlToptDef1
            | ExprKind::ControlToptDef2
            | ExprKind::Pmax => {
                if is_formula(expr.get(0)) {
                    ty = prim(TypeKind::Formula);
                }
            }

            ExprKind::PoControl => {
                if is_list_of_formulas(expr.get(0)) && is_formula(expr.get(1)) {
                    ty = prim(TypeKind::Formula);
                }
            }

            ExprKind::Restrict => {
                if !is_id_list(expr.get(0), TypeKind::Process) {
                    self.error(expr.get(0).span, "$Composition_of_processes_expected");
                    ok = false;
                }
                if !is_id_list(expr.get(1), TypeKind::Channel) {
                    self.error(expr.get(1).span, "$List_of_channels_expected");
                    ok = false;
                }
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::SimulationLe | ExprKind::SimulationGe => {
                let le = expr.kind == ExprKind::SimulationLe;
                let (abstracted, concrete) = if le {
                    (expr.get(0), expr.get(1))
                } else {
                    (expr.get(1), expr.get(0))
                };
                if abstracted.kind != ExprKind::Restrict {
                    self.error(abstracted.span, "$Composition_of_processes_expected");
                    ok = false;
                }
                if !is_id_list(concrete, TypeKind::Process) {
                    self.error(concrete.span, "$Composition_of_processes_expected");
                    ok = false;
                }
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::TioQuotient => {
                for i in 0..2 {
                    if !expr.get(i).ty.is(TypeKind::TioGraph) && !is_process_id(expr.get(i)) {
                        self.error(expr.get(i).span, "$Process_expression_expected");
                        ok = false;
                    }
                }
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::TioGraph);
            }

            ExprKind::Consistency => {
                if !expr.get(0).ty.is(TypeKind::TioGraph) && !is_process_id(expr.get(0)) {
                    self.error(expr.get(0).span, "$Process_expression_expected");
                    ok = false;
                }
                if !is_formula(expr.get(1)) {
                    self.error(expr.get(1).span, "$Property_must_be_a_valid_formula");
                    ok = false;
                }
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::TioGraph);
            }

            ExprKind::Specification | ExprKind::Implementation => {
                if !expr.get(0).ty.is(TypeKind::TioGraph) && !is_process_id(expr.get(0)) {
                    self.error(expr.get(0).span, "$Process_expression_expected");
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::TioComposition | ExprKind::TioConjunction | ExprKind::SyntaxComposition => {
                for i in 0..expr.size() {
                    if !expr.get(i).ty.is(TypeKind::TioGraph)
                        && expr.get(i).kind != ExprKind::Identifier
                    {
                        self.error(expr.get(i).span, "$Process_expression_expected");
                        ok = false;
                    }
                }
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::TioGraph);
            }

            ExprKind::RefinementLe | ExprKind::RefinementGe => {
                for i in 0..2 {
                    if !expr.get(i).ty.is(TypeKind::TioGraph)
                        && expr.get(i).kind != ExprKind::Identifier
                    {
                        self.error(expr.get(0).span, "$Process_expression_expected");
                        ok = false;
                    }
                }
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::Leadsto
            | ExprKind::Scenario2
            | ExprKind::AUntil
            | ExprKind::AWeakUntil
            | ExprKind::ABuchi => {
                if is_formula(expr.get(0)) && is_formula(expr.get(1)) {
                    ty = prim(TypeKind::Formula);
                }
            }

            ExprKind::Scenario => {
                ty = prim(TypeKind::Formula);
            }

            ExprKind::Simulate | ExprKind::SimulateReach => {
                let mut ok = self.check_nr_of_runs(expr.get(0));
                if ok && expr.get(0).int_value().unwrap_or(0) <= 0 {
                    self.error(expr.get(0).span, "$Invalid_run_count");
                    ok = false;
                }
                ok &= self.check_bound_type_or_bounded_expr(expr.get(1));
                ok &= self.check_bound(expr.get(2));
                if !ok {
                    return false;
                }
                let mut monitored_end = expr.size();
                if expr.kind == ExprKind::SimulateReach {
                    monitored_end -= 2;
                    let mut ok = self.check_predicate(expr.get(monitored_end));
                    ok &= self.check_nr_of_runs(expr.get(monitored_end + 1));
                    if !ok {
                        return false;
                    }
                }
                for i in 3..monitored_end {
                    if !self.check_monitored_expr(expr.get(i)) {
                        return false;
                    }
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::SupVar | ExprKind::InfVar => {
                if !is_integral(expr.get(0)) && !is_constraint(expr.get(0)) {
                    self.error(expr.get(0).span, "$Boolean_expected");
                    return false;
                }
                if expr.get(1).kind == ExprKind::List {
                    for i in 0..expr.get(1).size() {
                        let item = expr.get(1).get(i);
                        if is_integral(item) {
                            if item.changes_any_variable(self.registry()) {
                                self.error(item.span, "$Expression_must_be_side-effect_free");
                                return false;
                            }
                        } else if !is_clock(item) {
                            self.error(item.span, "$Type_error");
                            return false;
                        }
                    }
                    ty = prim(TypeKind::Formula);
                }
            }

            ExprKind::MitlFormula
            | ExprKind::MitlConj
            | ExprKind::MitlDisj
            | ExprKind::MitlNext
            | ExprKind::MitlUntil
            | ExprKind::MitlRelease
            | ExprKind::MitlAtom
            | ExprKind::MitlForall
            | ExprKind::MitlExists => {
                ty = prim(TypeKind::Formula);
            }

            ExprKind::SmcControl => {
                let mut ok = self.check_bound_type_or_bounded_expr(expr.get(0));
                ok &= self.check_bound(expr.get(1));
                if !ok {
                    return false;
                }
                if is_formula(expr.get(2)) {
                    ty = prim(TypeKind::Formula);
                }
            }

            ExprKind::ProbaMinBox | ExprKind::ProbaMinDiamond => {
                if expr.size() != 5 {
                    self.error(expr.span, "Bug: wrong number of arguments");
                    return false;
                }
                let mut ok = self.check_nr_of_runs(expr.get(0));
                if ok && expr.get(0).int_value().unwrap_or(0) > 0 {
                    self.error(expr.get(0).span, "Explicit number of runs is not supported here");
                    ok = false;
                }
                ok &= self.check_bound_type_or_bounded_expr(expr.get(1));
                ok &= self.check_bound(expr.get(2));
                ok &= self.check_predicate(expr.get(3));
                ok &= self.check_prob_bound(expr.get(4));
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::ProbaBox | ExprKind::ProbaDiamond => {
                if expr.size() != 5 {
                    self.error(expr.span, "Bug: wrong number of arguments");
                    return false;
                }
                let mut ok = self.check_nr_of_runs(expr.get(0));
                ok &= self.check_bound_type_or_bounded_expr(expr.get(1));
                ok &= self.check_bound(expr.get(2));
                ok &= self.check_predicate(expr.get(3));
                ok &= self.check_until_cond(expr.kind, expr.get(4));
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::ProbaCmp => {
                if expr.size() != 8 {
                    self.error(expr.span, "Bug: wrong number of arguments");
                    return false;
                }
                let mut ok = true;
                for half in [0, 4] {
                    ok &= self.check_bound_type_or_bounded_expr(expr.get(half));
                    ok &= self.check_bound(expr.get(half + 1));
                    ok &= self.check_path_quant(expr.get(half + 2));
                    ok &= self.check_predicate(expr.get(half + 3));
                }
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            ExprKind::ProbaExp => {
                if expr.size() != 5 {
                    self.error(expr.span, "Bug: wrong number of arguments");
                    return false;
                }
                let mut ok = self.check_nr_of_runs(expr.get(0));
                ok &= self.check_bound_type_or_bounded_expr(expr.get(1));
                ok &= self.check_bound(expr.get(2));
                ok &= self.check_aggregation_op(expr.get(3));
                ok &= self.check_monitored_expr(expr.get(4));
                if !ok {
                    return false;
                }
                ty = prim(TypeKind::Formula);
            }

            // Everything else — identifiers, literals, field accesses,
            // sync labels, lists — was typed during construction.
            _ => return true,
        }

        if ty.unknown_kind() {
            self.error(expr.span, "$Type_error");
            false
        } else {
            expr.ty = ty;
            true
        }
    }

    /// The first `count` arguments must all be numbers.
    fn check_number_args(&mut self, expr: &Expr, count: usize) -> bool {
        for i in (0..count).rev() {
            if !is_number(expr.get(i)) {
                self.error(expr.get(i).span, "$Number_expected");
                return false;
            }
        }
        true
    }
}
