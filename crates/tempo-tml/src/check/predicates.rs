//! Predicates over an expression's attached type.
//!
//! Thin wrappers used throughout the operator algebra. The semantic families
//! overlap on purpose: a clock is a number, booleans are integral, and the
//! guard/invariant/constraint/formula kinds form a lattice (see
//! [`crate::foundation::types`]).

use crate::ast::{Expr, ExprKind};
use crate::foundation::{Type, TypeKind};

pub fn is_cost(e: &Expr) -> bool {
    e.ty.is(TypeKind::Cost)
}

pub fn is_void(e: &Expr) -> bool {
    e.ty.is_void()
}

pub fn is_double(e: &Expr) -> bool {
    e.ty.is_double()
}

pub fn is_integer(e: &Expr) -> bool {
    e.ty.is_integer()
}

/// Integers and doubles may bound a clock comparison.
pub fn is_bound(e: &Expr) -> bool {
    e.ty.is_integer() || e.ty.is_double()
}

pub fn is_integral(e: &Expr) -> bool {
    e.ty.is_integral()
}

pub fn is_clock(e: &Expr) -> bool {
    e.ty.is_clock()
}

pub fn is_diff(e: &Expr) -> bool {
    e.ty.is_diff()
}

/// Anything carried as a double at runtime: doubles, clocks and clock
/// differences.
pub fn is_double_value(e: &Expr) -> bool {
    is_double(e) || is_clock(e) || is_diff(e)
}

pub fn is_number(e: &Expr) -> bool {
    is_double_value(e) || is_integral(e)
}

pub fn is_constant_integer(e: &Expr) -> bool {
    e.kind == ExprKind::Constant && is_integer(e)
}

pub fn is_constant_double(e: &Expr) -> bool {
    e.kind == ExprKind::Constant && is_double(e)
}

pub fn is_invariant(e: &Expr) -> bool {
    e.ty.is_invariant()
}

/// Invariants that may additionally constrain clock or cost rates.
pub fn is_invariant_wr(e: &Expr) -> bool {
    is_invariant(e) || e.ty.is(TypeKind::InvariantWr)
}

pub fn is_guard(e: &Expr) -> bool {
    e.ty.is_guard()
}

pub fn is_probability(e: &Expr) -> bool {
    e.ty.is_probability()
}

pub fn is_constraint(e: &Expr) -> bool {
    e.ty.is_constraint()
}

pub fn is_formula(e: &Expr) -> bool {
    e.ty.is_formula()
}

/// A list whose members are all formulas.
pub fn is_list_of_formulas(e: &Expr) -> bool {
    e.kind == ExprKind::List && e.subs.iter().all(is_formula)
}

/// An identifier denoting a process.
pub fn is_process_id(e: &Expr) -> bool {
    e.kind == ExprKind::Identifier && e.ty.is(TypeKind::Process)
}

/// A list of identifiers of the given kind (processes or channels).
pub fn is_id_list(e: &Expr, kind: TypeKind) -> bool {
    e.kind == ExprKind::List
        && e.subs
            .iter()
            .all(|sub| sub.kind == ExprKind::Identifier && sub.ty.is(kind))
}

/// True iff some comparison in the tree is a strict lower bound on a clock
/// (`int < clock` or `clock > int`).
pub fn has_strict_lower_bound(e: &Expr) -> bool {
    if e.subs.iter().any(has_strict_lower_bound) {
        return true;
    }
    match e.kind {
        ExprKind::Lt => is_integral(e.get(0)) && is_clock(e.get(1)),
        ExprKind::Gt => is_clock(e.get(0)) && is_integral(e.get(1)),
        _ => false,
    }
}

/// True iff some comparison in the tree is a strict upper bound on a clock
/// (`clock < int` or `int > clock`).
pub fn has_strict_upper_bound(e: &Expr) -> bool {
    if e.subs.iter().any(has_strict_upper_bound) {
        return true;
    }
    match e.kind {
        ExprKind::Lt => is_clock(e.get(0)) && is_integral(e.get(1)),
        ExprKind::Gt => is_integral(e.get(0)) && is_clock(e.get(1)),
        _ => false,
    }
}

/// True if values of this type can be assigned: integers, booleans,
/// doubles, clocks, cost, scalars, and arrays and records of these.
/// Channels and processes are not assignable.
pub fn is_assignable(ty: &Type) -> bool {
    match ty.kind() {
        TypeKind::Int
        | TypeKind::Bool
        | TypeKind::Double
        | TypeKind::Clock
        | TypeKind::Cost
        | TypeKind::Scalar => true,
        TypeKind::Array => is_assignable(ty.get(0)),
        TypeKind::Record => (0..ty.size()).all(|i| is_assignable(ty.get(i))),
        _ => ty.size() > 0 && is_assignable(ty.get(0)),
    }
}

/// Functions may return integral values, scalars, doubles and records of
/// such.
pub fn valid_return_type(ty: &Type) -> bool {
    match ty.kind() {
        TypeKind::Record => (0..ty.size()).all(|i| valid_return_type(ty.get(i))),
        TypeKind::Range | TypeKind::Label => valid_return_type(ty.get(0)),
        TypeKind::Int | TypeKind::Bool | TypeKind::Scalar | TypeKind::Double => true,
        _ => false,
    }
}

/// Game properties escape the usual nesting restrictions.
pub fn is_game_property(e: &Expr) -> bool {
    matches!(
        e.kind,
        ExprKind::Control
            | ExprKind::SmcControl
            | ExprKind::EfControl
            | ExprKind::ControlTopt
            | ExprKind::PoControl
            | ExprKind::ControlToptDef1
            | ExprKind::ControlToptDef2
            | ExprKind::SimulationLe
            | ExprKind::SimulationGe
            | ExprKind::RefinementLe
            | ExprKind::RefinementGe
            | ExprKind::Consistency
            | ExprKind::Implementation
            | ExprKind::Specification
    )
}

/// True if the tree contains an MITL quantifier anywhere.
pub fn has_mitl_in_quantified_sub(e: &Expr) -> bool {
    matches!(e.kind, ExprKind::MitlForall | ExprKind::MitlExists)
        || e.subs.iter().any(has_mitl_in_quantified_sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Symbol;
    use crate::foundation::Span;

    fn sp() -> Span {
        Span::default()
    }

    fn clock_ident(name: &str) -> Expr {
        Expr::identifier(&Symbol::new(name, Type::primitive(TypeKind::Clock)), sp())
    }

    #[test]
    fn test_strict_bound_directions() {
        // x > 3 is a strict lower bound on x
        let lower = Expr::binary(
            ExprKind::Gt,
            clock_ident("x"),
            Expr::int_constant(3, sp()),
            sp(),
            Type::primitive(TypeKind::Guard),
        );
        assert!(has_strict_lower_bound(&lower));
        assert!(!has_strict_upper_bound(&lower));

        // x < 3 is a strict upper bound on x
        let upper = Expr::binary(
            ExprKind::Lt,
            clock_ident("x"),
            Expr::int_constant(3, sp()),
            sp(),
            Type::primitive(TypeKind::Invariant),
        );
        assert!(has_strict_upper_bound(&upper));
        assert!(!has_strict_lower_bound(&upper));
    }

    #[test]
    fn test_strict_bound_found_in_subtree() {
        let inner = Expr::binary(
            ExprKind::Gt,
            clock_ident("x"),
            Expr::int_constant(1, sp()),
            sp(),
            Type::primitive(TypeKind::Guard),
        );
        let tree = Expr::binary(
            ExprKind::And,
            Expr::bool_constant(true, sp()),
            inner,
            sp(),
            Type::primitive(TypeKind::Guard),
        );
        assert!(has_strict_lower_bound(&tree));
    }

    #[test]
    fn test_assignable_types() {
        assert!(is_assignable(&Type::primitive(TypeKind::Int)));
        assert!(is_assignable(&Type::primitive(TypeKind::Clock)));
        assert!(!is_assignable(&Type::primitive(TypeKind::Channel)));
        let rec = Type::record(
            vec![
                ("a".into(), Type::primitive(TypeKind::Int)),
                ("b".into(), Type::primitive(TypeKind::Bool)),
            ],
            sp(),
        );
        assert!(is_assignable(&rec));
    }

    #[test]
    fn test_valid_return_types() {
        assert!(valid_return_type(&Type::primitive(TypeKind::Double)));
        assert!(!valid_return_type(&Type::primitive(TypeKind::Clock)));
        assert!(!valid_return_type(&Type::primitive(TypeKind::Channel)));
    }

    #[test]
    fn test_number_families() {
        let c = clock_ident("x");
        assert!(is_clock(&c));
        assert!(is_double_value(&c));
        assert!(is_number(&c));
        assert!(!is_integral(&c));

        let b = Expr::bool_constant(true, sp());
        assert!(is_integral(&b));
        assert!(is_number(&b));
        assert!(!is_double_value(&b));
    }
}
