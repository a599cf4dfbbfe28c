//! Type compatibility relations and l-value analyses.
//!
//! Three relations on types — structural equivalence, assignment
//! compatibility and equality compatibility — and three analyses on
//! expressions — l-value, modifiable l-value and unique reference — used by
//! assignment checking and parameter passing.
//!
//! Equivalence ignores the `const`, `meta` and `&` wrappers. Integer ranges
//! are compared bound-by-bound with structural expression equality, scalar
//! sets by the name of their label, channels by capability.

use crate::ast::{EffectRegistry, Expr, ExprKind};
use crate::check::computable::{is_compile_time_computable, ComputableValues};
use crate::foundation::{Type, TypeKind};

/// Channel capability ordering: an urgent channel (0) can stand in for
/// nothing else, a broadcast channel (1) only for broadcast parameters, any
/// other channel (2) for everything. An argument is acceptable iff its
/// capability is at least the parameter's.
pub fn channel_capability(ty: &Type) -> u8 {
    debug_assert!(ty.is_channel());
    if ty.is(TypeKind::Urgent) {
        0
    } else if ty.is(TypeKind::Broadcast) {
        1
    } else {
        2
    }
}

/// Name equivalence of scalar-set types.
pub fn is_same_scalar_type(a: &Type, b: &Type) -> bool {
    let strip_kinds = |k: TypeKind| {
        matches!(k, TypeKind::Ref | TypeKind::Const | TypeKind::SystemMeta)
    };
    if strip_kinds(a.kind()) {
        return is_same_scalar_type(a.get(0), b);
    }
    if strip_kinds(b.kind()) {
        return is_same_scalar_type(a, b.get(0));
    }
    match (a.kind(), b.kind()) {
        (TypeKind::Label, TypeKind::Label) => {
            a.label(0) == b.label(0) && is_same_scalar_type(a.get(0), b.get(0))
        }
        (TypeKind::Scalar, TypeKind::Scalar) => true,
        (TypeKind::Range, TypeKind::Range) => {
            let (Some((al, au)), Some((bl, bu))) = (a.bounds(), b.bounds()) else {
                return false;
            };
            is_same_scalar_type(a.get(0), b.get(0)) && al.same_as(bl) && au.same_as(bu)
        }
        _ => false,
    }
}

fn ranges_match(a: &Type, b: &Type) -> bool {
    match (a.bounds(), b.bounds()) {
        (Some((al, au)), Some((bl, bu))) => al.same_as(bl) && au.same_as(bu),
        _ => false,
    }
}

/// Structural equivalence, ignoring `const`, `meta` and `&`.
pub fn are_equivalent(a: &Type, b: &Type) -> bool {
    if a.is_integer() && b.is_integer() {
        !a.is_range() || !b.is_range() || ranges_match(a, b)
    } else if a.is_boolean() && b.is_boolean() {
        true
    } else if a.is_clock() && b.is_clock() {
        true
    } else if a.is_channel() && b.is_channel() {
        channel_capability(a) == channel_capability(b)
    } else if a.is_record() && b.is_record() {
        let size = a.record_size();
        size == b.record_size()
            && (0..size).all(|i| {
                a.record_label(i) == b.record_label(i) && are_equivalent(&a.field(i), &b.field(i))
            })
    } else if a.is_array() && b.is_array() {
        let asize = a.array_size();
        let bsize = b.array_size();
        if asize.is_integer() && bsize.is_integer() {
            ranges_match(&asize, &bsize) && are_equivalent(&a.elem(), &b.elem())
        } else if asize.is_scalar() && bsize.is_scalar() {
            is_same_scalar_type(&asize, &bsize) && are_equivalent(&a.elem(), &b.elem())
        } else {
            false
        }
    } else if a.is_scalar() && b.is_scalar() {
        is_same_scalar_type(a, b)
    } else {
        a.is_double() && b.is_double()
    }
}

/// True if an expression of type `rvalue` can be assigned to a place of
/// type `lvalue`. Integer ranges are not checked. In initialiser mode a
/// clock accepts a double; outside it, clocks and doubles accept any
/// numeric value.
pub fn are_assignment_compatible(lvalue: &Type, rvalue: &Type, init: bool) -> bool {
    let numeric_ok = if init {
        lvalue.is_clock() && rvalue.is_double()
    } else {
        (lvalue.is_clock() || lvalue.is_double())
            && (rvalue.is_integral() || rvalue.is_double() || rvalue.is_clock())
    };
    if numeric_ok {
        return true;
    }
    if lvalue.is_integral() && rvalue.is_integral() {
        return true;
    }
    are_equivalent(lvalue, rvalue)
}

/// Compatibility under `==`/`!=` for the plain boolean case. Clock and
/// clock-difference comparisons never reach this relation: the operator
/// algebra turns those into guards before consulting it.
pub fn are_eq_compatible(a: &Type, b: &Type) -> bool {
    if a.is_integral() && b.is_integral() {
        true
    } else if a.is(TypeKind::ProcessVar) && b.is(TypeKind::ProcessVar) {
        true
    } else {
        are_equivalent(a, b)
    }
}

/// The branches of an inline `?:` must both be integral or be equivalent.
pub fn are_inline_if_compatible(t1: &Type, t2: &Type) -> bool {
    (t1.is_integral() && t2.is_integral()) || are_equivalent(t1, t2)
}

/// True iff `expr` denotes an l-value.
pub fn is_lvalue(expr: &Expr) -> bool {
    match expr.kind {
        ExprKind::Identifier => true,
        k if k.is_assignment() => true,
        ExprKind::PreIncrement | ExprKind::PreDecrement => true,
        ExprKind::Dot | ExprKind::Index => is_lvalue(expr.get(0)),
        ExprKind::InlineIf => {
            is_lvalue(expr.get(1))
                && is_lvalue(expr.get(2))
                && are_equivalent(&expr.get(1).ty, &expr.get(2).ty)
        }
        ExprKind::Comma => is_lvalue(expr.get(1)),
        // Functions cannot return references.
        _ => false,
    }
}

/// True iff `expr` denotes a writable storage location.
pub fn is_modifiable_lvalue(expr: &Expr) -> bool {
    match expr.kind {
        ExprKind::Identifier => expr.ty.is_non_constant(),
        ExprKind::Dot => {
            // Processes only occur in properties, which must be side-effect
            // free anyway.
            if expr.get(0).ty.is_process() {
                return false;
            }
            is_modifiable_lvalue(expr.get(0))
        }
        ExprKind::Index => is_modifiable_lvalue(expr.get(0)),
        k if k.is_assignment() => true,
        ExprKind::PreIncrement | ExprKind::PreDecrement => true,
        ExprKind::InlineIf => {
            is_modifiable_lvalue(expr.get(1))
                && is_modifiable_lvalue(expr.get(2))
                && are_equivalent(&expr.get(1).ty, &expr.get(2).ty)
        }
        ExprKind::Comma => is_modifiable_lvalue(expr.get(1)),
        _ => false,
    }
}

/// True iff `expr` denotes one fixed storage location: an l-value whose
/// array indices are all compile-time computable. `a[v]` with a mutable `v`
/// is an l-value but not a unique reference.
pub fn is_unique_reference(
    expr: &Expr,
    values: &ComputableValues,
    registry: &EffectRegistry,
) -> bool {
    match expr.kind {
        ExprKind::Identifier => true,
        ExprKind::Dot => is_unique_reference(expr.get(0), values, registry),
        ExprKind::Index => {
            is_unique_reference(expr.get(0), values, registry)
                && is_compile_time_computable(expr.get(1), values, registry)
        }
        k if k.is_assignment() => is_unique_reference(expr.get(0), values, registry),
        ExprKind::PreIncrement | ExprKind::PreDecrement => {
            is_unique_reference(expr.get(0), values, registry)
        }
        ExprKind::InlineIf => false,
        ExprKind::Comma => is_unique_reference(expr.get(1), values, registry),
        _ => false,
    }
}

/// True iff an argument expression fits a parameter type: non-const
/// reference parameters demand modifiable l-values of equivalent type,
/// channels follow the capability ordering, everything else falls back to
/// assignment compatibility.
pub fn is_parameter_compatible(param: &Type, arg: &Expr) -> bool {
    let reference = param.is(TypeKind::Ref);
    let constant = param.is_constant();
    let lvalue = is_modifiable_lvalue(arg);
    if reference && !constant && !lvalue {
        return false;
    }
    if param.is_channel() && arg.ty.is_channel() {
        channel_capability(&arg.ty) >= channel_capability(param)
    } else if reference && lvalue {
        are_equivalent(&arg.ty, param)
    } else {
        are_assignment_compatible(param, &arg.ty, false)
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

    fn int_range(lo: i64, hi: i64) -> Type {
        Type::range(
            Type::primitive(TypeKind::Int),
            Expr::int_constant(lo, sp()),
            Expr::int_constant(hi, sp()),
        )
    }

    #[test]
    fn test_equivalence_ignores_const_and_ref() {
        let a = Type::primitive(TypeKind::Int).prefixed(TypeKind::Const);
        let b = Type::primitive(TypeKind::Int).prefixed(TypeKind::Ref);
        assert!(are_equivalent(&a, &b));
    }

    #[test]
    fn test_equivalence_compares_range_bounds() {
        assert!(are_equivalent(&int_range(0, 5), &int_range(0, 5)));
        assert!(!are_equivalent(&int_range(0, 5), &int_range(0, 6)));
        // A plain int is equivalent to any ranged int.
        assert!(are_equivalent(
            &Type::primitive(TypeKind::Int),
            &int_range(0, 5)
        ));
    }

    #[test]
    fn test_equivalence_is_reflexive_and_symmetric() {
        let samples = [
            Type::primitive(TypeKind::Bool),
            Type::primitive(TypeKind::Clock),
            int_range(0, 3),
            Type::array(Type::primitive(TypeKind::Int), int_range(0, 3)),
            Type::record(
                vec![
                    ("x".into(), Type::primitive(TypeKind::Int)),
                    ("y".into(), Type::primitive(TypeKind::Bool)),
                ],
                sp(),
            ),
        ];
        for a in &samples {
            assert!(are_equivalent(a, a));
            for b in &samples {
                assert_eq!(are_equivalent(a, b), are_equivalent(b, a));
            }
        }
    }

    #[test]
    fn test_channel_capability_ordering() {
        let chan = Type::primitive(TypeKind::Channel);
        let urgent = chan.prefixed(TypeKind::Urgent);
        let bcast = chan.prefixed(TypeKind::Broadcast);
        assert_eq!(channel_capability(&urgent), 0);
        assert_eq!(channel_capability(&bcast), 1);
        assert_eq!(channel_capability(&chan), 2);
        assert!(!are_equivalent(&urgent, &chan));
        assert!(are_equivalent(&chan, &chan));
    }

    #[test]
    fn test_assignment_compatibility() {
        let int = Type::primitive(TypeKind::Int);
        let clock = Type::primitive(TypeKind::Clock);
        let double = Type::primitive(TypeKind::Double);
        assert!(are_assignment_compatible(&int, &int, false));
        assert!(are_assignment_compatible(&clock, &int, false));
        assert!(are_assignment_compatible(&double, &clock, false));
        // In initialiser mode a clock only takes doubles.
        assert!(are_assignment_compatible(&clock, &double, true));
        assert!(!are_assignment_compatible(&clock, &int, true));
        assert!(!are_assignment_compatible(&int, &clock, false));
    }

    #[test]
    fn test_eq_compatibility_families() {
        let clock = Type::primitive(TypeKind::Clock);
        assert!(are_eq_compatible(&clock, &clock));
        let int = Type::primitive(TypeKind::Int);
        let bool_ty = Type::primitive(TypeKind::Bool);
        assert!(are_eq_compatible(&int, &bool_ty));
        assert!(!are_eq_compatible(&int, &clock));
    }

    #[test]
    fn test_modifiable_lvalue() {
        let v = Symbol::new("v", Type::primitive(TypeKind::Int));
        let c = Symbol::new(
            "c",
            Type::primitive(TypeKind::Int).prefixed(TypeKind::Const),
        );
        assert!(is_modifiable_lvalue(&Expr::identifier(&v, sp())));
        assert!(!is_modifiable_lvalue(&Expr::identifier(&c, sp())));
        assert!(is_lvalue(&Expr::identifier(&c, sp())));
        assert!(!is_modifiable_lvalue(&Expr::int_constant(1, sp())));
    }

    #[test]
    fn test_unique_reference_requires_computable_index() {
        let arr = Symbol::new(
            "a",
            Type::array(Type::primitive(TypeKind::Int), int_range(0, 3)),
        );
        let i = Symbol::new("i", Type::primitive(TypeKind::Int));
        let values = ComputableValues::default();
        let registry = EffectRegistry::new();

        let by_const = Expr::binary(
            ExprKind::Index,
            Expr::identifier(&arr, sp()),
            Expr::int_constant(0, sp()),
            sp(),
            Type::primitive(TypeKind::Int),
        );
        assert!(is_unique_reference(&by_const, &values, &registry));
        assert!(is_lvalue(&by_const));

        let by_var = Expr::binary(
            ExprKind::Index,
            Expr::identifier(&arr, sp()),
            Expr::identifier(&i, sp()),
            sp(),
            Type::primitive(TypeKind::Int),
        );
        assert!(!is_unique_reference(&by_var, &values, &registry));
        assert!(is_lvalue(&by_var));
    }

    #[test]
    fn test_parameter_compatibility_channels() {
        let chan = Type::primitive(TypeKind::Channel);
        let urgent_param = chan.prefixed(TypeKind::Urgent);
        let plain_arg = Expr::identifier(&Symbol::new("c", chan.clone()), sp());
        // A plain channel argument satisfies an urgent parameter...
        assert!(is_parameter_compatible(&urgent_param, &plain_arg));
        // ...but an urgent argument does not satisfy a plain parameter.
        let urgent_arg = Expr::identifier(
            &Symbol::new("u", chan.prefixed(TypeKind::Urgent)),
            sp(),
        );
        assert!(!is_parameter_compatible(&chan, &urgent_arg));
    }

    #[test]
    fn test_ref_parameter_needs_modifiable_lvalue() {
        let ref_int = Type::primitive(TypeKind::Int).prefixed(TypeKind::Ref);
        assert!(!is_parameter_compatible(
            &ref_int,
            &Expr::int_constant(2, sp())
        ));
        let v = Symbol::new("v", Type::primitive(TypeKind::Int));
        assert!(is_parameter_compatible(&ref_int, &Expr::identifier(&v, sp())));
    }
}
