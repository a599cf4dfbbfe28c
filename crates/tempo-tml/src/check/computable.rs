//! Compile-time computable values.
//!
//! A pre-pass over the system collects every symbol whose value is fixed at
//! compile time: top-level and template-local constants, and constant-typed
//! non-reference, non-double instance parameters. An expression is
//! compile-time computable iff every symbol it could possibly read — looking
//! through function calls — is either a function or in that set. Random
//! sources poison computability.

use crate::ast::{Decl, EffectRegistry, Expr, Symbol, System};
use indexmap::IndexSet;

/// The set of symbols with compile-time fixed values.
#[derive(Debug, Default)]
pub struct ComputableValues {
    symbols: IndexSet<Symbol>,
}

impl ComputableValues {
    /// Collect constants from the whole system.
    pub fn collect(system: &System) -> ComputableValues {
        let mut values = ComputableValues::default();
        values.collect_decls(&system.global.decls);
        for template in system.templates.iter().chain(&system.dynamic_templates) {
            values.collect_decls(&template.declarations.decls);
        }
        for instance in &system.instances {
            for param in instance.parameters.iter() {
                let ty = param.ty();
                if !ty.is(crate::foundation::TypeKind::Ref) && ty.is_constant() && !ty.is_double() {
                    values.symbols.insert(param.clone());
                }
            }
        }
        values
    }

    fn collect_decls(&mut self, decls: &[Decl]) {
        for decl in decls {
            if let Decl::Variable(var) = decl {
                if var.uid.ty().is_constant() {
                    self.symbols.insert(var.uid.clone());
                }
            }
        }
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }
}

/// True iff every symbol `expr` may read is a function or has a
/// compile-time fixed value.
pub fn is_compile_time_computable(
    expr: &Expr,
    values: &ComputableValues,
    registry: &EffectRegistry,
) -> bool {
    let mut reads = IndexSet::new();
    if expr.collect_possible_reads(registry, true, &mut reads) {
        return false;
    }
    reads
        .iter()
        .all(|symbol| symbol.ty().is_function() || values.contains(symbol))
}
