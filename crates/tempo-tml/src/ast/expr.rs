//! Expression trees.
//!
//! An expression is a node with a kind tag, an ordered list of child
//! expressions and optional payloads: the symbol an identifier denotes, a
//! literal value, and the direction of a synchronisation. The checker
//! attaches a `Type` to every node it accepts; structure is otherwise
//! immutable (record initialisers are the one exception — they get reordered
//! into declaration order).
//!
//! Besides the tree itself this module hosts the effect analyses the checker
//! relies on: which symbols an expression may write, which it may read
//! (following calls through the function-effect registry), and whether two
//! expressions are structurally identical.

use crate::ast::symbols::Symbol;
use crate::foundation::{Span, Type, TypeKind};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of expression kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    // Terminals and structure
    Constant,
    Identifier,
    Deadlock,
    Dot,
    Index,
    List,
    Sync,
    Comma,
    InlineIf,
    Call,

    // Arithmetic
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Min,
    Max,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    UnaryMinus,

    // Logic
    And,
    Or,
    Xor,
    Not,

    // Comparison
    Lt,
    Le,
    Ge,
    Gt,
    Eq,
    Neq,

    // Assignment
    Assign,
    AssPlus,
    AssMinus,
    AssMult,
    AssDiv,
    AssMod,
    AssAnd,
    AssOr,
    AssXor,
    AssShiftLeft,
    AssShiftRight,
    PreIncrement,
    PostIncrement,
    PreDecrement,
    PostDecrement,

    // Quantifiers
    Forall,
    Exists,
    Sum,

    // Clocks and costs
    Rate,
    Fraction,

    // Dynamic process constructs
    Spawn,
    NumOf,
    Exit,
    SumDynamic,
    ForallDynamic,
    ExistsDynamic,

    // Math library
    Abs,
    FpClassify,
    Fabs,
    Exp,
    Exp2,
    Expm1,
    Ln,
    Log,
    Log10,
    Log2,
    Log1p,
    Sqrt,
    Cbrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Erf,
    Erfc,
    Tgamma,
    Lgamma,
    Ceil,
    Floor,
    Trunc,
    Round,
    Logb,
    Ilogb,
    Fint,
    Ldexp,
    Fmod,
    Fmax,
    Fmin,
    Fdim,
    Pow,
    Hypot,
    Atan2,
    NextAfter,
    CopySign,
    Fma,
    IsFinite,
    IsInf,
    IsNan,
    IsNormal,
    SignBit,
    IsUnordered,
    Random,
    RandomArcsine,
    RandomBeta,
    RandomGamma,
    RandomNormal,
    RandomPoisson,
    RandomTri,
    RandomWeibull,

    // Temporal and game properties
    Ef,
    Eg,
    Af,
    Ag,
    Leadsto,
    AUntil,
    AWeakUntil,
    ABuchi,
    Scenario,
    Scenario2,
    Pmax,
    Control,
    EfControl,
    ControlTopt,
    ControlToptDef1,
    ControlToptDef2,
    PoControl,
    SmcControl,

    // Timed I/O graph operators
    Restrict,
    SimulationLe,
    SimulationGe,
    RefinementLe,
    RefinementGe,
    TioComposition,
    TioConjunction,
    SyntaxComposition,
    TioQuotient,
    Consistency,
    Specification,
    Implementation,

    // Statistical queries
    ProbaBox,
    ProbaDiamond,
    ProbaMinBox,
    ProbaMinDiamond,
    ProbaCmp,
    ProbaExp,
    Simulate,
    SimulateReach,
    SupVar,
    InfVar,

    // MITL
    MitlFormula,
    MitlConj,
    MitlDisj,
    MitlNext,
    MitlUntil,
    MitlRelease,
    MitlAtom,
    MitlForall,
    MitlExists,
}

impl ExprKind {
    /// Assignment forms: `=` and the compound operators.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            ExprKind::Assign
                | ExprKind::AssPlus
                | ExprKind::AssMinus
                | ExprKind::AssMult
                | ExprKind::AssDiv
                | ExprKind::AssMod
                | ExprKind::AssAnd
                | ExprKind::AssOr
                | ExprKind::AssXor
                | ExprKind::AssShiftLeft
                | ExprKind::AssShiftRight
        )
    }

    pub fn is_increment(self) -> bool {
        matches!(
            self,
            ExprKind::PreIncrement
                | ExprKind::PostIncrement
                | ExprKind::PreDecrement
                | ExprKind::PostDecrement
        )
    }
}

/// Literal payload of a `Constant` node (booleans are integers 0/1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Double(f64),
}

/// Direction of a synchronisation label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncFlavor {
    /// Emission, `c!`
    Bang,
    /// Reception, `c?`
    Que,
    /// CSP-style name synchronisation
    Csp,
}

/// Effects of a user function: the symbols its body may write and read,
/// excluding its own parameters and locals. Computed by the checker when the
/// function declaration is visited; calls to a not-yet-visited function
/// contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct FnEffects {
    pub changes: IndexSet<Symbol>,
    pub depends: IndexSet<Symbol>,
}

/// Function symbol → effects, plus the reference discipline of parameters
/// needed to account for writes through non-const reference arguments.
#[derive(Debug, Default)]
pub struct EffectRegistry {
    fns: HashMap<Symbol, FnEffects>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, function: Symbol, effects: FnEffects) {
        self.fns.insert(function, effects);
    }

    pub fn get(&self, function: &Symbol) -> Option<&FnEffects> {
        self.fns.get(function)
    }
}

/// An expression node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub subs: Vec<Expr>,
    pub symbol: Option<Symbol>,
    pub value: Option<Value>,
    pub sync: Option<SyncFlavor>,
    pub span: Span,
    /// Assigned by the checker; `Unknown` until then for operator nodes.
    pub ty: Type,
}

impl Expr {
    pub fn new(kind: ExprKind, subs: Vec<Expr>, span: Span, ty: Type) -> Expr {
        Expr {
            kind,
            subs,
            symbol: None,
            value: None,
            sync: None,
            span,
            ty,
        }
    }

    /// Integer literal, typed `int`.
    pub fn int_constant(value: i64, span: Span) -> Expr {
        Expr {
            value: Some(Value::Int(value)),
            ..Expr::new(
                ExprKind::Constant,
                Vec::new(),
                span,
                Type::primitive(TypeKind::Int),
            )
        }
    }

    /// Boolean literal, typed `bool`, stored as 0/1.
    pub fn bool_constant(value: bool, span: Span) -> Expr {
        Expr {
            value: Some(Value::Int(value as i64)),
            ..Expr::new(
                ExprKind::Constant,
                Vec::new(),
                span,
                Type::primitive(TypeKind::Bool),
            )
        }
    }

    /// Floating-point literal, typed `double`.
    pub fn double_constant(value: f64, span: Span) -> Expr {
        Expr {
            value: Some(Value::Double(value)),
            ..Expr::new(
                ExprKind::Constant,
                Vec::new(),
                span,
                Type::primitive(TypeKind::Double),
            )
        }
    }

    /// Reference to a declared symbol; the node takes the symbol's type.
    pub fn identifier(symbol: &Symbol, span: Span) -> Expr {
        Expr {
            symbol: Some(symbol.clone()),
            ..Expr::new(ExprKind::Identifier, Vec::new(), span, symbol.ty().clone())
        }
    }

    pub fn unary(kind: ExprKind, sub: Expr, span: Span, ty: Type) -> Expr {
        Expr::new(kind, vec![sub], span, ty)
    }

    pub fn binary(kind: ExprKind, left: Expr, right: Expr, span: Span, ty: Type) -> Expr {
        Expr::new(kind, vec![left, right], span, ty)
    }

    pub fn nary(kind: ExprKind, subs: Vec<Expr>, span: Span, ty: Type) -> Expr {
        Expr::new(kind, subs, span, ty)
    }

    /// Field access; the resolved field position is kept as the value.
    pub fn dot(base: Expr, index: usize, span: Span, ty: Type) -> Expr {
        Expr {
            value: Some(Value::Int(index as i64)),
            ..Expr::new(ExprKind::Dot, vec![base], span, ty)
        }
    }

    /// A synchronisation label over a channel expression.
    pub fn sync(channel: Expr, flavor: SyncFlavor, span: Span) -> Expr {
        Expr {
            sync: Some(flavor),
            ..Expr::new(ExprKind::Sync, vec![channel], span, Type::unknown())
        }
    }

    /// A call; the callee identifier comes first, the node takes the
    /// function's declared return type.
    pub fn call(callee: Expr, args: Vec<Expr>, span: Span) -> Expr {
        let ret = if callee.ty.is_function() && callee.ty.strip().size() > 0 {
            callee.ty.strip().get(0).clone()
        } else {
            Type::unknown()
        };
        let mut subs = vec![callee];
        subs.extend(args);
        Expr::new(ExprKind::Call, subs, span, ret)
    }

    pub fn size(&self) -> usize {
        self.subs.len()
    }

    pub fn get(&self, i: usize) -> &Expr {
        &self.subs[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut Expr {
        &mut self.subs[i]
    }

    pub fn int_value(&self) -> Option<i64> {
        match self.value {
            Some(Value::Int(v)) => Some(v),
            _ => None,
        }
    }

    /// True for the literal `true`/`1`.
    pub fn is_true(&self) -> bool {
        self.kind == ExprKind::Constant && self.ty.is_integral() && self.int_value() == Some(1)
    }

    /// Dynamic-process constructs may only appear on edges.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Spawn
                | ExprKind::NumOf
                | ExprKind::Exit
                | ExprKind::SumDynamic
                | ExprKind::ForallDynamic
                | ExprKind::ExistsDynamic
        )
    }

    pub fn has_dynamic_sub(&self) -> bool {
        self.subs
            .iter()
            .any(|sub| sub.is_dynamic() || sub.has_dynamic_sub())
    }

    /// Structural equality: kinds, values, symbols, sync directions and all
    /// children match. Spans and attached types are ignored.
    pub fn same_as(&self, other: &Expr) -> bool {
        self.kind == other.kind
            && self.value == other.value
            && self.symbol == other.symbol
            && self.sync == other.sync
            && self.size() == other.size()
            && self.subs.iter().zip(&other.subs).all(|(a, b)| a.same_as(b))
    }

    /// Collect the symbols this expression may denote when used as an
    /// assignment target.
    pub fn collect_symbols(&self, out: &mut IndexSet<Symbol>) {
        match self.kind {
            ExprKind::Identifier => {
                if let Some(symbol) = &self.symbol {
                    out.insert(symbol.clone());
                }
            }
            ExprKind::Dot | ExprKind::Index | ExprKind::Sync => self.get(0).collect_symbols(out),
            ExprKind::PreIncrement | ExprKind::PreDecrement => self.get(0).collect_symbols(out),
            ExprKind::InlineIf => {
                self.get(1).collect_symbols(out);
                self.get(2).collect_symbols(out);
            }
            ExprKind::Comma => self.get(1).collect_symbols(out),
            k if k.is_assignment() => self.get(0).collect_symbols(out),
            _ => {}
        }
    }

    /// Collect every symbol this expression may write: assignment targets,
    /// increments, and — through the registry — everything a called function
    /// changes, including arguments bound to non-const reference parameters.
    pub fn collect_possible_writes(&self, registry: &EffectRegistry, out: &mut IndexSet<Symbol>) {
        for sub in &self.subs {
            sub.collect_possible_writes(registry, out);
        }
        match self.kind {
            k if k.is_assignment() || k.is_increment() => self.get(0).collect_symbols(out),
            ExprKind::Call => {
                let Some(callee) = self.get(0).symbol.as_ref() else {
                    return;
                };
                if !callee.ty().is_function() {
                    return;
                }
                if let Some(effects) = registry.get(callee) {
                    out.extend(effects.changes.iter().cloned());
                }
                let fn_type = callee.ty().strip();
                for i in 1..self.size().min(fn_type.size()) {
                    let param = fn_type.get(i);
                    if param.is(TypeKind::Ref) && !param.is_constant() {
                        self.get(i).collect_symbols(out);
                    }
                }
            }
            _ => {}
        }
    }

    /// Collect every symbol this expression may read, following calls
    /// through the registry. Returns true if a random source was read and
    /// `count_random` is set — such expressions are never compile-time
    /// computable.
    pub fn collect_possible_reads(
        &self,
        registry: &EffectRegistry,
        count_random: bool,
        out: &mut IndexSet<Symbol>,
    ) -> bool {
        let mut saw_random = false;
        for sub in &self.subs {
            saw_random |= sub.collect_possible_reads(registry, count_random, out);
        }
        match self.kind {
            ExprKind::Identifier => {
                if let Some(symbol) = &self.symbol {
                    out.insert(symbol.clone());
                }
            }
            ExprKind::Call => {
                if let Some(callee) = self.get(0).symbol.as_ref() {
                    if callee.ty().is_function() {
                        if let Some(effects) = registry.get(callee) {
                            out.extend(effects.depends.iter().cloned());
                        }
                    }
                }
            }
            ExprKind::Random
            | ExprKind::RandomArcsine
            | ExprKind::RandomBeta
            | ExprKind::RandomGamma
            | ExprKind::RandomNormal
            | ExprKind::RandomPoisson
            | ExprKind::RandomTri
            | ExprKind::RandomWeibull => {
                saw_random |= count_random;
            }
            _ => {}
        }
        saw_random
    }

    /// True if evaluating this expression may change any variable.
    pub fn changes_any_variable(&self, registry: &EffectRegistry) -> bool {
        let mut changes = IndexSet::new();
        self.collect_possible_writes(registry, &mut changes);
        !changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::symbols::Symbol;

    fn sp() -> Span {
        Span::default()
    }

    fn int_symbol(name: &str) -> Symbol {
        Symbol::new(name, Type::primitive(TypeKind::Int))
    }

    #[test]
    fn test_same_as_ignores_spans_and_types() {
        let n = int_symbol("n");
        let a = Expr::binary(
            ExprKind::Plus,
            Expr::identifier(&n, sp()),
            Expr::int_constant(1, sp()),
            sp(),
            Type::primitive(TypeKind::Int),
        );
        let b = Expr::binary(
            ExprKind::Plus,
            Expr::identifier(&n, Span::new(0, 10, 13, 2)),
            Expr::int_constant(1, sp()),
            sp(),
            Type::unknown(),
        );
        assert!(a.same_as(&b));

        let other = Expr::binary(
            ExprKind::Plus,
            Expr::identifier(&int_symbol("n"), sp()),
            Expr::int_constant(1, sp()),
            sp(),
            Type::unknown(),
        );
        assert!(!a.same_as(&other), "distinct declarations never compare equal");
    }

    #[test]
    fn test_collect_writes_assignment() {
        let n = int_symbol("n");
        let assign = Expr::binary(
            ExprKind::Assign,
            Expr::identifier(&n, sp()),
            Expr::int_constant(3, sp()),
            sp(),
            Type::unknown(),
        );
        let registry = EffectRegistry::new();
        let mut writes = IndexSet::new();
        assign.collect_possible_writes(&registry, &mut writes);
        assert!(writes.contains(&n));
        assert!(assign.changes_any_variable(&registry));
    }

    #[test]
    fn test_collect_writes_through_call() {
        let global = int_symbol("g");
        let fn_ty = Type::function(Type::primitive(TypeKind::Void), Vec::new());
        let f = Symbol::new("f", fn_ty);

        let mut registry = EffectRegistry::new();
        let mut effects = FnEffects::default();
        effects.changes.insert(global.clone());
        registry.insert(f.clone(), effects);

        let call = Expr::call(Expr::identifier(&f, sp()), Vec::new(), sp());
        let mut writes = IndexSet::new();
        call.collect_possible_writes(&registry, &mut writes);
        assert!(writes.contains(&global));
    }

    #[test]
    fn test_collect_writes_ref_argument() {
        let target = int_symbol("slot");
        let ref_param = Type::primitive(TypeKind::Int).prefixed(TypeKind::Ref);
        let f = Symbol::new(
            "store",
            Type::function(Type::primitive(TypeKind::Void), vec![ref_param]),
        );
        let call = Expr::call(
            Expr::identifier(&f, sp()),
            vec![Expr::identifier(&target, sp())],
            sp(),
        );
        let registry = EffectRegistry::new();
        let mut writes = IndexSet::new();
        call.collect_possible_writes(&registry, &mut writes);
        assert!(writes.contains(&target));
    }

    #[test]
    fn test_reads_collect_random() {
        let arg = Expr::double_constant(2.0, sp());
        let rnd = Expr::unary(
            ExprKind::Random,
            arg,
            sp(),
            Type::primitive(TypeKind::Double),
        );
        let registry = EffectRegistry::new();
        let mut reads = IndexSet::new();
        assert!(rnd.collect_possible_reads(&registry, true, &mut reads));
        assert!(!rnd.collect_possible_reads(&registry, false, &mut reads));
    }

    #[test]
    fn test_is_true() {
        assert!(Expr::bool_constant(true, sp()).is_true());
        assert!(Expr::int_constant(1, sp()).is_true());
        assert!(!Expr::int_constant(2, sp()).is_true());
        assert!(!Expr::bool_constant(false, sp()).is_true());
    }

    #[test]
    fn test_dynamic_sub_detection() {
        let exit = Expr::new(
            ExprKind::Exit,
            Vec::new(),
            sp(),
            Type::primitive(TypeKind::Int),
        );
        let comma = Expr::binary(
            ExprKind::Comma,
            Expr::int_constant(0, sp()),
            exit,
            sp(),
            Type::unknown(),
        );
        assert!(!comma.is_dynamic());
        assert!(comma.has_dynamic_sub());
    }
}
