//! Type system for the Tempo Modeling Language.
//!
//! A type is a tree: a root kind plus zero or more subtypes. Kinds fall into
//! four families:
//!
//! - **Primitives** — `int`, `bool`, `double`, `clock`, `cost`, `scalar`,
//!   `void`, `chan`, plus the engine-facing kinds (`fraction`, `rate`,
//!   `diff`, `process`, …)
//! - **Constructors** — arrays, records, bounded ranges, labels (typedefs and
//!   named scalar sets), lists
//! - **Prefixes** — `urgent`, `broadcast`, `committed`, `hybrid`, `const`,
//!   `meta`, `&` (reference)
//! - **Semantic categories** — the boolean-ish kinds the checker assigns to
//!   expressions: guard, invariant, invariant-with-rate, constraint, formula,
//!   probability
//!
//! Prefixes wrap a subtype and are transparent to most queries: `is()` looks
//! through prefixes, ranges, references and labels, so a `const int[0,5]` is
//! still an `int`. The semantic categories form a lattice — every integral
//! expression is a valid invariant, every invariant a valid guard, every
//! guard a valid constraint, every constraint a valid formula — expressed by
//! the `is_invariant`/`is_guard`/`is_constraint`/`is_formula` predicates.
//!
//! Types are cheap-to-clone handles onto shared immutable nodes; type trees
//! form a DAG, never a cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use super::span::Span;
use crate::ast::expr::Expr;

/// The closed set of type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// No type assigned (yet). Checking replaces this everywhere it matters.
    Unknown,
    Void,

    // Primitives
    Int,
    Bool,
    Double,
    Clock,
    Cost,
    Scalar,
    Channel,
    Fraction,
    Rate,
    Diff,
    Process,
    ProcessSet,
    ProcessVar,
    TioGraph,
    DoubleInvGuard,
    Location,
    Branchpoint,

    // Constructors
    Array,
    Record,
    Range,
    Label,
    List,
    Function,
    Instance,
    LscInstance,
    TypeDef,

    // Prefixes
    Urgent,
    Broadcast,
    Committed,
    Hybrid,
    Const,
    SystemMeta,
    Ref,

    // Semantic categories
    Guard,
    Invariant,
    InvariantWr,
    Constraint,
    Formula,
    Probability,
}

impl TypeKind {
    /// True for the wrapper kinds that decorate a single subtype.
    pub fn is_prefix(self) -> bool {
        matches!(
            self,
            TypeKind::Urgent
                | TypeKind::Broadcast
                | TypeKind::Committed
                | TypeKind::Hybrid
                | TypeKind::Const
                | TypeKind::SystemMeta
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TypeData {
    kind: TypeKind,
    subs: Vec<Type>,
    /// Labels parallel to `subs`; empty string when a position is unlabeled.
    labels: Vec<String>,
    /// Bounds of a `Range` node.
    range: Option<Box<(Expr, Expr)>>,
    span: Span,
}

/// A type tree handle. Clones share the underlying node.
#[derive(Clone, Serialize, Deserialize)]
pub struct Type {
    data: Rc<TypeData>,
}

impl Default for Type {
    fn default() -> Self {
        Type::unknown()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TypeKind::Unknown => write!(f, "unknown"),
            TypeKind::Void => write!(f, "void"),
            TypeKind::Int => write!(f, "int"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::Double => write!(f, "double"),
            TypeKind::Clock => write!(f, "clock"),
            TypeKind::Cost => write!(f, "cost"),
            TypeKind::Scalar => write!(f, "scalar"),
            TypeKind::Channel => write!(f, "chan"),
            TypeKind::Fraction => write!(f, "fraction"),
            TypeKind::Rate => write!(f, "rate"),
            TypeKind::Diff => write!(f, "clock difference"),
            TypeKind::Process => write!(f, "process"),
            TypeKind::ProcessSet => write!(f, "process set"),
            TypeKind::ProcessVar => write!(f, "process variable"),
            TypeKind::TioGraph => write!(f, "tiograph"),
            TypeKind::DoubleInvGuard => write!(f, "double invariant guard"),
            TypeKind::Location => write!(f, "location"),
            TypeKind::Branchpoint => write!(f, "branchpoint"),
            TypeKind::Array => write!(f, "{}[]", self.get(0)),
            TypeKind::Record => write!(f, "struct"),
            TypeKind::Range => write!(f, "{}", self.get(0)),
            TypeKind::Label => write!(f, "{}", self.label(0)),
            TypeKind::List => write!(f, "list"),
            TypeKind::Function => write!(f, "function"),
            TypeKind::Instance | TypeKind::LscInstance => write!(f, "instance"),
            TypeKind::TypeDef => write!(f, "typedef"),
            TypeKind::Urgent => write!(f, "urgent {}", self.get(0)),
            TypeKind::Broadcast => write!(f, "broadcast {}", self.get(0)),
            TypeKind::Committed => write!(f, "committed {}", self.get(0)),
            TypeKind::Hybrid => write!(f, "hybrid {}", self.get(0)),
            TypeKind::Const => write!(f, "const {}", self.get(0)),
            TypeKind::SystemMeta => write!(f, "meta {}", self.get(0)),
            TypeKind::Ref => write!(f, "{}&", self.get(0)),
            TypeKind::Guard => write!(f, "guard"),
            TypeKind::Invariant => write!(f, "invariant"),
            TypeKind::InvariantWr => write!(f, "invariant with rate"),
            TypeKind::Constraint => write!(f, "constraint"),
            TypeKind::Formula => write!(f, "formula"),
            TypeKind::Probability => write!(f, "probability"),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind())?;
        if !self.data.subs.is_empty() {
            write!(f, "{:?}", self.data.subs)?;
        }
        Ok(())
    }
}

impl Type {
    fn make(kind: TypeKind, subs: Vec<Type>, labels: Vec<String>, span: Span) -> Type {
        Type {
            data: Rc::new(TypeData {
                kind,
                subs,
                labels,
                range: None,
                span,
            }),
        }
    }

    /// The `Unknown` type.
    pub fn unknown() -> Type {
        Type::make(TypeKind::Unknown, Vec::new(), Vec::new(), Span::default())
    }

    /// A childless type of the given kind.
    pub fn primitive(kind: TypeKind) -> Type {
        Type::make(kind, Vec::new(), Vec::new(), Span::default())
    }

    pub fn primitive_at(kind: TypeKind, span: Span) -> Type {
        Type::make(kind, Vec::new(), Vec::new(), span)
    }

    /// Wrap `self` in a prefix or reference kind.
    pub fn prefixed(&self, kind: TypeKind) -> Type {
        Type::make(kind, vec![self.clone()], Vec::new(), self.span())
    }

    /// Wrap `self` in a named label (typedefs and named scalar sets).
    pub fn labeled(&self, label: &str) -> Type {
        Type::make(
            TypeKind::Label,
            vec![self.clone()],
            vec![label.to_string()],
            self.span(),
        )
    }

    /// A bounded range over `inner` with the given bound expressions.
    pub fn range(inner: Type, lower: Expr, upper: Expr) -> Type {
        let span = inner.span();
        Type {
            data: Rc::new(TypeData {
                kind: TypeKind::Range,
                subs: vec![inner],
                labels: Vec::new(),
                range: Some(Box::new((lower, upper))),
                span,
            }),
        }
    }

    /// An array of `elem`, sized by `size` (a range or scalar-set type).
    pub fn array(elem: Type, size: Type) -> Type {
        let span = elem.span();
        Type::make(TypeKind::Array, vec![elem, size], Vec::new(), span)
    }

    /// A record with the given fields, in declaration order.
    pub fn record(fields: Vec<(String, Type)>, span: Span) -> Type {
        let (labels, subs) = fields.into_iter().unzip();
        Type::make(TypeKind::Record, subs, labels, span)
    }

    /// A list-literal type; labels mark designated initialiser positions.
    pub fn list(elems: Vec<(String, Type)>, span: Span) -> Type {
        let (labels, subs) = elems.into_iter().unzip();
        Type::make(TypeKind::List, subs, labels, span)
    }

    /// A function type: return type first, then the parameter types.
    pub fn function(ret: Type, params: Vec<Type>) -> Type {
        let span = ret.span();
        let mut subs = vec![ret];
        subs.extend(params);
        Type::make(TypeKind::Function, subs, Vec::new(), span)
    }

    /// A (partial) template instance; subtypes are the unbound parameters.
    pub fn instance(unbound: Vec<Type>) -> Type {
        Type::make(TypeKind::Instance, unbound, Vec::new(), Span::default())
    }

    /// A process type; subtypes are the unbound parameters.
    pub fn process(unbound: Vec<Type>) -> Type {
        Type::make(TypeKind::Process, unbound, Vec::new(), Span::default())
    }

    pub fn kind(&self) -> TypeKind {
        self.data.kind
    }

    pub fn span(&self) -> Span {
        self.data.span
    }

    /// Number of subtypes (record fields, function return + parameters, …).
    pub fn size(&self) -> usize {
        self.data.subs.len()
    }

    /// The i-th subtype, without prefix handling.
    pub fn get(&self, i: usize) -> &Type {
        &self.data.subs[i]
    }

    pub fn label(&self, i: usize) -> &str {
        self.data.labels.get(i).map(String::as_str).unwrap_or("")
    }

    /// Position of a record field, or `None` if no such field exists.
    pub fn find_index_of(&self, label: &str) -> Option<usize> {
        let ty = self.strip();
        (0..ty.size()).find(|&i| ty.label(i) == label)
    }

    /// True if this type is of the given kind, looking through prefixes,
    /// ranges, references and labels.
    pub fn is(&self, kind: TypeKind) -> bool {
        match self.kind() {
            TypeKind::ProcessVar => kind == TypeKind::ProcessVar,
            TypeKind::DoubleInvGuard => kind == TypeKind::DoubleInvGuard,
            k if k == kind => true,
            k if (k.is_prefix() || k == TypeKind::Range || k == TypeKind::Ref || k == TypeKind::Label)
                && self.size() > 0 =>
            {
                self.get(0).is(kind)
            }
            _ => false,
        }
    }

    pub fn unknown_kind(&self) -> bool {
        self.kind() == TypeKind::Unknown
    }

    /// Element type of an array. Prefixes are pushed down onto the element,
    /// so the element of a `const` array is itself `const`.
    pub fn elem(&self) -> Type {
        match self.kind() {
            TypeKind::Ref | TypeKind::Label => self.get(0).elem(),
            k if k.is_prefix() => self.get(0).elem().prefixed(k),
            _ => {
                debug_assert_eq!(self.kind(), TypeKind::Array);
                self.get(0).clone()
            }
        }
    }

    /// The i-th field type of a record, with prefixes pushed down.
    pub fn field(&self, i: usize) -> Type {
        match self.kind() {
            TypeKind::Ref | TypeKind::Label => self.get(0).field(i),
            k if k.is_prefix() => self.get(0).field(i).prefixed(k),
            _ => self.get(i).clone(),
        }
    }

    /// The size type of an array (a range or scalar-set type).
    pub fn array_size(&self) -> Type {
        match self.kind() {
            TypeKind::Ref | TypeKind::Label => self.get(0).array_size(),
            k if k.is_prefix() => self.get(0).array_size(),
            _ => {
                debug_assert_eq!(self.kind(), TypeKind::Array);
                self.get(1).clone()
            }
        }
    }

    pub fn record_size(&self) -> usize {
        match self.kind() {
            TypeKind::Ref | TypeKind::Label => self.get(0).record_size(),
            k if k.is_prefix() => self.get(0).record_size(),
            _ => self.size(),
        }
    }

    pub fn record_label(&self, i: usize) -> &str {
        match self.kind() {
            TypeKind::Ref | TypeKind::Label => self.get(0).record_label(i),
            k if k.is_prefix() => self.get(0).record_label(i),
            _ => self.label(i),
        }
    }

    /// Bounds of the innermost range, if any.
    pub fn bounds(&self) -> Option<(&Expr, &Expr)> {
        match self.kind() {
            TypeKind::Range => self.data.range.as_ref().map(|b| (&b.0, &b.1)),
            k if (k.is_prefix() || k == TypeKind::Ref || k == TypeKind::Label) && self.size() > 0 => {
                self.get(0).bounds()
            }
            _ => None,
        }
    }

    /// Remove all prefixes, ranges, references and labels.
    pub fn strip(&self) -> &Type {
        let k = self.kind();
        if (k.is_prefix() || k == TypeKind::Range || k == TypeKind::Ref || k == TypeKind::Label)
            && self.size() > 0
        {
            self.get(0).strip()
        } else {
            self
        }
    }

    /// Strip prefixes and every array constructor down to the element type.
    pub fn strip_array(&self) -> &Type {
        let mut ty = self.strip();
        while ty.kind() == TypeKind::Array {
            ty = ty.get(0).strip();
        }
        ty
    }

    // -- shape predicates ---------------------------------------------------

    pub fn is_integer(&self) -> bool {
        self.is(TypeKind::Int)
    }

    pub fn is_boolean(&self) -> bool {
        self.is(TypeKind::Bool)
    }

    pub fn is_double(&self) -> bool {
        self.is(TypeKind::Double)
    }

    pub fn is_clock(&self) -> bool {
        self.is(TypeKind::Clock)
    }

    pub fn is_diff(&self) -> bool {
        self.is(TypeKind::Diff)
    }

    pub fn is_void(&self) -> bool {
        self.is(TypeKind::Void)
    }

    pub fn is_scalar(&self) -> bool {
        self.is(TypeKind::Scalar)
    }

    pub fn is_channel(&self) -> bool {
        self.is(TypeKind::Channel)
    }

    pub fn is_array(&self) -> bool {
        self.is(TypeKind::Array)
    }

    pub fn is_record(&self) -> bool {
        self.is(TypeKind::Record)
    }

    pub fn is_range(&self) -> bool {
        self.is(TypeKind::Range)
    }

    pub fn is_function(&self) -> bool {
        self.is(TypeKind::Function)
    }

    pub fn is_process(&self) -> bool {
        self.is(TypeKind::Process)
    }

    pub fn is_location(&self) -> bool {
        self.is(TypeKind::Location)
    }

    // -- semantic categories ------------------------------------------------

    /// Integers, booleans and process variables.
    pub fn is_integral(&self) -> bool {
        self.is(TypeKind::Int) || self.is(TypeKind::Bool) || self.is(TypeKind::ProcessVar)
    }

    pub fn is_invariant(&self) -> bool {
        self.is(TypeKind::Invariant) || self.is_integral()
    }

    pub fn is_guard(&self) -> bool {
        self.is(TypeKind::Guard) || self.is_invariant()
    }

    pub fn is_constraint(&self) -> bool {
        self.is(TypeKind::Constraint) || self.is_guard()
    }

    pub fn is_formula(&self) -> bool {
        self.is(TypeKind::Formula) || self.is_constraint()
    }

    pub fn is_probability(&self) -> bool {
        self.is(TypeKind::Probability) || self.is_integer()
    }

    // -- constant-ness ------------------------------------------------------

    /// True if every value of this type is constant. Functions, processes
    /// and instances are neither constant nor non-constant.
    pub fn is_constant(&self) -> bool {
        match self.kind() {
            TypeKind::Function
            | TypeKind::Process
            | TypeKind::ProcessSet
            | TypeKind::Instance
            | TypeKind::LscInstance => false,
            TypeKind::Const => true,
            TypeKind::Record => (0..self.size()).all(|i| self.get(i).is_constant()),
            _ => self.size() > 0 && self.get(0).is_constant(),
        }
    }

    /// True if no part of this type is constant.
    pub fn is_non_constant(&self) -> bool {
        match self.kind() {
            TypeKind::Function
            | TypeKind::Process
            | TypeKind::ProcessSet
            | TypeKind::Instance
            | TypeKind::LscInstance => false,
            TypeKind::Const => false,
            TypeKind::Record => (0..self.size()).all(|i| self.get(i).is_non_constant()),
            _ => self.size() == 0 || self.get(0).is_non_constant(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::Expr;

    fn int_range(lo: i64, hi: i64) -> Type {
        Type::range(
            Type::primitive(TypeKind::Int),
            Expr::int_constant(lo, Span::default()),
            Expr::int_constant(hi, Span::default()),
        )
    }

    #[test]
    fn test_is_looks_through_wrappers() {
        let ty = int_range(0, 5).prefixed(TypeKind::Const);
        assert!(ty.is(TypeKind::Int));
        assert!(ty.is(TypeKind::Range));
        assert!(ty.is(TypeKind::Const));
        assert!(ty.is_integral());
        assert!(ty.is_constant());
        assert!(!ty.is_non_constant());
    }

    #[test]
    fn test_semantic_lattice() {
        let b = Type::primitive(TypeKind::Bool);
        assert!(b.is_integral());
        assert!(b.is_invariant());
        assert!(b.is_guard());
        assert!(b.is_constraint());
        assert!(b.is_formula());

        let g = Type::primitive(TypeKind::Guard);
        assert!(!g.is_invariant());
        assert!(g.is_guard());
        assert!(g.is_constraint());
        assert!(g.is_formula());

        let f = Type::primitive(TypeKind::Formula);
        assert!(!f.is_constraint());
        assert!(f.is_formula());
    }

    #[test]
    fn test_const_array_element_is_const() {
        let arr = Type::array(Type::primitive(TypeKind::Int), int_range(0, 3))
            .prefixed(TypeKind::Const);
        assert!(arr.elem().is_constant());
        assert!(arr.elem().is_integer());
    }

    #[test]
    fn test_record_field_lookup() {
        let rec = Type::record(
            vec![
                ("x".into(), Type::primitive(TypeKind::Int)),
                ("y".into(), Type::primitive(TypeKind::Bool)),
            ],
            Span::default(),
        );
        assert_eq!(rec.record_size(), 2);
        assert_eq!(rec.find_index_of("y"), Some(1));
        assert_eq!(rec.find_index_of("z"), None);
        assert!(rec.field(1).is_boolean());
    }

    #[test]
    fn test_process_var_is_opaque() {
        let pv = Type::primitive(TypeKind::ProcessVar);
        assert!(pv.is(TypeKind::ProcessVar));
        assert!(!pv.is(TypeKind::Int));
        assert!(pv.is_integral());
    }
}
