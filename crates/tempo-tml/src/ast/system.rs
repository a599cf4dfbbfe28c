//! The system model: everything the builder produces for one network of
//! timed automata, and the container the checker annotates.
//!
//! A `System` owns the global declarations, the templates with their states
//! and edges, the (partial) instantiations, the queries, and the diagnostic
//! buffer. The checker mutates it in exactly four ways: attaching types to
//! expressions, rewriting decomposed state invariants, reordering record
//! initialisers, and appending diagnostics and recorded facts.

use crate::ast::expr::Expr;
use crate::ast::stmt::Block;
use crate::ast::symbols::{Frame, Symbol};
use crate::error::{Diagnostic, Severity};
use crate::foundation::{SourceMap, Span};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A variable declaration with its optional initialiser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub uid: Symbol,
    pub init: Option<Expr>,
}

/// A user function. `changes` and `depends` are filled in by the checker:
/// the external symbols the body may write and read, with parameters and
/// locals subtracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub uid: Symbol,
    pub body: Block,
    pub changes: IndexSet<Symbol>,
    pub depends: IndexSet<Symbol>,
}

/// A location. After checking, `invariant` holds the residual invariant and
/// `cost_rate` the extracted cost rate, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub uid: Symbol,
    pub invariant: Option<Expr>,
    /// Exponential delay rate for statistical semantics.
    pub exp_rate: Option<Expr>,
    pub cost_rate: Option<Expr>,
}

/// An edge between locations. `dst` is `None` for branchpoint edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub select: Frame,
    pub guard: Option<Expr>,
    pub sync: Option<Expr>,
    pub assign: Expr,
    pub prob: Option<Expr>,
    /// Controllable in the game semantics (solid edge).
    pub control: bool,
    pub dst: Option<usize>,
}

/// A template or process instantiation. The first `unbound` parameters are
/// free; the following `arguments` parameters are bound by `mapping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub uid: Symbol,
    pub parameters: Frame,
    pub unbound: usize,
    pub arguments: usize,
    pub mapping: IndexMap<Symbol, Expr>,
    /// Symbols that (transitively) occur in array sizes or select types of
    /// this instance; free parameters must stay out of this set.
    pub restricted: IndexSet<Symbol>,
}

/// Declaration-ordered variable and function records of one scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Declarations {
    pub frame: Frame,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Variable(Variable),
    Function(Function),
}

/// A sequence-chart message label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub label: Option<Expr>,
}

/// A sequence-chart condition label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub label: Option<Expr>,
}

/// A sequence-chart update label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub label: Option<Expr>,
}

/// An automaton template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub inst: Instance,
    pub declarations: Declarations,
    pub states: Vec<State>,
    pub edges: Vec<Edge>,
    pub instance_lines: Vec<Instance>,
    pub messages: Vec<Message>,
    pub updates: Vec<Update>,
    pub conditions: Vec<Condition>,
    /// Instances may be spawned and exited at runtime.
    pub dynamic: bool,
    /// False while only a declaration has been seen.
    pub defined: bool,
}

/// Input/output channel partitioning for timed I/O analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IoDecl {
    pub instance_name: String,
    pub param: Vec<Expr>,
    pub inputs: Vec<Expr>,
    pub outputs: Vec<Expr>,
    pub csp: Vec<Expr>,
}

/// A progress measure: `measure` must grow whenever `guard` holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMeasure {
    pub guard: Option<Expr>,
    pub measure: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttMap {
    pub parameters: Frame,
    pub predicate: Expr,
    pub mapping: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttChart {
    pub parameters: Frame,
    pub mapping: Vec<GanttMap>,
}

/// One channel-priority group; `None` entries stand for the default group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChanPriority {
    pub head: Option<Expr>,
    pub tail: Vec<Option<Expr>>,
}

/// Which synchronisation style the model uses. IO (`!`/`?`) and CSP labels
/// cannot be mixed within one system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncUsage {
    #[default]
    Unused,
    Io,
    Csp,
}

/// Facts the checker records about the model as a whole.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SystemFacts {
    pub stopwatches: bool,
    pub strict_invariants: bool,
    pub strict_lower_bound_on_controllable_edges: bool,
    pub urgent_transitions: bool,
    pub clock_guard_recv_broadcast: bool,
    pub sync_used: SyncUsage,
}

/// A complete system under analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct System {
    pub sources: SourceMap,
    pub global: Declarations,
    pub templates: Vec<Template>,
    pub dynamic_templates: Vec<Template>,
    pub instances: Vec<Instance>,
    pub processes: Vec<Instance>,
    pub io_decls: Vec<IoDecl>,
    pub progress: Vec<ProgressMeasure>,
    pub gantt_charts: Vec<GanttChart>,
    pub chan_priorities: Vec<ChanPriority>,
    /// Clock expressions designated as hybrid for simulation semantics.
    pub hybrid_clocks: Vec<Expr>,
    /// Top-level property expressions.
    pub queries: Vec<Expr>,
    /// Model-wide update hooks run around each transition.
    pub before_update: Option<Expr>,
    pub after_update: Option<Expr>,
    pub diagnostics: Vec<Diagnostic>,
    pub facts: SystemFacts,
}

impl System {
    pub fn new() -> System {
        System::default()
    }

    pub fn add_error(&mut self, span: Span, message: impl Into<String>, category: &'static str) {
        self.diagnostics
            .push(Diagnostic::error(span, message, category));
    }

    pub fn add_warning(&mut self, span: Span, message: impl Into<String>, category: &'static str) {
        self.diagnostics
            .push(Diagnostic::warning(span, message, category));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Look up a dynamic template by name.
    pub fn dynamic_template(&self, name: &str) -> Option<&Template> {
        self.dynamic_templates
            .iter()
            .find(|t| t.inst.uid.name() == name)
    }
}

impl Template {
    pub fn new(inst: Instance) -> Template {
        Template {
            inst,
            declarations: Declarations::default(),
            states: Vec::new(),
            edges: Vec::new(),
            instance_lines: Vec::new(),
            messages: Vec::new(),
            updates: Vec::new(),
            conditions: Vec::new(),
            dynamic: false,
            defined: true,
        }
    }
}

impl Instance {
    /// An instance with no parameters at all.
    pub fn plain(uid: Symbol) -> Instance {
        Instance {
            uid,
            parameters: Frame::new(),
            unbound: 0,
            arguments: 0,
            mapping: IndexMap::new(),
            restricted: IndexSet::new(),
        }
    }
}
