//! The abstract syntax model consumed by the checker: expressions,
//! statements, symbols and scopes, and the system container.

pub mod expr;
pub mod stmt;
pub mod symbols;
pub mod system;

pub use expr::{EffectRegistry, Expr, ExprKind, FnEffects, SyncFlavor, Value};
pub use stmt::{Block, Statement};
pub use symbols::{Frame, Symbol};
pub use system::{
    ChanPriority, Condition, Decl, Declarations, Edge, Function, GanttChart, GanttMap, Instance,
    IoDecl, Message, ProgressMeasure, State, SyncUsage, System, SystemFacts, Template, Update,
    Variable,
};
