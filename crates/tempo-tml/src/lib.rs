//! # Tempo Modeling Language — semantic core
//!
//! The semantic-analysis core of the TML toolchain: the abstract syntax
//! model for networks of timed automata and the type checker that validates
//! a built system.
//!
//! ## Architecture
//!
//! ```text
//! foundation  - source spans + the type system
//!     ↓
//! ast         - expressions, statements, symbols, the system container
//!     ↓
//! check       - the type checker passes
//! ```
//!
//! The lexer, parser and builder live outside this crate; they produce a
//! [`System`] which [`check_system`] validates in place. Checking attaches
//! a type to every accepted expression, decomposes state invariants into
//! residual invariant plus cost rate, reorders record initialisers into
//! field order, and accumulates diagnostics on the system — it never
//! panics and never throws.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tempo_tml::{check_system, System};
//!
//! let mut system: System = build_from_source(&sources);
//! if !check_system(&mut system) {
//!     for diag in system.errors() {
//!         eprintln!("{}", diag.message);
//!     }
//! }
//! ```

pub mod ast;
pub mod check;
pub mod error;
pub mod foundation;

pub use ast::{
    EffectRegistry, Expr, ExprKind, Frame, Statement, Symbol, SyncFlavor, SyncUsage, System,
    Template, Value,
};
pub use check::{check_system, check_system_with, TypeChecker};
pub use error::{Diagnostic, DiagnosticFormatter, Severity};
pub use foundation::{SourceMap, Span, Type, TypeKind};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
