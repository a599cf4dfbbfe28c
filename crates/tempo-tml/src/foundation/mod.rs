//! Foundation types shared across the crate: source locations and the
//! type system.

pub mod span;
pub mod types;

pub use span::{SourceFile, SourceMap, Span};
pub use types::{Type, TypeKind};
