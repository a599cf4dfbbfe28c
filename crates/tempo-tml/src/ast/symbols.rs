//! Symbols and frames.
//!
//! A `Symbol` is a named, typed declaration. Symbols have *identity*: two
//! symbols compare equal only if they are the same declaration, regardless
//! of name or type. A `Frame` is one lexical scope — an ordered set of
//! symbols addressable by name or position.

use crate::foundation::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Debug, Serialize, Deserialize)]
struct SymbolData {
    name: String,
    ty: Type,
}

/// A named, typed entity with identity semantics.
#[derive(Clone, Serialize, Deserialize)]
pub struct Symbol {
    data: Rc<SymbolData>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: Type) -> Symbol {
        Symbol {
            data: Rc::new(SymbolData {
                name: name.into(),
                ty,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn ty(&self) -> &Type {
        &self.data.ty
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.data) as usize).hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.data.name)
    }
}

/// An ordered, name-addressable set of symbols — one lexical scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    symbols: IndexMap<String, Symbol>,
}

impl Frame {
    pub fn new() -> Frame {
        Frame::default()
    }

    /// Add a symbol; later declarations shadow earlier ones of the same name.
    pub fn add(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name().to_string(), symbol);
    }

    /// Declare a fresh symbol in this frame and return it.
    pub fn declare(&mut self, name: impl Into<String>, ty: Type) -> Symbol {
        let symbol = Symbol::new(name, ty);
        self.add(symbol.clone());
        symbol
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol at declaration position `i`.
    pub fn get(&self, i: usize) -> &Symbol {
        self.symbols
            .get_index(i)
            .map(|(_, s)| s)
            .expect("frame index out of bounds")
    }

    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::TypeKind;

    #[test]
    fn test_symbol_identity() {
        let a = Symbol::new("x", Type::primitive(TypeKind::Int));
        let b = Symbol::new("x", Type::primitive(TypeKind::Int));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_frame_order_and_lookup() {
        let mut frame = Frame::new();
        let n = frame.declare("n", Type::primitive(TypeKind::Int));
        let x = frame.declare("x", Type::primitive(TypeKind::Clock));
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(0), &n);
        assert_eq!(frame.get(1), &x);
        assert_eq!(frame.resolve("x"), Some(&x));
        assert_eq!(frame.resolve("missing"), None);
    }
}
