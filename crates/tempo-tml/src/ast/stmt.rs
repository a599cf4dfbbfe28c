//! Function-body statements.
//!
//! A closed statement enum; each analysis over statements is a single
//! recursive match rather than an open visitor hierarchy.

use crate::ast::expr::Expr;
use crate::ast::symbols::{Frame, Symbol};
use crate::ast::system::Variable;
use serde::{Deserialize, Serialize};

/// A block: one scope frame, the local variables declared in it (with their
/// initialisers) and the contained statements. Function bodies are blocks
/// whose frame starts with the parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub frame: Frame,
    pub decls: Vec<Variable>,
    pub stats: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Empty,
    Expr(Expr),
    Assert(Expr),
    For {
        init: Expr,
        cond: Expr,
        step: Expr,
        body: Box<Statement>,
    },
    /// `for (x : T)` — iteration over a scalar set or integer range.
    Iteration {
        symbol: Symbol,
        frame: Frame,
        body: Box<Statement>,
    },
    While {
        cond: Expr,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        cond: Expr,
    },
    Block(Block),
    /// Switch bodies behave as blocks; the arms are `Case`/`Default`.
    Switch {
        cond: Expr,
        body: Block,
    },
    Case {
        cond: Expr,
        body: Block,
    },
    Default {
        body: Block,
    },
    If {
        cond: Expr,
        then_stat: Box<Statement>,
        else_stat: Option<Box<Statement>>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
}

impl Block {
    /// Apply `f` to every expression in the block, including the local
    /// variable initialisers.
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        for var in &self.decls {
            if let Some(init) = &var.init {
                f(init);
            }
        }
        for stat in &self.stats {
            stat.for_each_expr(f);
        }
    }

    /// Collect every symbol declared anywhere in the block, nested scopes
    /// included.
    pub fn declared_symbols(&self, out: &mut indexmap::IndexSet<Symbol>) {
        out.extend(self.frame.iter().cloned());
        for stat in &self.stats {
            stat.declared_symbols(out);
        }
    }
}

impl Statement {
    /// Apply `f` to every expression contained in this statement.
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Statement::Empty | Statement::Break | Statement::Continue => {}
            Statement::Expr(e) | Statement::Assert(e) => f(e),
            Statement::For {
                init,
                cond,
                step,
                body,
            } => {
                f(init);
                f(cond);
                f(step);
                body.for_each_expr(f);
            }
            Statement::Iteration { body, .. } => body.for_each_expr(f),
            Statement::While { cond, body } | Statement::DoWhile { body, cond } => {
                f(cond);
                body.for_each_expr(f);
            }
            Statement::Block(block) => block.for_each_expr(f),
            Statement::Switch { cond, body } | Statement::Case { cond, body } => {
                f(cond);
                body.for_each_expr(f);
            }
            Statement::Default { body } => body.for_each_expr(f),
            Statement::If {
                cond,
                then_stat,
                else_stat,
            } => {
                f(cond);
                then_stat.for_each_expr(f);
                if let Some(else_stat) = else_stat {
                    else_stat.for_each_expr(f);
                }
            }
            Statement::Return(value) => {
                if let Some(value) = value {
                    f(value);
                }
            }
        }
    }

    /// Collect every symbol declared in this statement's scopes.
    pub fn declared_symbols(&self, out: &mut indexmap::IndexSet<Symbol>) {
        match self {
            Statement::Iteration { symbol, body, .. } => {
                out.insert(symbol.clone());
                body.declared_symbols(out);
            }
            Statement::Block(block) => block.declared_symbols(out),
            Statement::Switch { body, .. }
            | Statement::Case { body, .. }
            | Statement::Default { body } => body.declared_symbols(out),
            Statement::For { body, .. }
            | Statement::While { body, .. }
            | Statement::DoWhile { body, .. } => body.declared_symbols(out),
            Statement::If {
                then_stat,
                else_stat,
                ..
            } => {
                then_stat.declared_symbols(out);
                if let Some(else_stat) = else_stat {
                    else_stat.declared_symbols(out);
                }
            }
            _ => {}
        }
    }

    /// True if this statement returns on every path.
    ///
    /// Deliberately conservative: conditional loops and switches never
    /// count as returning (only a do-while runs its body unconditionally),
    /// and an `if` without an `else` does not either.
    pub fn returns(&self) -> bool {
        match self {
            Statement::Return(_) => true,
            Statement::Block(block) => block.stats.last().is_some_and(Statement::returns),
            Statement::DoWhile { body, .. } => body.returns(),
            Statement::If {
                then_stat,
                else_stat,
                ..
            } => {
                then_stat.returns()
                    && else_stat.as_ref().is_some_and(|else_stat| else_stat.returns())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Span;

    fn ret() -> Statement {
        Statement::Return(None)
    }

    #[test]
    fn test_if_without_else_does_not_return() {
        let stat = Statement::If {
            cond: Expr::bool_constant(true, Span::default()),
            then_stat: Box::new(ret()),
            else_stat: None,
        };
        assert!(!stat.returns());
    }

    #[test]
    fn test_if_with_both_branches_returns() {
        let stat = Statement::If {
            cond: Expr::bool_constant(true, Span::default()),
            then_stat: Box::new(ret()),
            else_stat: Some(Box::new(ret())),
        };
        assert!(stat.returns());
    }

    #[test]
    fn test_block_returns_via_last_statement() {
        let block = Block {
            stats: vec![Statement::Empty, ret()],
            ..Block::default()
        };
        assert!(Statement::Block(block).returns());
        assert!(!Statement::Block(Block::default()).returns());
    }

    #[test]
    fn test_loop_return_analysis() {
        let span = Span::default();
        let while_stat = Statement::While {
            cond: Expr::bool_constant(true, span),
            body: Box::new(ret()),
        };
        assert!(!while_stat.returns());

        let do_while = Statement::DoWhile {
            body: Box::new(ret()),
            cond: Expr::bool_constant(false, span),
        };
        assert!(do_while.returns(), "a do-while body always runs once");
    }
}
