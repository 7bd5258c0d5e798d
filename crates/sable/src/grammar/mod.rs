//! # Grammar Model
//!
//! Productions, fully-specified grammars, and the derived analyses parser
//! generation consumes.
//!
//! ## Overview
//!
//! A [`Production`] maps a non-terminal to an ordered right-hand side. A
//! [`Grammar`] freezes a declared-order production list, augments it with
//! `START -> S EOF`, and derives the [nullable/first/follow
//! sets](analysis::NullableFirstFollow), the terminal/non-terminal type sets,
//! and a by-left-hand-side index. Declaration order is meaningful: the
//! recursive-descent generator derives production precedence from it, and the
//! lexer-facing tie-breaks elsewhere in the crate follow the same rule.
//!
//! [`PrecedenceTable`](precedence::PrecedenceTable) carries the explicit
//! terminal precedence/associativity levels the LR family resolves conflicts
//! with, and [`ProductionSet`](builder::ProductionSet) offers checked
//! construction plus option/one-of/tuple/list sugar.

pub mod analysis;
pub mod builder;
pub mod precedence;

pub use analysis::NullableFirstFollow;
pub use builder::{ListOptions, ProductionSet};
pub use precedence::{Associativity, PrecedenceTable, ProductionPrecedence};

use std::collections::BTreeSet;
use std::fmt;

use hashbrown::HashMap;

use crate::intern::{Context, SymbolType};

/// A single grammar rule: `lhs -> rhs[0] rhs[1] ...`.
///
/// Value-equal and hashable; an empty `rhs` derives the empty string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Production {
    lhs: SymbolType,
    rhs: Vec<SymbolType>,
}

impl Production {
    /// # Panics
    ///
    /// Panics if `lhs` is a terminal.
    #[must_use]
    pub fn new(lhs: SymbolType, rhs: Vec<SymbolType>) -> Self {
        assert!(
            !lhs.is_terminal(),
            "production left-hand side must be a non-terminal: {lhs}",
        );
        Self { lhs, rhs }
    }

    #[must_use]
    pub fn lhs(&self) -> SymbolType {
        self.lhs
    }

    #[must_use]
    pub fn rhs(&self) -> &[SymbolType] {
        &self.rhs
    }

    /// The leftmost terminal on the right-hand side, if any. This is the
    /// default precedence symbol of the production.
    #[must_use]
    pub fn leftmost_terminal(&self) -> Option<SymbolType> {
        self.rhs.iter().copied().find(SymbolType::is_terminal)
    }

    /// `true` for single-symbol non-terminal right-hand sides (`A -> B`),
    /// which the recursive-descent precedence analysis treats as transparent.
    #[must_use]
    pub fn is_rename(&self) -> bool {
        self.rhs.len() == 1 && !self.rhs[0].is_terminal()
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        if self.rhs.is_empty() {
            f.write_str(" <empty>")?;
        }
        for ty in &self.rhs {
            write!(f, " {ty}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A fully-specified grammar, frozen at construction.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    start: SymbolType,
    eof: SymbolType,
    productions: Vec<Production>,
    augmented: usize,
    by_lhs: HashMap<SymbolType, Vec<usize>>,
    terminals: BTreeSet<SymbolType>,
    non_terminals: BTreeSet<SymbolType>,
    nff: NullableFirstFollow,
    precedence: PrecedenceTable,
}

impl Grammar {
    /// Builds a grammar from declared-order productions.
    ///
    /// The production list is augmented with `START -> start EOF`; the
    /// augmented production participates in the derived analyses (giving the
    /// start symbol `EOF` in its follow set) and sits at the end of the list
    /// so declaration-order precedence is undisturbed.
    #[must_use]
    pub fn new(
        context: &Context,
        name: impl Into<String>,
        start: SymbolType,
        productions: Vec<Production>,
        precedence: PrecedenceTable,
    ) -> Self {
        let mut productions = productions;
        productions.push(Production::new(
            context.start_type(),
            vec![start, context.eof_type()],
        ));
        let augmented = productions.len() - 1;

        let mut by_lhs: HashMap<SymbolType, Vec<usize>> = HashMap::new();
        for (i, production) in productions.iter().enumerate() {
            by_lhs.entry(production.lhs()).or_default().push(i);
        }

        let mut terminals = BTreeSet::new();
        let mut non_terminals = BTreeSet::new();
        for production in &productions {
            non_terminals.insert(production.lhs());
            for &ty in production.rhs() {
                if ty.is_terminal() {
                    terminals.insert(ty);
                } else {
                    non_terminals.insert(ty);
                }
            }
        }

        let nff = NullableFirstFollow::compute(&productions);

        Self {
            name: name.into(),
            start,
            eof: context.eof_type(),
            productions,
            augmented,
            by_lhs,
            terminals,
            non_terminals,
            nff,
            precedence,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The user-declared start symbol (not the augmentation non-terminal).
    #[must_use]
    pub fn start_symbol(&self) -> SymbolType {
        self.start
    }

    #[must_use]
    pub fn eof_type(&self) -> SymbolType {
        self.eof
    }

    /// All productions in declaration order, the augmented production last.
    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    #[must_use]
    pub fn production(&self, index: usize) -> &Production {
        &self.productions[index]
    }

    /// Index of the augmented `START -> start EOF` production.
    #[must_use]
    pub fn augmented_production(&self) -> usize {
        self.augmented
    }

    /// Indices of the productions for `lhs`, in declaration order.
    #[must_use]
    pub fn productions_for(&self, lhs: SymbolType) -> &[usize] {
        self.by_lhs.get(&lhs).map_or(&[], Vec::as_slice)
    }

    /// Every terminal mentioned by any production (`EOF` included, via the
    /// augmentation).
    #[must_use]
    pub fn terminal_types(&self) -> &BTreeSet<SymbolType> {
        &self.terminals
    }

    #[must_use]
    pub fn non_terminal_types(&self) -> &BTreeSet<SymbolType> {
        &self.non_terminals
    }

    /// The derived nullable/first/follow analyses.
    #[must_use]
    pub fn nff(&self) -> &NullableFirstFollow {
        &self.nff
    }

    #[must_use]
    pub fn precedence(&self) -> &PrecedenceTable {
        &self.precedence
    }
}

impl fmt::Display for Grammar {
    /// Yacc-like rendering, one left-hand side per block.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grammar {}", self.name)?;
        for &lhs in &self.non_terminals {
            let indices = self.productions_for(lhs);
            if indices.is_empty() {
                continue;
            }
            writeln!(f, "{lhs}:")?;
            for (i, &index) in indices.iter().enumerate() {
                let sep = if i == 0 { ' ' } else { '|' };
                write!(f, "\t{sep}")?;
                for ty in self.productions[index].rhs() {
                    write!(f, " {ty}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn augmentation_gives_start_symbol_eof_in_follow() {
        let mut ctx = Context::new();
        let x = ctx.terminal("x");
        let s = ctx.non_terminal("S");
        let grammar = Grammar::new(
            &ctx,
            "test",
            s,
            vec![Production::new(s, vec![x])],
            PrecedenceTable::default(),
        );

        assert_eq!(grammar.productions().len(), 2);
        let augmented = grammar.production(grammar.augmented_production());
        assert_eq!(augmented.lhs(), ctx.start_type());
        assert!(grammar.nff().follow(s).contains(&ctx.eof_type()));
        assert!(grammar.terminal_types().contains(&ctx.eof_type()));
    }

    #[test]
    fn leftmost_terminal_and_rename() {
        let mut ctx = Context::new();
        let plus = ctx.terminal("+");
        let e = ctx.non_terminal("E");
        let t = ctx.non_terminal("T");

        let production = Production::new(e, vec![e, plus, t]);
        assert_eq!(production.leftmost_terminal(), Some(plus));
        assert!(!production.is_rename());
        assert!(Production::new(e, vec![t]).is_rename());
        assert_eq!(Production::new(e, vec![]).leftmost_terminal(), None);
    }
}
