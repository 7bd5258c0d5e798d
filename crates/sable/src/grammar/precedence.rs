//! Terminal precedence levels, associativity, and per-production precedence
//! symbol selection for LR conflict resolution.

use hashbrown::HashMap;

use crate::grammar::Production;
use crate::intern::SymbolType;

/// How equal-precedence shift/reduce conflicts resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    /// Prefer the reduction (`a + b + c` groups as `(a + b) + c`).
    Left,
    /// Prefer the shift (`a = b = c` groups as `a = (b = c)`).
    Right,
    /// Equal precedence stays an unresolved conflict.
    NonAssociative,
}

/// How a production picks the terminal whose precedence stands in for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductionPrecedence {
    /// Productions have no precedence symbol; conflicts stay unresolved.
    #[default]
    None,
    /// The leftmost terminal of the right-hand side.
    LeftmostTerminal,
}

/// Precedence and associativity assignments for a grammar's terminals.
///
/// Levels are declared binding-tightest first; every symbol in one level
/// shares a precedence and an associativity. Symbols outside every level
/// have no precedence, which leaves conflicts involving them unresolved.
#[derive(Debug, Clone, Default)]
pub struct PrecedenceTable {
    precedence: HashMap<SymbolType, u32>,
    associativity: HashMap<SymbolType, Associativity>,
    production_precedence: ProductionPrecedence,
    overrides: HashMap<Production, SymbolType>,
}

impl PrecedenceTable {
    /// Builds a table from ordered levels, the tightest-binding level first.
    ///
    /// # Panics
    ///
    /// Panics if a symbol appears in two levels.
    #[must_use]
    pub fn new(
        levels: &[(&[SymbolType], Associativity)],
        production_precedence: ProductionPrecedence,
    ) -> Self {
        let mut precedence = HashMap::new();
        let mut associativity = HashMap::new();
        let mut rank = levels.len() as u32;
        for (symbols, assoc) in levels {
            for &symbol in *symbols {
                assert!(
                    precedence.insert(symbol, rank).is_none(),
                    "symbol {symbol} appears in two precedence levels",
                );
                associativity.insert(symbol, *assoc);
            }
            rank -= 1;
        }
        Self {
            precedence,
            associativity,
            production_precedence,
            overrides: HashMap::new(),
        }
    }

    /// Pins `production`'s precedence symbol explicitly, overriding the
    /// [`ProductionPrecedence`] policy.
    #[must_use]
    pub fn with_override(mut self, production: Production, symbol: SymbolType) -> Self {
        self.overrides.insert(production, symbol);
        self
    }

    /// The precedence rank of `symbol`; higher binds tighter. `None` when the
    /// symbol is in no level.
    #[must_use]
    pub fn precedence_of(&self, symbol: SymbolType) -> Option<u32> {
        self.precedence.get(&symbol).copied()
    }

    /// The associativity of `symbol`; non-associative when undeclared.
    #[must_use]
    pub fn associativity_of(&self, symbol: SymbolType) -> Associativity {
        self.associativity
            .get(&symbol)
            .copied()
            .unwrap_or(Associativity::NonAssociative)
    }

    /// The terminal whose precedence stands in for `production`, if any.
    #[must_use]
    pub fn precedence_symbol_for(&self, production: &Production) -> Option<SymbolType> {
        if let Some(&symbol) = self.overrides.get(production) {
            return Some(symbol);
        }
        match self.production_precedence {
            ProductionPrecedence::None => None,
            ProductionPrecedence::LeftmostTerminal => production.leftmost_terminal(),
        }
    }
}
