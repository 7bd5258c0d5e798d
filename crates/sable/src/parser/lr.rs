//! # LR Parser Family
//!
//! Table-driven bottom-up parsing in four strengths.
//!
//! ## Overview
//!
//! One generator covers LR(0), SLR(1), LR(1), and LALR(1); the flavor only
//! decides how items carry lookahead and which lookaheads guard reductions:
//!
//! - LR(0): items have no lookahead, completed items reduce on everything
//! - SLR(1): LR(0) items, reductions guarded by the left-hand side's follow
//!   set
//! - LR(1): items carry one lookahead symbol computed through closure
//! - LALR(1): the LR(1) automaton with lookahead-erased-equal state cores
//!   merged
//!
//! Construction closes item sets over a worklist, then flattens the automaton
//! into a shift/goto/reduce table. A shift/reduce collision is resolved
//! through the grammar's [`PrecedenceTable`](crate::grammar::PrecedenceTable)
//! when both sides have a precedence, and is reported as a
//! [`Conflict`](crate::parser::Conflict) otherwise; reduce/reduce collisions
//! are always conflicts. The raw [`LrAutomaton`] stays inspectable for
//! diagnostics and tests.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::grammar::{Associativity, Grammar};
use crate::intern::SymbolType;
use crate::parser::{Conflict, GeneratorResult, ParseError, ParseOutcome, Parser, ParserGenerator};
use crate::symbol::Symbol;

/// One dotted production, optionally with a lookahead symbol. LR(0)/SLR(1)
/// items leave `lookahead` unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
    /// Index into the grammar's production list.
    pub production: u32,
    /// Number of right-hand-side symbols already matched.
    pub dot: u32,
    pub lookahead: Option<SymbolType>,
}

/// The item-set automaton, exposed for diagnostics and tests.
#[derive(Debug, Clone)]
pub struct LrAutomaton {
    states: Vec<BTreeSet<Item>>,
    edges: HashMap<(u32, SymbolType), u32>,
    /// `(state, lookahead, production)`; a `None` lookahead reduces on every
    /// terminal.
    reductions: BTreeSet<(u32, Option<SymbolType>, u32)>,
}

impl LrAutomaton {
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn states(&self) -> &[BTreeSet<Item>] {
        &self.states
    }

    /// The successor of `state` on `symbol`, if any.
    #[must_use]
    pub fn edge(&self, state: u32, symbol: SymbolType) -> Option<u32> {
        self.edges.get(&(state, symbol)).copied()
    }

    #[must_use]
    pub fn reductions(&self) -> &BTreeSet<(u32, Option<SymbolType>, u32)> {
        &self.reductions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LrFlavor {
    Lr0,
    Slr,
    Lr1,
    Lalr,
}

impl LrFlavor {
    fn tracks_lookahead(self) -> bool {
        matches!(self, Self::Lr1 | Self::Lalr)
    }
}

/// Generator for the LR family. Pick a strength via the constructors.
#[derive(Debug, Clone, Copy)]
pub struct LrGenerator {
    flavor: LrFlavor,
}

impl LrGenerator {
    #[must_use]
    pub fn lr0() -> Self {
        Self {
            flavor: LrFlavor::Lr0,
        }
    }

    #[must_use]
    pub fn slr() -> Self {
        Self {
            flavor: LrFlavor::Slr,
        }
    }

    #[must_use]
    pub fn lr1() -> Self {
        Self {
            flavor: LrFlavor::Lr1,
        }
    }

    #[must_use]
    pub fn lalr() -> Self {
        Self {
            flavor: LrFlavor::Lalr,
        }
    }

    /// Builds the item-set automaton without flattening it into a table.
    #[must_use]
    pub fn automaton(&self, grammar: &Grammar) -> LrAutomaton {
        let mut automaton = self.build_states(grammar);
        if self.flavor == LrFlavor::Lalr {
            automaton = merge_cores(automaton);
        }
        automaton.reductions = self.reductions(grammar, &automaton.states);
        automaton
    }

    fn build_states(&self, grammar: &Grammar) -> LrAutomaton {
        let eof = grammar.eof_type();
        let start_item = Item {
            production: grammar.augmented_production() as u32,
            dot: 0,
            lookahead: self.flavor.tracks_lookahead().then_some(eof),
        };
        let start_set = self.closure(grammar, BTreeSet::from([start_item]));

        let mut states = vec![start_set.clone()];
        let mut discovered: HashMap<BTreeSet<Item>, u32> = HashMap::new();
        discovered.insert(start_set, 0);
        let mut edges = HashMap::new();

        let mut current = 0;
        while current < states.len() {
            // kernels of the successors, grouped by transition symbol;
            // ordered so state numbering is deterministic
            let mut moves: std::collections::BTreeMap<SymbolType, BTreeSet<Item>> =
                std::collections::BTreeMap::new();
            for item in &states[current] {
                let production = grammar.production(item.production as usize);
                let Some(&next) = production.rhs().get(item.dot as usize) else {
                    continue;
                };
                if next == eof {
                    // end of input is handled by the accept action
                    continue;
                }
                moves.entry(next).or_default().insert(Item {
                    dot: item.dot + 1,
                    ..*item
                });
            }

            for (symbol, kernel) in moves {
                let successor = self.closure(grammar, kernel);
                let target = match discovered.get(&successor) {
                    Some(&target) => target,
                    None => {
                        let target = states.len() as u32;
                        discovered.insert(successor.clone(), target);
                        states.push(successor);
                        target
                    }
                };
                edges.insert((current as u32, symbol), target);
            }
            current += 1;
        }

        LrAutomaton {
            states,
            edges,
            reductions: BTreeSet::new(),
        }
    }

    /// Closes `items` over non-terminals after the dot; LR(1)-family items
    /// spawn one closure item per predicted lookahead.
    fn closure(&self, grammar: &Grammar, items: BTreeSet<Item>) -> BTreeSet<Item> {
        let nff = grammar.nff();
        let mut result = items;
        let mut queue: Vec<Item> = result.iter().copied().collect();
        while let Some(item) = queue.pop() {
            let production = grammar.production(item.production as usize);
            let Some(&next) = production.rhs().get(item.dot as usize) else {
                continue;
            };
            if next.is_terminal() {
                continue;
            }

            if self.flavor.tracks_lookahead() {
                let tail = &production.rhs()[item.dot as usize + 1..];
                let mut lookaheads = nff.first_of_sequence(tail);
                if nff.all_nullable(tail) {
                    lookaheads.extend(item.lookahead);
                }
                for &index in grammar.productions_for(next) {
                    for &lookahead in &lookaheads {
                        let predicted = Item {
                            production: index as u32,
                            dot: 0,
                            lookahead: Some(lookahead),
                        };
                        if result.insert(predicted) {
                            queue.push(predicted);
                        }
                    }
                }
            } else {
                for &index in grammar.productions_for(next) {
                    let predicted = Item {
                        production: index as u32,
                        dot: 0,
                        lookahead: None,
                    };
                    if result.insert(predicted) {
                        queue.push(predicted);
                    }
                }
            }
        }
        result
    }

    fn reductions(
        &self,
        grammar: &Grammar,
        states: &[BTreeSet<Item>],
    ) -> BTreeSet<(u32, Option<SymbolType>, u32)> {
        let augmented = grammar.augmented_production() as u32;
        let mut reductions = BTreeSet::new();
        for (index, state) in states.iter().enumerate() {
            let index = index as u32;
            for item in state {
                if item.production == augmented {
                    continue;
                }
                let production = grammar.production(item.production as usize);
                if (item.dot as usize) < production.rhs().len() {
                    continue;
                }
                match self.flavor {
                    LrFlavor::Lr0 => {
                        reductions.insert((index, None, item.production));
                    }
                    LrFlavor::Slr => {
                        for &lookahead in grammar.nff().follow(production.lhs()) {
                            reductions.insert((index, Some(lookahead), item.production));
                        }
                    }
                    LrFlavor::Lr1 | LrFlavor::Lalr => {
                        reductions.insert((index, item.lookahead, item.production));
                    }
                }
            }
        }
        reductions
    }
}

/// Merges LR(1) states whose lookahead-erased cores coincide, renumbering
/// edges onto the merged states. This is what makes LALR(1) tables small.
fn merge_cores(automaton: LrAutomaton) -> LrAutomaton {
    let core = |state: &BTreeSet<Item>| -> BTreeSet<(u32, u32)> {
        state
            .iter()
            .map(|item| (item.production, item.dot))
            .collect()
    };

    let mut merged: Vec<BTreeSet<Item>> = Vec::new();
    let mut by_core: HashMap<BTreeSet<(u32, u32)>, u32> = HashMap::new();
    let mut remap = vec![0u32; automaton.states.len()];
    for (index, state) in automaton.states.into_iter().enumerate() {
        let key = core(&state);
        match by_core.get(&key) {
            Some(&target) => {
                remap[index] = target;
                merged[target as usize].extend(state);
            }
            None => {
                let target = merged.len() as u32;
                by_core.insert(key, target);
                remap[index] = target;
                merged.push(state);
            }
        }
    }

    let mut edges = HashMap::new();
    for ((from, symbol), to) in automaton.edges {
        edges.insert((remap[from as usize], symbol), remap[to as usize]);
    }

    LrAutomaton {
        states: merged,
        edges,
        reductions: BTreeSet::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Shift(u32),
    Reduce(u32),
    Accept,
}

impl Action {
    fn describe(self, grammar: &Grammar) -> String {
        match self {
            Self::Shift(state) => format!("shift to state {state}"),
            Self::Reduce(production) => {
                format!("reduce {}", grammar.production(production as usize))
            }
            Self::Accept => "accept".to_owned(),
        }
    }
}

impl ParserGenerator for LrGenerator {
    fn generate(&self, grammar: &Grammar) -> GeneratorResult {
        let automaton = self.automaton(grammar);
        let eof = grammar.eof_type();
        let mut conflicts = Vec::new();

        let mut actions: HashMap<(u32, SymbolType), Action> = HashMap::new();
        let mut gotos: HashMap<(u32, SymbolType), u32> = HashMap::new();
        for (&(state, symbol), &target) in &automaton.edges {
            if symbol.is_terminal() {
                actions.insert((state, symbol), Action::Shift(target));
            } else {
                gotos.insert((state, symbol), target);
            }
        }

        for &(state, lookahead, production) in &automaton.reductions {
            let lookaheads: Vec<SymbolType> = match lookahead {
                Some(lookahead) => vec![lookahead],
                None => grammar.terminal_types().iter().copied().collect(),
            };
            for lookahead in lookaheads {
                insert_reduce(
                    grammar,
                    &mut actions,
                    &mut conflicts,
                    state,
                    lookahead,
                    production,
                );
            }
        }

        // accept wins over nothing: it only applies where the automaton has
        // the augmented item poised at end of input
        let augmented = grammar.augmented_production();
        let eof_dot = grammar
            .production(augmented)
            .rhs()
            .iter()
            .position(|&ty| ty == eof)
            .map_or(0, |p| p as u32);
        for (state, items) in automaton.states.iter().enumerate() {
            let accepts = items
                .iter()
                .any(|item| item.production == augmented as u32 && item.dot == eof_dot);
            if !accepts {
                continue;
            }
            match actions.get(&(state as u32, eof)) {
                None => {
                    actions.insert((state as u32, eof), Action::Accept);
                }
                Some(&existing) => conflicts.push(Conflict::Accept {
                    action: existing.describe(grammar),
                }),
            }
        }

        let parser: Option<Box<dyn Parser>> = conflicts.is_empty().then(|| {
            let productions = grammar
                .productions()
                .iter()
                .map(|p| (p.lhs(), p.rhs().len()))
                .collect();
            Box::new(LrParser {
                productions,
                actions,
                gotos,
            }) as Box<dyn Parser>
        });
        GeneratorResult {
            conflicts,
            warnings: Vec::new(),
            parser,
        }
    }
}

/// Installs one reduce action, resolving shift/reduce collisions through
/// declared precedence where possible.
fn insert_reduce(
    grammar: &Grammar,
    actions: &mut HashMap<(u32, SymbolType), Action>,
    conflicts: &mut Vec<Conflict>,
    state: u32,
    lookahead: SymbolType,
    production: u32,
) {
    let Some(&existing) = actions.get(&(state, lookahead)) else {
        actions.insert((state, lookahead), Action::Reduce(production));
        return;
    };

    match existing {
        Action::Reduce(other) if other == production => {}
        Action::Reduce(other) => conflicts.push(Conflict::ReduceReduce {
            symbol: lookahead.to_string(),
            first: grammar.production(other as usize).to_string(),
            second: grammar.production(production as usize).to_string(),
        }),
        Action::Shift(_) => {
            let table = grammar.precedence();
            let shift_precedence = table.precedence_of(lookahead);
            let reduce_precedence = table
                .precedence_symbol_for(grammar.production(production as usize))
                .and_then(|symbol| table.precedence_of(symbol));
            let (Some(shift), Some(reduce)) = (shift_precedence, reduce_precedence) else {
                conflicts.push(Conflict::ShiftReduce {
                    symbol: lookahead.to_string(),
                    production: grammar.production(production as usize).to_string(),
                });
                return;
            };
            if reduce > shift {
                actions.insert((state, lookahead), Action::Reduce(production));
            } else if reduce == shift {
                match table.associativity_of(lookahead) {
                    Associativity::Left => {
                        actions.insert((state, lookahead), Action::Reduce(production));
                    }
                    Associativity::Right => {}
                    Associativity::NonAssociative => conflicts.push(Conflict::ShiftReduce {
                        symbol: lookahead.to_string(),
                        production: grammar.production(production as usize).to_string(),
                    }),
                }
            }
        }
        Action::Accept => conflicts.push(Conflict::Accept {
            action: Action::Reduce(production).describe(grammar),
        }),
    }
}

/// The table-driven shift/reduce machine all four flavors share.
struct LrParser {
    /// `(lhs, rhs length)` per production, indexed like the grammar.
    productions: Vec<(SymbolType, usize)>,
    actions: HashMap<(u32, SymbolType), Action>,
    gotos: HashMap<(u32, SymbolType), u32>,
}

impl Parser for LrParser {
    fn parse(&self, tokens: &mut dyn Iterator<Item = Symbol>) -> ParseOutcome {
        let mut tokens = tokens.peekable();
        let mut states: Vec<u32> = vec![0];
        let mut symbols: Vec<Symbol> = Vec::new();

        loop {
            let Some(token) = tokens.peek() else {
                return ParseOutcome::failure(vec![ParseError::UnexpectedEndOfInput]);
            };
            let state = *states.last().expect("the state stack is never empty");

            match self.actions.get(&(state, token.ty())) {
                Some(&Action::Shift(target)) => {
                    if let Some(token) = tokens.next() {
                        symbols.push(token);
                    }
                    states.push(target);
                }
                Some(&Action::Reduce(production)) => {
                    let (lhs, length) = self.productions[production as usize];
                    let children = symbols.split_off(symbols.len() - length);
                    states.truncate(states.len() - length);
                    let state = *states.last().expect("the state stack is never empty");
                    let target = *self
                        .gotos
                        .get(&(state, lhs))
                        .expect("a viable reduction always has a goto");
                    symbols.push(Symbol::node(lhs, children));
                    states.push(target);
                }
                Some(&Action::Accept) => {
                    return match symbols.pop() {
                        Some(tree) => ParseOutcome::success(tree),
                        None => ParseOutcome::failure(vec![ParseError::UnexpectedEndOfInput]),
                    };
                }
                None => {
                    return ParseOutcome::failure(vec![ParseError::UnexpectedToken {
                        token: token.to_string(),
                    }]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{PrecedenceTable, Production};
    use crate::intern::Context;

    fn token(ty: SymbolType, text: &str) -> Symbol {
        Symbol::leaf(ty, text, 1, 1)
    }

    /// S -> ( S ) | x, a textbook LR(0) grammar.
    #[test]
    fn lr0_nested_parens() {
        let mut ctx = Context::new();
        let lparen = ctx.terminal("(");
        let rparen = ctx.terminal(")");
        let x = ctx.terminal("x");
        let s = ctx.non_terminal("S");
        let grammar = Grammar::new(
            &ctx,
            "parens",
            s,
            vec![
                Production::new(s, vec![lparen, s, rparen]),
                Production::new(s, vec![x]),
            ],
            PrecedenceTable::default(),
        );

        let result = LrGenerator::lr0().generate(&grammar);
        assert!(result.succeeded(), "conflicts: {:?}", result.conflicts);
        let parser = result.parser().expect("generation succeeded");

        let tokens = vec![
            token(lparen, "("),
            token(lparen, "("),
            token(x, "x"),
            token(rparen, ")"),
            token(rparen, ")"),
            token(ctx.eof_type(), ""),
        ];
        let outcome = parser.parse_all(tokens);
        assert!(outcome.succeeded());
        let tree = outcome.parse_tree().expect("parse succeeded");
        assert_eq!(tree.ty(), s);
        assert_eq!(tree.children().len(), 3);

        let outcome = parser.parse_all(vec![
            token(lparen, "("),
            token(x, "x"),
            token(ctx.eof_type(), ""),
        ]);
        assert!(!outcome.succeeded());
    }

    #[test]
    fn lr1_carries_item_lookahead() {
        let mut ctx = Context::new();
        let x = ctx.terminal("x");
        let s = ctx.non_terminal("S");
        let grammar = Grammar::new(
            &ctx,
            "single",
            s,
            vec![Production::new(s, vec![x])],
            PrecedenceTable::default(),
        );

        let automaton = LrGenerator::lr1().automaton(&grammar);
        assert!(automaton
            .states()
            .iter()
            .flatten()
            .all(|item| item.lookahead.is_some()));
        // S -> x . reduces only on EOF
        let reductions: Vec<_> = automaton.reductions().iter().collect();
        assert_eq!(reductions.len(), 1);
        assert_eq!(reductions[0].1, Some(ctx.eof_type()));
    }

    #[test]
    fn lalr_merges_lr1_cores() {
        let mut ctx = Context::new();
        let a = ctx.terminal("a");
        let b = ctx.terminal("b");
        let c = ctx.terminal("c");
        let s = ctx.non_terminal("S");
        let n = ctx.non_terminal("N");
        // N appears under two different follow contexts, giving LR(1)
        // distinct lookaheads on shared cores
        let grammar = Grammar::new(
            &ctx,
            "contexts",
            s,
            vec![
                Production::new(n, vec![c]),
                Production::new(s, vec![a, n, a]),
                Production::new(s, vec![b, n, b]),
            ],
            PrecedenceTable::default(),
        );

        let lr1 = LrGenerator::lr1().automaton(&grammar);
        let lalr = LrGenerator::lalr().automaton(&grammar);
        assert!(lalr.state_count() < lr1.state_count());
        assert!(LrGenerator::lalr().generate(&grammar).succeeded());
    }
}
