//! # Backtracking Recursive Descent
//!
//! Top-down parsing without LL(1) restrictions.
//!
//! ## Overview
//!
//! Generation builds an LL-style prediction table but keeps every production
//! that could start with a given lookahead, trying them in declaration order
//! with full backtracking. Left recursion is tamed by a static analysis plus
//! a dynamic ban: the analyzer marks each production position through which
//! expansion could reproduce a same-or-lower-precedence production at the
//! same input offset, and descending through a marked position pushes a scope
//! that bans such candidates until the input advances. Within one
//! non-terminal, a later-declared production binds tighter; a leading
//! position admits only strictly tighter candidates while a trailing
//! position also admits equally tight ones, which is what makes
//! `E -> E + E | x` terminate with a right-nested tree.
//!
//! Backtracking revisits (non-terminal, offset) pairs constantly, so results
//! are memoized in a fixed-size direct-mapped cache keyed by offset and the
//! version of the innermost ban scope. All of this is per-run state carried
//! in an explicit parse instance; the generated parser itself is immutable
//! and reusable.


use hashbrown::{HashMap, HashSet};

use crate::grammar::{Grammar, Production};
use crate::intern::SymbolType;
use crate::parser::{GeneratorResult, ParseError, ParseOutcome, Parser, ParserGenerator};
use crate::symbol::Symbol;

const MEMO_SIZE: usize = 1024;

/// What a ban scope admits at its input offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Unrestricted position; no scope is pushed.
    None,
    /// Leading position: only tighter-binding candidates.
    AllowGreaterPrecedence,
    /// Trailing position: equally tight candidates stay admissible, giving
    /// right-nested chains of one production.
    AllowGreaterOrEqualPrecedence,
}

/// Generator for the backtracking recursive-descent strategy. Never reports
/// conflicts: ambiguity is resolved by declaration order at parse time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveDescentGenerator;

impl ParserGenerator for RecursiveDescentGenerator {
    fn generate(&self, grammar: &Grammar) -> GeneratorResult {
        GeneratorResult {
            conflicts: Vec::new(),
            warnings: Vec::new(),
            parser: Some(Box::new(RecursiveDescentParser::new(grammar))),
        }
    }
}

struct RecursiveDescentParser {
    start: SymbolType,
    productions: Vec<Production>,
    /// token type -> non-terminal -> candidate production indices, in
    /// declaration order.
    prediction: HashMap<SymbolType, HashMap<SymbolType, Vec<u32>>>,
    /// Per production, per right-hand-side position: the ban rule, or
    /// [`Rule::None`] where descent needs no scope.
    rules: Vec<Vec<Rule>>,
}

impl RecursiveDescentParser {
    fn new(grammar: &Grammar) -> Self {
        let nff = grammar.nff();
        let mut prediction: HashMap<SymbolType, HashMap<SymbolType, Vec<u32>>> = HashMap::new();
        let mut add = |token: SymbolType, lhs: SymbolType, index: u32| {
            let candidates = prediction
                .entry(token)
                .or_default()
                .entry(lhs)
                .or_default();
            if !candidates.contains(&index) {
                candidates.push(index);
            }
        };

        for (index, production) in grammar.productions().iter().enumerate() {
            let index = index as u32;
            if production.rhs().is_empty() {
                // deriving nothing is an option under any lookahead
                for &token in grammar.terminal_types() {
                    add(token, production.lhs(), index);
                }
                continue;
            }
            for token in nff.first_of_sequence(production.rhs()) {
                add(token, production.lhs(), index);
            }
            if nff.all_nullable(production.rhs()) {
                for &token in nff.follow(production.lhs()) {
                    add(token, production.lhs(), index);
                }
            }
        }

        Self {
            start: grammar.start_symbol(),
            productions: grammar.productions().to_vec(),
            prediction,
            rules: analyze(grammar),
        }
    }

    /// Whether `current` may be attempted under a scope pushed for `other`.
    /// Later declaration means tighter binding; renames are transparent, and
    /// the comparison only applies within one non-terminal, the only place
    /// declaration order ranks anything.
    fn allow(&self, current: u32, rule: Rule, other: u32) -> bool {
        let current_production = &self.productions[current as usize];
        if current_production.is_rename() {
            return true;
        }
        if current_production.lhs() != self.productions[other as usize].lhs() {
            return true;
        }
        match rule {
            Rule::AllowGreaterPrecedence => current > other,
            Rule::AllowGreaterOrEqualPrecedence => current >= other,
            Rule::None => true,
        }
    }
}

/// Computes the per-position ban rules. A position needs one exactly when it
/// is leading or trailing (reachable through the nullable prefix or suffix)
/// and expanding it can reproduce a production that does not bind tighter
/// than the one being analyzed.
fn analyze(grammar: &Grammar) -> Vec<Vec<Rule>> {
    let nff = grammar.nff();
    let productions = grammar.productions();
    let mut initial_cache: HashMap<SymbolType, HashSet<u32>> = HashMap::new();
    let mut rules = Vec::with_capacity(productions.len());

    for (index, production) in productions.iter().enumerate() {
        let mut position_rules = vec![Rule::None; production.rhs().len()];
        if production.is_rename() {
            rules.push(position_rules);
            continue;
        }

        let (leading, trailing) = boundary_positions(production, nff);
        for (i, &child) in production.rhs().iter().enumerate() {
            if !leading[i] && !trailing[i] {
                continue;
            }
            let initial = initial_cache.entry(child).or_insert_with(|| {
                let mut set = HashSet::new();
                gather_initial(grammar, child, &mut set);
                set
            });
            for &other in initial.iter() {
                if productions[other as usize].is_rename() {
                    continue;
                }
                if leading[i] {
                    if other <= index as u32 {
                        position_rules[i] = Rule::AllowGreaterPrecedence;
                        break;
                    }
                } else if other < index as u32 {
                    position_rules[i] = Rule::AllowGreaterOrEqualPrecedence;
                    break;
                }
            }
        }
        rules.push(position_rules);
    }
    rules
}

/// Marks the positions reachable as the first or last consumed symbol:
/// the nullable prefix plus the first non-nullable symbol, and symmetrically
/// from the end.
fn boundary_positions(
    production: &Production,
    nff: &crate::grammar::NullableFirstFollow,
) -> (Vec<bool>, Vec<bool>) {
    let rhs = production.rhs();
    let mut leading = vec![false; rhs.len()];
    for (i, &ty) in rhs.iter().enumerate() {
        leading[i] = true;
        if !nff.is_nullable(ty) {
            break;
        }
    }
    let mut trailing = vec![false; rhs.len()];
    for (i, &ty) in rhs.iter().enumerate().rev() {
        trailing[i] = true;
        if !nff.is_nullable(ty) {
            break;
        }
    }
    (leading, trailing)
}

/// Productions reachable as the first expansion step of `ty`, descending
/// through nullable prefixes.
fn gather_initial(grammar: &Grammar, ty: SymbolType, result: &mut HashSet<u32>) {
    if ty.is_terminal() {
        return;
    }
    for &index in grammar.productions_for(ty) {
        if !result.insert(index as u32) {
            // this non-terminal's expansions were already gathered
            return;
        }
        for &child in grammar.production(index).rhs() {
            gather_initial(grammar, child, result);
            if !grammar.nff().is_nullable(child) {
                break;
            }
        }
    }
}

/// One active ban: descending through a marked position of `production`
/// at `token_index`.
#[derive(Debug, Clone, Copy)]
struct Scope {
    token_index: usize,
    production: u32,
    rule: Rule,
    version: u32,
}

/// The scope stack, with slot reuse: the version only advances when a slot's
/// content actually changes, so identical re-descents during backtracking
/// keep their memo entries valid.
#[derive(Debug, Default)]
struct ScopeStack {
    slots: Vec<Scope>,
    depth: usize,
    version: u32,
}

impl ScopeStack {
    fn push(&mut self, token_index: usize, production: u32, rule: Rule) {
        if self.depth == self.slots.len() {
            self.slots.push(Scope {
                token_index: usize::MAX,
                production: u32::MAX,
                rule: Rule::None,
                version: 0,
            });
        }
        let slot = &mut self.slots[self.depth];
        if slot.token_index != token_index || slot.production != production || slot.rule != rule {
            self.version += 1;
            slot.version = self.version;
        }
        slot.token_index = token_index;
        slot.production = production;
        slot.rule = rule;
        self.depth += 1;
    }

    fn pop(&mut self) {
        self.depth -= 1;
    }

    fn active(&self) -> &[Scope] {
        &self.slots[..self.depth]
    }

    /// The memo key component identifying the current ban context.
    fn cache_version(&self) -> u32 {
        self.active().last().map_or(0, |scope| scope.version)
    }
}

#[derive(Debug, Clone)]
struct MemoEntry {
    ty: SymbolType,
    token_index: usize,
    version: u32,
    /// `None` records a failed derivation; failures are worth caching too.
    result: Option<Symbol>,
    next_index: usize,
}

/// Fixed-size direct-mapped memo; collisions simply overwrite.
struct Memo {
    entries: Vec<Option<MemoEntry>>,
    hasher: ahash::RandomState,
}

impl Memo {
    fn new() -> Self {
        Self {
            entries: vec![None; MEMO_SIZE],
            hasher: ahash::RandomState::new(),
        }
    }

    fn slot(&self, ty: SymbolType, token_index: usize, version: u32) -> usize {
        self.hasher.hash_one((ty, token_index, version)) as usize & (MEMO_SIZE - 1)
    }

    fn get(&self, ty: SymbolType, token_index: usize, version: u32) -> Option<&MemoEntry> {
        let entry = self.entries[self.slot(ty, token_index, version)].as_ref()?;
        (entry.ty == ty && entry.token_index == token_index && entry.version == version)
            .then_some(entry)
    }

    fn put(
        &mut self,
        ty: SymbolType,
        token_index: usize,
        version: u32,
        result: Option<Symbol>,
        next_index: usize,
    ) {
        let slot = self.slot(ty, token_index, version);
        self.entries[slot] = Some(MemoEntry {
            ty,
            token_index,
            version,
            result,
            next_index,
        });
    }
}

/// Per-run mutable state; built fresh for every [`Parser::parse`] call.
struct Instance<'p> {
    parser: &'p RecursiveDescentParser,
    tokens: Vec<Symbol>,
    position: usize,
    scopes: ScopeStack,
    memo: Memo,
}

impl Instance<'_> {
    fn try_parse(&mut self, ty: SymbolType) -> Option<Symbol> {
        let start = self.position;
        let version = self.scopes.cache_version();
        if let Some(entry) = self.memo.get(ty, start, version) {
            self.position = entry.next_index;
            return entry.result.clone();
        }

        let parser = self.parser;
        let token = self.tokens.get(start)?;
        let candidates: &[u32] = parser
            .prediction
            .get(&token.ty())
            .and_then(|by_lhs| by_lhs.get(&ty))
            .map_or(&[], Vec::as_slice);

        for &index in candidates {
            if !self.allowed(index, start) {
                continue;
            }
            match self.try_production(index) {
                Some(parsed) => {
                    self.memo
                        .put(ty, start, version, Some(parsed.clone()), self.position);
                    return Some(parsed);
                }
                None => self.position = start,
            }
        }

        self.memo.put(ty, start, version, None, start);
        None
    }

    fn try_production(&mut self, index: u32) -> Option<Symbol> {
        let parser = self.parser;
        let production = &parser.productions[index as usize];
        let rules = &parser.rules[index as usize];

        let mut children = Vec::with_capacity(production.rhs().len());
        for (i, &child) in production.rhs().iter().enumerate() {
            if child.is_terminal() {
                let token = self.tokens.get(self.position)?;
                if token.ty() != child {
                    return None;
                }
                children.push(token.clone());
                self.position += 1;
            } else {
                let rule = rules[i];
                let scoped = rule != Rule::None;
                if scoped {
                    self.scopes.push(self.position, index, rule);
                }
                let parsed = self.try_parse(child);
                if scoped {
                    self.scopes.pop();
                }
                children.push(parsed?);
            }
        }
        Some(Symbol::node(production.lhs(), children))
    }

    /// A candidate is banned if any enclosing scope at the same input offset
    /// disallows it.
    fn allowed(&self, production: u32, token_index: usize) -> bool {
        for scope in self.scopes.active().iter().rev() {
            if scope.token_index != token_index {
                break;
            }
            if !self.parser.allow(production, scope.rule, scope.production) {
                return false;
            }
        }
        true
    }
}

impl Parser for RecursiveDescentParser {
    fn parse(&self, tokens: &mut dyn Iterator<Item = Symbol>) -> ParseOutcome {
        let mut instance = Instance {
            parser: self,
            tokens: tokens.collect(),
            position: 0,
            scopes: ScopeStack::default(),
            memo: Memo::new(),
        };
        match instance.try_parse(self.start) {
            Some(tree) => ParseOutcome::success(tree),
            None => ParseOutcome::failure(vec![ParseError::NoDerivation {
                start: self.start.to_string(),
            }]),
        }
    }
}
