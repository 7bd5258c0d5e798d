//! # Regex Compiler
//!
//! Compiles regex patterns into NFA fragments.
//!
//! ## Overview
//!
//! The pattern language is self-hosted: patterns are tokenized by a
//! single-character bootstrap lexer and parsed by an LALR(1) parser generated
//! from a grammar built with this crate's own machinery. Supported syntax:
//! literal characters, `\`-escapes (`\n`/`\t`/`\r` as control characters,
//! anything else literally), the `.` wildcard, grouping, left-associative
//! `|`, postfix `*`/`+`/`?`, and `[...]`/`[^...]` classes with ranges.
//!
//! ## Compilation
//!
//! [`parse`] yields the raw parse tree, [`canonicalize`] flattens its
//! linked-list repetition shapes, and [`compile`] walks the result appending
//! an NFA fragment to a caller's [`NfaBuilder`]: concatenation chains heads,
//! alternation fans out between a shared tail and head state, Kleene star is
//! an epsilon loop through its own head, `?` desugars to an alternation with
//! the empty pattern and `+` to `R R*`. A negated class complements its
//! members against the full alphabet. The fragment ends in a fresh accepting
//! state carrying the caller's value, so several compiled patterns can share
//! one builder and be disambiguated after subset construction.

use std::sync::LazyLock;

use hashbrown::HashSet;
use thiserror::Error;

use crate::automata::{NfaBuilder, StateId};
use crate::canonicalize::flatten_lists;
use crate::charset::{self, CharSet};
use crate::grammar::{Associativity, Grammar, PrecedenceTable, Production, ProductionPrecedence};
use crate::intern::{Context, SymbolType};
use crate::lexer::{CharLexerGenerator, Lexer, LexerAction, LexerGenerator};
use crate::parser::lr::LrGenerator;
use crate::parser::{ParseOutcome, Parser, ParserGenerator};
use crate::symbol::Symbol;

/// A pattern that does not belong to the regex language.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum RegexError {
    #[error("{pattern:?} is not a valid regex")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::regex::invalid_pattern)))]
    InvalidPattern { pattern: String },
}

/// Parses `pattern`; the tree is rooted at the regex-list non-terminal.
#[must_use]
pub fn parse(pattern: &str) -> ParseOutcome {
    let language = &*LANGUAGE;
    let tokens: Vec<Symbol> = language.lexer.lex(pattern).collect();
    language.parser.parse_all(tokens)
}

/// Flattens the recursive list shapes of a regex parse tree so each
/// concatenation and class is one node with flat children.
///
/// # Panics
///
/// Panics if `tree` is not rooted at the regex-list non-terminal.
#[must_use]
pub fn canonicalize(tree: &Symbol) -> Symbol {
    let language = &*LANGUAGE;
    assert!(
        tree.ty() == language.regex_list,
        "expected a regex parse tree, got {}",
        tree.ty(),
    );
    flatten_lists(tree, &language.list_types)
}

/// The grammar of the pattern language itself.
#[must_use]
pub fn grammar() -> &'static Grammar {
    &LANGUAGE.grammar
}

/// Compiles `pattern` into `builder` as a fragment running from a fresh
/// start state (returned) to a fresh accepting state carrying `value`.
pub fn compile<V>(
    builder: &mut NfaBuilder<V>,
    value: V,
    pattern: &str,
) -> Result<StateId, RegexError> {
    let Some(tree) = parse(pattern).into_parse_tree() else {
        return Err(RegexError::InvalidPattern {
            pattern: pattern.to_owned(),
        });
    };
    let tree = canonicalize(&tree);

    let language = &*LANGUAGE;
    let start = builder.add_state();
    let head = language.build_nfa(&tree, start, builder);
    let accept = builder.add_accept_state(value);
    builder.add_epsilon(head, accept);
    Ok(start)
}

static LANGUAGE: LazyLock<RegexLanguage> = LazyLock::new(RegexLanguage::build);

/// The frozen pattern language: grammar, bootstrap lexer, generated parser,
/// and the symbol types the tree walker dispatches on.
struct RegexLanguage {
    grammar: Grammar,
    lexer: Box<dyn Lexer>,
    parser: Box<dyn Parser>,
    list_types: HashSet<SymbolType>,

    kleene: SymbolType,
    or: SymbolType,
    zero_or_one: SymbolType,
    one_plus: SymbolType,
    wildcard: SymbolType,
    char_ty: SymbolType,
    regex: SymbolType,
    regex_list: SymbolType,
    escaped: SymbolType,
    range: SymbolType,
    set: SymbolType,
    set_list: SymbolType,
}

impl RegexLanguage {
    fn build() -> Self {
        let mut ctx = Context::new();
        let kleene = ctx.terminal("*");
        let or = ctx.terminal("|");
        let escape = ctx.terminal("\\");
        let lparen = ctx.terminal("(");
        let rparen = ctx.terminal(")");
        let zero_or_one = ctx.terminal("?");
        let one_plus = ctx.terminal("+");
        let range_op = ctx.terminal("-");
        let lbracket = ctx.terminal("[");
        let rbracket = ctx.terminal("]");
        let wildcard = ctx.terminal(".");
        let char_ty = ctx.terminal("CHAR");

        let regex = ctx.non_terminal("REGEX");
        let regex_list = ctx.non_terminal("REGEX_LIST");
        let escaped = ctx.non_terminal("ESCAPED");
        let range = ctx.non_terminal("RANGE");
        let set = ctx.non_terminal("SET");
        let set_list = ctx.non_terminal("SET_LIST");

        let metacharacters = [
            kleene,
            or,
            escape,
            lparen,
            rparen,
            zero_or_one,
            one_plus,
            range_op,
            lbracket,
            rbracket,
            wildcard,
        ];

        let mut productions = Vec::new();
        for meta in metacharacters {
            productions.push(Production::new(escaped, vec![escape, meta]));
        }
        productions.push(Production::new(escaped, vec![escape, char_ty]));
        productions.push(Production::new(range, vec![char_ty, range_op, char_ty]));
        productions.push(Production::new(set_list, vec![set, set_list]));
        productions.push(Production::new(set_list, vec![]));
        productions.push(Production::new(set, vec![range]));
        productions.push(Production::new(set, vec![escaped]));
        productions.push(Production::new(set, vec![char_ty]));
        productions.push(Production::new(regex_list, vec![regex, regex_list]));
        productions.push(Production::new(regex_list, vec![]));
        productions.push(Production::new(regex, vec![escaped]));
        productions.push(Production::new(regex, vec![lparen, regex_list, rparen]));
        productions.push(Production::new(regex, vec![regex, or, regex]));
        productions.push(Production::new(regex, vec![regex, kleene]));
        productions.push(Production::new(regex, vec![regex, zero_or_one]));
        productions.push(Production::new(regex, vec![regex, one_plus]));
        productions.push(Production::new(regex, vec![lbracket, set_list, rbracket]));
        productions.push(Production::new(regex, vec![wildcard]));
        productions.push(Production::new(regex, vec![char_ty]));

        let precedence = PrecedenceTable::new(
            &[
                (
                    &[kleene, zero_or_one, one_plus],
                    Associativity::NonAssociative,
                ),
                (&[or], Associativity::Left),
            ],
            ProductionPrecedence::LeftmostTerminal,
        );
        let grammar = Grammar::new(&ctx, "regex", regex_list, productions, precedence);

        let mut actions = vec![LexerAction::token("", char_ty)];
        for meta in metacharacters {
            actions.push(LexerAction::token(meta.name(), meta));
        }
        let lexer = CharLexerGenerator
            .generate(&ctx, &actions)
            .into_lexer()
            .expect("the bootstrap pattern lexer always generates");
        let parser = LrGenerator::lalr()
            .generate(&grammar)
            .into_parser()
            .expect("the pattern grammar is LALR(1)");

        Self {
            grammar,
            lexer,
            parser,
            list_types: HashSet::from([regex_list, set_list]),
            kleene,
            or,
            zero_or_one,
            one_plus,
            wildcard,
            char_ty,
            regex,
            regex_list,
            escaped,
            range,
            set,
            set_list,
        }
    }

    /// Appends the fragment for `symbol` starting at `start`, returning its
    /// head state.
    fn build_nfa<V>(
        &self,
        symbol: &Symbol,
        start: StateId,
        builder: &mut NfaBuilder<V>,
    ) -> StateId {
        let ty = symbol.ty();
        if ty == self.regex_list {
            let mut head = start;
            for child in symbol.children() {
                head = self.build_nfa(child, head, builder);
            }
            return head;
        }
        assert!(ty == self.regex, "unexpected node in a regex tree: {ty}");

        let children = symbol.children();
        match children {
            [child] if child.ty() == self.char_ty => {
                self.single_edge(CharSet::single(leaf_char(child)), start, builder)
            }
            [child] if child.ty() == self.escaped => {
                self.single_edge(CharSet::single(resolve_escape(child)), start, builder)
            }
            [child] if child.ty() == self.wildcard => {
                self.single_edge(CharSet::all(), start, builder)
            }
            [inner, op] if op.ty() == self.kleene => self.star(inner, start, builder),
            [inner, op] if op.ty() == self.zero_or_one => {
                // R? is R | <empty>
                let tail = builder.add_state();
                let head = builder.add_state();
                builder.add_epsilon(start, tail);
                let branch = self.build_nfa(inner, tail, builder);
                builder.add_epsilon(branch, head);
                builder.add_epsilon(tail, head);
                head
            }
            [inner, op] if op.ty() == self.one_plus => {
                // R+ is R R*
                let first = self.build_nfa(inner, start, builder);
                self.star(inner, first, builder)
            }
            [left, op, right] if op.ty() == self.or => {
                let tail = builder.add_state();
                let head = builder.add_state();
                builder.add_epsilon(start, tail);
                for branch in [left, right] {
                    let branch_head = self.build_nfa(branch, tail, builder);
                    builder.add_epsilon(branch_head, head);
                }
                head
            }
            [_, inner, _] if inner.ty() == self.regex_list => {
                self.build_nfa(inner, start, builder)
            }
            [_, inner, _] if inner.ty() == self.set_list => {
                let members = inner.children();
                let (negated, members) = match members.first() {
                    Some(first) if self.is_literal_caret(first) => (true, &members[1..]),
                    _ => (false, members),
                };
                let sets: Vec<CharSet> = members.iter().map(|m| self.member_set(m)).collect();
                let head = builder.add_state();
                let sets = if negated { complement(&sets) } else { sets };
                for set in sets {
                    builder.add_edge(start, set, head);
                }
                head
            }
            _ => unreachable!("regex parse trees are exhaustive"),
        }
    }

    fn single_edge<V>(
        &self,
        label: CharSet,
        start: StateId,
        builder: &mut NfaBuilder<V>,
    ) -> StateId {
        let head = builder.add_state();
        builder.add_edge(start, label, head);
        head
    }

    /// Epsilon into a fresh head, with the body looping back through it.
    fn star<V>(&self, inner: &Symbol, start: StateId, builder: &mut NfaBuilder<V>) -> StateId {
        let head = builder.add_state();
        builder.add_epsilon(start, head);
        let body = self.build_nfa(inner, head, builder);
        builder.add_epsilon(body, head);
        head
    }

    /// A leading unescaped `^` marks a negated class.
    fn is_literal_caret(&self, member: &Symbol) -> bool {
        let [child] = member.children() else {
            return false;
        };
        child.ty() == self.char_ty && leaf_char(child) == '^'
    }

    fn member_set(&self, member: &Symbol) -> CharSet {
        assert!(member.ty() == self.set, "class members are sets");
        let child = &member.children()[0];
        let ty = child.ty();
        if ty == self.char_ty {
            CharSet::single(leaf_char(child))
        } else if ty == self.escaped {
            CharSet::single(resolve_escape(child))
        } else if ty == self.range {
            CharSet::range(leaf_char(&child.children()[0]), leaf_char(&child.children()[2]))
        } else {
            unreachable!("regex parse trees are exhaustive")
        }
    }
}

fn leaf_char(symbol: &Symbol) -> char {
    symbol
        .text()
        .chars()
        .next()
        .expect("tokens carry their matched character")
}

/// `\n`, `\t`, and `\r` escape to control characters; everything else
/// escapes to itself.
fn resolve_escape(escaped: &Symbol) -> char {
    match leaf_char(&escaped.children()[1]) {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

/// Everything in the alphabet not covered by `sets`, as sorted ranges.
fn complement(sets: &[CharSet]) -> Vec<CharSet> {
    let mut intervals: Vec<(u32, u32)> = Vec::new();
    for set in sets {
        match set {
            CharSet::Range { min, max } => intervals.push((*min as u32, *max as u32)),
            CharSet::Explicit(members) => {
                intervals.extend(members.iter().map(|&c| (c as u32, c as u32)));
            }
        }
    }
    intervals.sort_unstable();

    let mut out = Vec::new();
    let mut next = 0u32;
    for (lo, hi) in intervals {
        if lo > next {
            out.extend(charset::materialize(next, lo - 1));
        }
        next = next.max(hi.saturating_add(1));
    }
    if next <= char::MAX as u32 {
        out.extend(charset::materialize(next, char::MAX as u32));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::{DfaSimulator, SimulationStatus};

    fn accepts(pattern: &str, input: &str) -> bool {
        let mut builder: NfaBuilder<u32> = NfaBuilder::new();
        compile(&mut builder, 0, pattern).expect("pattern is valid");
        let dfa = builder.build().to_dfa(&[0]);
        let mut simulator = DfaSimulator::new(&dfa);
        let mut status = SimulationStatus::Reject;
        for c in input.chars() {
            status = simulator.consume(c);
        }
        status == SimulationStatus::Accept
    }

    #[test]
    fn parse_validates_patterns() {
        assert!(parse("a|b*").succeeded());
        assert!(parse("[a-z]+").succeeded());
        assert!(!parse("(").succeeded());
        assert!(!parse("*a").succeeded());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let mut builder: NfaBuilder<u32> = NfaBuilder::new();
        assert!(matches!(
            compile(&mut builder, 0, "("),
            Err(RegexError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn escapes_resolve_to_control_characters() {
        assert!(accepts("\\n", "\n"));
        assert!(accepts("\\*", "*"));
        assert!(!accepts("\\n", "n"));
    }

    #[test]
    fn classes_and_negation() {
        assert!(accepts("[a-cx]", "b"));
        assert!(accepts("[a-cx]", "x"));
        assert!(!accepts("[a-cx]", "d"));

        assert!(accepts("[^a-c]", "d"));
        assert!(accepts("[^a-c]", "^"));
        assert!(!accepts("[^a-c]", "b"));
    }

    #[test]
    fn alternation_repetition_grouping() {
        assert!(accepts("a|b", "a"));
        assert!(accepts("a|b", "b"));
        assert!(accepts("(ab)+", "ababab"));
        assert!(accepts("a?b", "b"));
        assert!(accepts("a?b", "ab"));
        assert!(accepts(".", "q"));
        assert!(!accepts("a|b", "c"));
    }
}
