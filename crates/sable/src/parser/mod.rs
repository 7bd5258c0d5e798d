//! # Parsers and Parser Generators
//!
//! The common surface every parsing strategy in the crate implements.
//!
//! ## Overview
//!
//! A [`ParserGenerator`] turns a [`Grammar`](crate::grammar::Grammar) into a
//! runnable [`Parser`] ahead of time; grammar problems surface as
//! [`Conflict`]s in the [`GeneratorResult`] rather than at parse time. A
//! parser consumes a token stream (the symbols a [`Lexer`](crate::lexer::Lexer)
//! produces, ending in `EOF`) and yields a [`ParseOutcome`]: either a parse
//! tree rooted at the start symbol or a list of [`ParseError`]s. Neither
//! phase panics on bad input; panics are reserved for malformed API usage.
//!
//! Implementations: the LR family ([`LrGenerator`]) and backtracking
//! recursive descent ([`RecursiveDescentGenerator`]).

pub mod lr;
pub mod recursive;

pub use lr::LrGenerator;
pub use recursive::RecursiveDescentGenerator;

use thiserror::Error;

use crate::grammar::Grammar;
use crate::symbol::Symbol;

/// A parse-time failure. Carries rendered context rather than borrowed
/// grammar state so outcomes are self-contained.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum ParseError {
    #[error("unexpected token {token}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::parse::unexpected_token)))]
    UnexpectedToken { token: String },

    #[error("token stream ended before the parse completed")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::parse::unexpected_end)))]
    UnexpectedEndOfInput,

    #[error("the input cannot be derived from {start}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::parse::no_derivation)))]
    NoDerivation { start: String },
}

/// A grammar defect discovered during generation.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(miette::Diagnostic))]
pub enum Conflict {
    #[error("shift/reduce conflict on {symbol}: shift vs {production}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::generate::shift_reduce)))]
    ShiftReduce { symbol: String, production: String },

    #[error("reduce/reduce conflict on {symbol}: {first} vs {second}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::generate::reduce_reduce)))]
    ReduceReduce {
        symbol: String,
        first: String,
        second: String,
    },

    #[error("accept conflicts with {action} on end of input")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(sable::generate::accept)))]
    Accept { action: String },
}

/// The result of running a [`Parser`]; a tree is present iff `errors` is
/// empty.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub errors: Vec<ParseError>,
    pub warnings: Vec<String>,
    tree: Option<Symbol>,
}

impl ParseOutcome {
    #[must_use]
    pub fn success(tree: Symbol) -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            tree: Some(tree),
        }
    }

    #[must_use]
    pub fn failure(errors: Vec<ParseError>) -> Self {
        Self {
            errors,
            warnings: Vec::new(),
            tree: None,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    /// The parse tree, rooted at the grammar's start symbol.
    #[must_use]
    pub fn parse_tree(&self) -> Option<&Symbol> {
        self.tree.as_ref()
    }

    #[must_use]
    pub fn into_parse_tree(self) -> Option<Symbol> {
        self.tree
    }
}

/// The result of generation; a parser is present iff `conflicts` is empty.
pub struct GeneratorResult {
    pub conflicts: Vec<Conflict>,
    pub warnings: Vec<String>,
    parser: Option<Box<dyn Parser>>,
}

impl GeneratorResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.conflicts.is_empty()
    }

    #[must_use]
    pub fn parser(&self) -> Option<&dyn Parser> {
        self.parser.as_deref()
    }

    #[must_use]
    pub fn into_parser(self) -> Option<Box<dyn Parser>> {
        self.parser
    }
}

/// A runnable parser.
pub trait Parser: Send + Sync {
    /// Parses a token stream. The stream is expected to end with the `EOF`
    /// terminal, as lexer streams do; tokens past the accepted input are left
    /// unconsumed.
    fn parse(&self, tokens: &mut dyn Iterator<Item = Symbol>) -> ParseOutcome;

    /// Convenience over [`Parser::parse`] for an already-collected stream.
    fn parse_all(&self, tokens: Vec<Symbol>) -> ParseOutcome {
        self.parse(&mut tokens.into_iter())
    }
}

/// Builds a [`Parser`] from a grammar ahead of time.
pub trait ParserGenerator {
    fn generate(&self, grammar: &Grammar) -> GeneratorResult;
}
