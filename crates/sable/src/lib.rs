//! # Sable
//!
//! A lexer and parser generator toolkit: the front end of a compiler pipeline,
//! from character sets up to parse trees.
//!
//! ## Components
//!
//! - [`charset`]: character-set algebra whose partitioned unions become
//!   automaton transition labels
//! - [`automata`]: generic finite automata with epsilon closure, NFA→DFA
//!   subset construction, and a deterministic simulator
//! - [`regex`]: a self-hosted regex compiler emitting NFA fragments
//! - [`lexer`]: mode-aware longest-match tokenization driven by per-mode DFAs
//! - [`grammar`]: productions, nullable/first/follow analysis, precedence,
//!   and builder sugar
//! - [`parser`]: LR(0)/SLR(1)/LR(1)/LALR(1) table generation and a
//!   backtracking recursive-descent generator behind one
//!   [`ParserGenerator`](parser::ParserGenerator) trait
//!
//! ## Usage
//!
//! ```rust
//! use sable::grammar::{Grammar, PrecedenceTable, Production};
//! use sable::intern::Context;
//! use sable::parser::{lr::LrGenerator, ParserGenerator};
//!
//! let mut ctx = Context::new();
//! let x = ctx.terminal("X");
//! let s = ctx.non_terminal("S");
//!
//! let grammar = Grammar::new(
//!     &ctx,
//!     "unit",
//!     s,
//!     vec![Production::new(s, vec![x])],
//!     PrecedenceTable::default(),
//! );
//!
//! let result = LrGenerator::lalr().generate(&grammar);
//! assert!(result.succeeded());
//! ```

pub mod automata;
pub mod canonicalize;
pub mod charset;
pub mod grammar;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod regex;
pub mod symbol;

pub use charset::CharSet;
pub use intern::{Context, SymbolKind, SymbolType};
pub use symbol::Symbol;
