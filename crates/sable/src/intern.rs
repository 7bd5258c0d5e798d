//! # Symbol Types and Contexts
//!
//! Name-interned symbol-type handles and the registry that manufactures them.
//!
//! ## Overview
//!
//! A [`Context`] registers terminal and non-terminal symbol types by name and
//! enforces that a name keeps one kind for the lifetime of the context.
//! Registration is idempotent by name; re-registering a name with the opposite
//! kind is an author error and panics.
//!
//! [`SymbolType`] is a `Copy` value (interned name key + kind tag), so it can
//! be stored in tables, hashed, and compared in O(1) without touching the
//! owning context. Names resolve through a process-wide, append-only interner.
//!
//! Every context owns three built-in types: the `EOF` and `UNRECOGNIZED`
//! terminals and the `START` non-terminal used for grammar augmentation.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use hashbrown::HashMap;
use lasso::{Key, Spur, ThreadedRodeo};

static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

fn intern(name: &str) -> Spur {
    NAMES.get_or_intern(name)
}

fn resolve(key: Spur) -> &'static str {
    NAMES.resolve(&key)
}

/// Whether a symbol type is produced by the lexer or by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    /// Produced by a lexer; carries raw text and a source position.
    Terminal,
    /// Produced by a parser; carries an ordered list of child symbols.
    NonTerminal,
}

/// A lightweight, copyable handle to a named symbol type.
///
/// Two symbol types are equal iff they share a name and a kind, regardless of
/// which [`Context`] produced them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolType {
    name: Spur,
    kind: SymbolKind,
}

impl SymbolType {
    /// The type's registered name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        resolve(self.name)
    }

    /// The type's kind tag.
    #[must_use]
    pub const fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// `true` if this type is lexed rather than parsed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminal)
    }
}

impl PartialOrd for SymbolType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .into_usize()
            .cmp(&other.name.into_usize())
            .then(self.kind.cmp(&other.kind))
    }
}

impl fmt::Debug for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.name())
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A registry of symbol types for one language.
///
/// The context is mutable while a language is being described and is treated
/// as read-only afterwards; built artifacts copy the handles they need.
#[derive(Debug, Clone)]
pub struct Context {
    kinds: HashMap<Spur, SymbolKind>,
    eof: SymbolType,
    unrecognized: SymbolType,
    start: SymbolType,
}

impl Context {
    /// Creates a context with the built-in `EOF`, `UNRECOGNIZED`, and `START`
    /// types already registered.
    #[must_use]
    pub fn new() -> Self {
        let mut ctx = Self {
            kinds: HashMap::new(),
            // placeholders, replaced immediately below
            eof: SymbolType {
                name: intern("EOF"),
                kind: SymbolKind::Terminal,
            },
            unrecognized: SymbolType {
                name: intern("UNRECOGNIZED"),
                kind: SymbolKind::Terminal,
            },
            start: SymbolType {
                name: intern("START"),
                kind: SymbolKind::NonTerminal,
            },
        };
        ctx.eof = ctx.terminal("EOF");
        ctx.unrecognized = ctx.terminal("UNRECOGNIZED");
        ctx.start = ctx.non_terminal("START");
        ctx
    }

    /// Registers (or looks up) a terminal type.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or already registered as a non-terminal.
    pub fn terminal(&mut self, name: &str) -> SymbolType {
        self.symbol_type(name, SymbolKind::Terminal)
    }

    /// Registers (or looks up) a non-terminal type.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or already registered as a terminal.
    pub fn non_terminal(&mut self, name: &str) -> SymbolType {
        self.symbol_type(name, SymbolKind::NonTerminal)
    }

    fn symbol_type(&mut self, name: &str, kind: SymbolKind) -> SymbolType {
        assert!(!name.is_empty(), "symbol type name must be non-empty");
        let key = intern(name);
        match self.kinds.get(&key) {
            Some(&existing) => assert!(
                existing == kind,
                "symbol type {name:?} already registered as {existing:?}, cannot re-register as {kind:?}",
            ),
            None => {
                self.kinds.insert(key, kind);
            }
        }
        SymbolType { name: key, kind }
    }

    /// `true` if `name` has been registered with either kind.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        NAMES
            .get(name)
            .is_some_and(|key| self.kinds.contains_key(&key))
    }

    /// The built-in end-of-input terminal.
    #[must_use]
    pub const fn eof_type(&self) -> SymbolType {
        self.eof
    }

    /// The built-in terminal emitted for unmatchable input characters.
    #[must_use]
    pub const fn unrecognized_type(&self) -> SymbolType {
        self.unrecognized
    }

    /// The built-in non-terminal used to augment grammars (`START -> S EOF`).
    #[must_use]
    pub const fn start_type(&self) -> SymbolType {
        self.start
    }

    /// All types registered in this context, in unspecified order.
    pub fn types(&self) -> impl Iterator<Item = SymbolType> + '_ {
        self.kinds
            .iter()
            .map(|(&name, &kind)| SymbolType { name, kind })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent_by_name() {
        let mut ctx = Context::new();
        let a = ctx.terminal("PLUS");
        let b = ctx.terminal("PLUS");
        assert_eq!(a, b);
        assert_eq!(a.name(), "PLUS");
        assert!(a.is_terminal());
    }

    #[test]
    fn distinct_names_are_distinct_types() {
        let mut ctx = Context::new();
        let a = ctx.terminal("A");
        let b = ctx.terminal("B");
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn conflicting_kind_panics() {
        let mut ctx = Context::new();
        ctx.terminal("E");
        ctx.non_terminal("E");
    }

    #[test]
    fn builtins_are_registered() {
        let ctx = Context::new();
        assert!(ctx.eof_type().is_terminal());
        assert!(ctx.unrecognized_type().is_terminal());
        assert!(!ctx.start_type().is_terminal());
        assert!(ctx.is_registered("EOF"));
        assert!(ctx.is_registered("START"));
    }
}
