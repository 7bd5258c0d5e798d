//! # Symbols
//!
//! Immutable parse-tree nodes.
//!
//! ## Overview
//!
//! A [`Symbol`] is either a leaf (a token: terminal type, raw text, 1-based
//! source line/column) or a composite (a non-terminal type over ordered
//! children). Nodes are `Arc`-backed and cheap to clone; the tree is
//! persistent: [`Symbol::with_child`] replaces one child and shares every
//! other subtree with the original.
//!
//! Spans are inclusive and derived: a composite's start position is the first
//! child with a known position, its end position the last. Positions are
//! unknown (`None`) for composites whose children are all empty, such as
//! linked-list terminators. [`Symbol::text`] reconstructs source text by
//! concatenating child text with inferred newline/space padding.

use std::fmt;
use std::sync::Arc;

use compact_str::{CompactString, ToCompactString};

use crate::intern::SymbolType;

/// An immutable parse-tree node.
#[derive(Clone, PartialEq, Eq)]
pub struct Symbol {
    data: Arc<SymbolData>,
}

#[derive(PartialEq, Eq)]
struct SymbolData {
    ty: SymbolType,
    repr: Repr,
}

#[derive(PartialEq, Eq)]
enum Repr {
    Leaf {
        text: CompactString,
        line: u32,
        column: u32,
    },
    Node {
        children: Vec<Symbol>,
    },
}

impl Symbol {
    /// Creates a token symbol.
    ///
    /// `line` and `column` are 1-based source coordinates of the first
    /// character of `text`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is a non-terminal.
    #[must_use]
    pub fn leaf(ty: SymbolType, text: impl AsRef<str>, line: u32, column: u32) -> Self {
        assert!(
            ty.is_terminal(),
            "composite symbols are built from children, not text: {ty}",
        );
        Self {
            data: Arc::new(SymbolData {
                ty,
                repr: Repr::Leaf {
                    text: text.as_ref().to_compact_string(),
                    line,
                    column,
                },
            }),
        }
    }

    /// Creates a composite symbol over ordered children.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is a terminal.
    #[must_use]
    pub fn node(ty: SymbolType, children: Vec<Symbol>) -> Self {
        assert!(!ty.is_terminal(), "token symbols have no children: {ty}");
        Self {
            data: Arc::new(SymbolData {
                ty,
                repr: Repr::Node { children },
            }),
        }
    }

    /// The node's symbol type.
    #[must_use]
    pub fn ty(&self) -> SymbolType {
        self.data.ty
    }

    /// `true` for token symbols.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.data.repr, Repr::Leaf { .. })
    }

    /// The node's children; empty for token symbols.
    #[must_use]
    pub fn children(&self) -> &[Symbol] {
        match &self.data.repr {
            Repr::Leaf { .. } => &[],
            Repr::Node { children } => children,
        }
    }

    /// Replaces the child at `index`, sharing all other subtrees.
    ///
    /// # Panics
    ///
    /// Panics on a leaf or an out-of-range index.
    #[must_use]
    pub fn with_child(&self, index: usize, replacement: Symbol) -> Self {
        match &self.data.repr {
            Repr::Leaf { .. } => panic!("token symbols have no children: {}", self.ty()),
            Repr::Node { children } => {
                let mut children = children.clone();
                children[index] = replacement;
                Self::node(self.ty(), children)
            }
        }
    }

    /// The 1-based line of the first character, if known.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        match &self.data.repr {
            Repr::Leaf { line, .. } => Some(*line),
            Repr::Node { children } => children.iter().find_map(Symbol::line),
        }
    }

    /// The 1-based column of the first character, if known.
    #[must_use]
    pub fn column(&self) -> Option<u32> {
        match &self.data.repr {
            Repr::Leaf { column, .. } => Some(*column),
            Repr::Node { children } => children.iter().find_map(Symbol::column),
        }
    }

    /// The 1-based line of the last character, if known.
    ///
    /// A trailing line terminator counts as the last character of its line.
    #[must_use]
    pub fn end_line(&self) -> Option<u32> {
        match &self.data.repr {
            Repr::Leaf { text, line, .. } => {
                let terminators = text.matches('\n').count() as u32;
                let trailing = u32::from(text.ends_with('\n'));
                Some(line + terminators - trailing)
            }
            Repr::Node { children } => children.iter().rev().find_map(Symbol::end_line),
        }
    }

    /// The 1-based column of the last character, if known.
    #[must_use]
    pub fn end_column(&self) -> Option<u32> {
        match &self.data.repr {
            Repr::Leaf { text, column, .. } => {
                let chars: Vec<char> = text.chars().collect();
                if chars.len() <= 1 {
                    return Some(*column);
                }
                let mut last_terminator = match chars.iter().rposition(|&c| c == '\n') {
                    None => return Some(column + chars.len() as u32 - 1),
                    Some(i) => i,
                };
                // a trailing terminator belongs to the previous line
                if last_terminator == chars.len() - 1 {
                    last_terminator = match chars[..last_terminator]
                        .iter()
                        .rposition(|&c| c == '\n')
                    {
                        None => return Some(column + chars.len() as u32 - 1),
                        Some(i) => i,
                    };
                }
                Some((chars.len() - last_terminator - 1) as u32)
            }
            Repr::Node { children } => children.iter().rev().find_map(Symbol::end_column),
        }
    }

    /// The symbol's source text.
    ///
    /// For composites this concatenates child text, inserting newlines and
    /// spaces inferred from the gap between one child's end position and the
    /// next child's start position. Children with unknown positions are
    /// concatenated without padding.
    #[must_use]
    pub fn text(&self) -> CompactString {
        match &self.data.repr {
            Repr::Leaf { text, .. } => text.clone(),
            Repr::Node { children } => {
                let mut out = CompactString::default();
                let mut last: Option<&Symbol> = None;
                for child in children {
                    let text = child.text();
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(prev) = last {
                        if let (Some(line), Some(column), Some(end_line), Some(end_column)) =
                            (child.line(), child.column(), prev.end_line(), prev.end_column())
                        {
                            let line_diff = line.saturating_sub(end_line);
                            let base = if line_diff > 0 { 0 } else { end_column + 1 };
                            let col_diff = column.saturating_sub(base);
                            for _ in 0..line_diff {
                                out.push('\n');
                            }
                            for _ in 0..col_diff {
                                out.push(' ');
                            }
                        }
                    }
                    out.push_str(&text);
                    last = Some(child);
                }
                out
            }
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data.repr {
            Repr::Leaf { text, line, column } => {
                let name = self.ty().name();
                if name.eq_ignore_ascii_case(text) {
                    write!(f, "\"{text}\" @{line}:{column}")
                } else if text.is_empty() {
                    f.write_str(name)
                } else {
                    write!(f, "{name}(\"{text}\") @{line}:{column}")
                }
            }
            Repr::Node { children } => {
                write!(f, "{}(", self.ty().name())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Context;

    #[test]
    fn leaf_spans() {
        let mut ctx = Context::new();
        let id = ctx.terminal("ID");

        let sym = Symbol::leaf(id, "hello", 2, 4);
        assert_eq!(sym.line(), Some(2));
        assert_eq!(sym.column(), Some(4));
        assert_eq!(sym.end_line(), Some(2));
        assert_eq!(sym.end_column(), Some(8));
    }

    #[test]
    fn multi_line_leaf_spans() {
        let mut ctx = Context::new();
        let s = ctx.terminal("STR");

        let sym = Symbol::leaf(s, "ab\ncd", 1, 5);
        assert_eq!(sym.end_line(), Some(2));
        assert_eq!(sym.end_column(), Some(2));

        // a trailing terminator is the last character of its line
        let sym = Symbol::leaf(s, "ab\n", 3, 1);
        assert_eq!(sym.end_line(), Some(3));
        assert_eq!(sym.end_column(), Some(3));
    }

    #[test]
    fn composite_spans_skip_unknown_positions() {
        let mut ctx = Context::new();
        let id = ctx.terminal("ID");
        let list = ctx.non_terminal("LIST");

        let empty_tail = Symbol::node(list, vec![]);
        assert_eq!(empty_tail.line(), None);

        let sym = Symbol::node(
            list,
            vec![Symbol::leaf(id, "a", 1, 1), empty_tail.clone()],
        );
        assert_eq!(sym.line(), Some(1));
        assert_eq!(sym.end_line(), Some(1));
        assert_eq!(sym.end_column(), Some(1));
    }

    #[test]
    fn text_reconstruction_pads_gaps() {
        let mut ctx = Context::new();
        let id = ctx.terminal("ID");
        let pair = ctx.non_terminal("PAIR");

        let sym = Symbol::node(
            pair,
            vec![Symbol::leaf(id, "ab", 1, 1), Symbol::leaf(id, "cd", 1, 6)],
        );
        assert_eq!(sym.text(), "ab   cd");
    }

    #[test]
    fn with_child_shares_untouched_subtrees() {
        let mut ctx = Context::new();
        let id = ctx.terminal("ID");
        let pair = ctx.non_terminal("PAIR");

        let a = Symbol::leaf(id, "a", 1, 1);
        let b = Symbol::leaf(id, "b", 1, 2);
        let orig = Symbol::node(pair, vec![a, b]);

        let replaced = orig.with_child(1, Symbol::leaf(id, "c", 1, 2));
        assert_eq!(orig.children()[1].text(), "b");
        assert_eq!(replaced.children()[1].text(), "c");
        // untouched child is the same allocation
        assert!(Arc::ptr_eq(
            &orig.children()[0].data,
            &replaced.children()[0].data
        ));
    }
}
