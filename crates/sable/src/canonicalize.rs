//! # Parse-Tree Canonicalization
//!
//! Grammars express repetition through recursion, so "a list of N elements"
//! parses as an N-deep chain of list nodes. [`flatten_lists`] collapses those
//! chains into a single node with flat children, which is the shape tree
//! walkers (the regex compiler included) want to consume.

use hashbrown::HashSet;

use crate::intern::SymbolType;
use crate::symbol::Symbol;

/// Rebuilds `symbol` with every node whose type is in `list_types` flattened:
/// a child of the same type as its parent is spliced into the parent's child
/// list. Handles both `L -> e L | <empty>` and `L -> e | e L` recursion
/// shapes; children are flattened bottom-up first.
#[must_use]
pub fn flatten_lists(symbol: &Symbol, list_types: &HashSet<SymbolType>) -> Symbol {
    if symbol.is_leaf() {
        return symbol.clone();
    }
    let children: Vec<Symbol> = symbol
        .children()
        .iter()
        .map(|child| flatten_lists(child, list_types))
        .collect();
    if !list_types.contains(&symbol.ty()) {
        return Symbol::node(symbol.ty(), children);
    }

    let mut flat = Vec::with_capacity(children.len());
    splice(symbol.ty(), children, &mut flat);
    Symbol::node(symbol.ty(), flat)
}

fn splice(list_type: SymbolType, children: Vec<Symbol>, into: &mut Vec<Symbol>) {
    for child in children {
        if child.ty() == list_type {
            let nested: Vec<Symbol> = child.children().to_vec();
            splice(list_type, nested, into);
        } else {
            into.push(child);
        }
    }
}
