//! Checked production-set construction with option/one-of/tuple/list sugar.

use hashbrown::HashSet;

use crate::grammar::Production;
use crate::intern::{Context, SymbolType};

/// Shape options for [`ProductionSet::list_of`].
///
/// Together with the presence of a separator this spans the six supported
/// list variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Allow the list to derive the empty string.
    pub allow_empty: bool,
    /// Allow a dangling separator after the last element. Only meaningful
    /// when a separator is supplied.
    pub allow_trailing_separator: bool,
}

/// An ordered production list with define-before-use checking.
///
/// Referencing a non-terminal that has no production yet is an author error
/// and panics, with one exemption: a production may reference its own
/// left-hand side (direct recursion). Mutually recursive groups are declared
/// by ordering the base productions first.
///
/// The sugar methods synthesize a non-terminal (idempotent by name within
/// this set) plus its defining productions.
#[derive(Debug, Clone, Default)]
pub struct ProductionSet {
    productions: Vec<Production>,
    defined: HashSet<SymbolType>,
}

impl ProductionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a production.
    ///
    /// # Panics
    ///
    /// Panics if the right-hand side references a non-terminal with no
    /// production so far, other than the production's own left-hand side.
    pub fn add(&mut self, production: Production) {
        for &ty in production.rhs() {
            assert!(
                ty.is_terminal() || ty == production.lhs() || self.defined.contains(&ty),
                "production {production} references {ty}, which has no production yet",
            );
        }
        self.defined.insert(production.lhs());
        self.productions.push(production);
    }

    /// Adds several productions in order.
    pub fn add_all(&mut self, productions: impl IntoIterator<Item = Production>) {
        for production in productions {
            self.add(production);
        }
    }

    /// A non-terminal deriving `inner` or the empty string.
    pub fn option_of(&mut self, context: &mut Context, inner: SymbolType) -> SymbolType {
        let ty = context.non_terminal(&format!("opt<{inner}>"));
        if self.defined.contains(&ty) {
            return ty;
        }
        self.add(Production::new(ty, vec![inner]));
        self.add(Production::new(ty, vec![]));
        ty
    }

    /// A non-terminal deriving exactly one of `options`.
    ///
    /// # Panics
    ///
    /// Panics if `options` is empty.
    pub fn one_of(&mut self, context: &mut Context, options: &[SymbolType]) -> SymbolType {
        assert!(!options.is_empty(), "one-of requires at least one option");
        let ty = context.non_terminal(&format!("oneOf<{}>", join(options, "|")));
        if self.defined.contains(&ty) {
            return ty;
        }
        for &option in options {
            self.add(Production::new(ty, vec![option]));
        }
        ty
    }

    /// A non-terminal deriving the concatenation of `parts`.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is empty.
    pub fn tuple_of(&mut self, context: &mut Context, parts: &[SymbolType]) -> SymbolType {
        assert!(!parts.is_empty(), "tuple requires at least one part");
        let ty = context.non_terminal(&format!("tuple<{}>", join(parts, ", ")));
        if self.defined.contains(&ty) {
            return ty;
        }
        self.add(Production::new(ty, parts.to_vec()));
        ty
    }

    /// A non-terminal deriving a homogeneous list of `element`, optionally
    /// `separator`-delimited.
    ///
    /// The separated, possibly-empty, no-trailing-separator variant cannot be
    /// expressed with single-level recursion and goes through a synthetic
    /// non-empty list non-terminal.
    ///
    /// # Panics
    ///
    /// Panics if a trailing separator is requested without a separator.
    pub fn list_of(
        &mut self,
        context: &mut Context,
        element: SymbolType,
        separator: Option<SymbolType>,
        options: ListOptions,
    ) -> SymbolType {
        assert!(
            separator.is_some() || !options.allow_trailing_separator,
            "a trailing separator requires a separator",
        );
        let ty = context.non_terminal(&list_name(element, separator, options));
        if self.defined.contains(&ty) {
            return ty;
        }

        if options.allow_empty {
            if let Some(separator) = separator {
                // indirection: the empty alternative cannot share a level
                // with separated recursion without deriving "sep" alone
                let non_empty = self.list_of(
                    context,
                    element,
                    Some(separator),
                    ListOptions {
                        allow_empty: false,
                        allow_trailing_separator: options.allow_trailing_separator,
                    },
                );
                self.add(Production::new(ty, vec![non_empty]));
                self.add(Production::new(ty, vec![]));
            } else {
                self.add(Production::new(ty, vec![element, ty]));
                self.add(Production::new(ty, vec![]));
            }
            return ty;
        }

        match separator {
            None => {
                self.add(Production::new(ty, vec![element, ty]));
                self.add(Production::new(ty, vec![element]));
            }
            Some(separator) => {
                self.add(Production::new(ty, vec![element, separator, ty]));
                if options.allow_trailing_separator {
                    self.add(Production::new(ty, vec![element, separator]));
                }
                self.add(Production::new(ty, vec![element]));
            }
        }
        ty
    }

    /// The accumulated productions, in declaration order.
    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    #[must_use]
    pub fn into_productions(self) -> Vec<Production> {
        self.productions
    }
}

fn join(types: &[SymbolType], separator: &str) -> String {
    types
        .iter()
        .map(|ty| ty.name().to_owned())
        .collect::<Vec<_>>()
        .join(separator)
}

fn list_name(element: SymbolType, separator: Option<SymbolType>, options: ListOptions) -> String {
    let base = if options.allow_empty {
        "list"
    } else {
        "nonEmptyList"
    };
    let trailing = if options.allow_trailing_separator {
        "WithTrailingSeparator"
    } else {
        ""
    };
    match separator {
        Some(separator) => format!("{base}{trailing}<{element}, {separator}>"),
        None => format!("{base}{trailing}<{element}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "has no production yet")]
    fn undefined_forward_reference_panics() {
        let mut ctx = Context::new();
        let lparen = ctx.terminal("(");
        let rparen = ctx.terminal(")");
        let s = ctx.non_terminal("S");
        let l = ctx.non_terminal("L");

        let mut set = ProductionSet::new();
        set.add(Production::new(s, vec![lparen, l, rparen]));
    }

    #[test]
    fn self_recursion_is_allowed() {
        let mut ctx = Context::new();
        let x = ctx.terminal("x");
        let plus = ctx.terminal("+");
        let e = ctx.non_terminal("E");

        let mut set = ProductionSet::new();
        set.add(Production::new(e, vec![e, plus, e]));
        set.add(Production::new(e, vec![x]));
        assert_eq!(set.productions().len(), 2);
    }

    #[test]
    fn mutual_recursion_by_ordering() {
        let mut ctx = Context::new();
        let lparen = ctx.terminal("(");
        let rparen = ctx.terminal(")");
        let comma = ctx.terminal(",");
        let x = ctx.terminal("x");
        let s = ctx.non_terminal("S");
        let l = ctx.non_terminal("L");

        let mut set = ProductionSet::new();
        set.add(Production::new(s, vec![x]));
        set.add(Production::new(l, vec![s]));
        set.add(Production::new(l, vec![l, comma, s]));
        set.add(Production::new(s, vec![lparen, l, rparen]));
        assert_eq!(set.productions().len(), 4);
    }

    #[test]
    fn option_and_one_of_and_tuple() {
        let mut ctx = Context::new();
        let a = ctx.terminal("a");
        let b = ctx.terminal("b");

        let mut set = ProductionSet::new();
        let opt = set.option_of(&mut ctx, a);
        let opt_again = set.option_of(&mut ctx, a);
        assert_eq!(opt, opt_again);
        assert_eq!(set.productions().len(), 2);

        let choice = set.one_of(&mut ctx, &[a, b]);
        let pair = set.tuple_of(&mut ctx, &[opt, choice]);
        assert!(!pair.is_terminal());
        // opt: 2, one-of: 2, tuple: 1
        assert_eq!(set.productions().len(), 5);
    }

    #[test]
    fn all_six_list_variants() {
        let mut ctx = Context::new();
        let e = ctx.terminal("e");
        let comma = ctx.terminal(",");

        let mut set = ProductionSet::new();
        let mut tys = Vec::new();
        for separator in [None, Some(comma)] {
            for allow_empty in [false, true] {
                for allow_trailing_separator in [false, true] {
                    if allow_trailing_separator && separator.is_none() {
                        continue;
                    }
                    tys.push(set.list_of(
                        &mut ctx,
                        e,
                        separator,
                        ListOptions {
                            allow_empty,
                            allow_trailing_separator,
                        },
                    ));
                }
            }
        }
        assert_eq!(tys.len(), 6);
        let distinct: HashSet<SymbolType> = tys.iter().copied().collect();
        assert_eq!(distinct.len(), 6);

        // separated, possibly-empty, no-trailing goes through a synthetic
        // non-empty list
        let empty_sep = set.list_of(&mut ctx, e, Some(comma), ListOptions {
            allow_empty: true,
            allow_trailing_separator: false,
        });
        let renames: Vec<&Production> = set
            .productions()
            .iter()
            .filter(|p| p.lhs() == empty_sep && p.is_rename())
            .collect();
        assert_eq!(renames.len(), 1);
    }
}
