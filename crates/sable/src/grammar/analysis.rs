//! Nullable, first, and follow fixpoint analyses over a production list.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use crate::grammar::Production;
use crate::intern::SymbolType;

/// The nullable set and per-symbol first/follow sets of a grammar.
///
/// Computed once at [`Grammar`](crate::grammar::Grammar) construction by
/// running each of the three standard fixpoints to exhaustion. Terminals have
/// themselves as their first set; symbols never mentioned get empty sets.
#[derive(Debug, Clone)]
pub struct NullableFirstFollow {
    nullable: HashSet<SymbolType>,
    first: HashMap<SymbolType, BTreeSet<SymbolType>>,
    follow: HashMap<SymbolType, BTreeSet<SymbolType>>,
    empty: BTreeSet<SymbolType>,
}

impl NullableFirstFollow {
    #[must_use]
    pub fn compute(productions: &[Production]) -> Self {
        // nullable: lhs is nullable once some rhs is entirely nullable
        let mut nullable: HashSet<SymbolType> = HashSet::new();
        let mut changed = true;
        while changed {
            changed = false;
            for production in productions {
                if production.rhs().iter().all(|ty| nullable.contains(ty))
                    && nullable.insert(production.lhs())
                {
                    changed = true;
                }
            }
        }

        // first: seed terminals with themselves, then propagate through
        // nullable prefixes
        let mut first: HashMap<SymbolType, BTreeSet<SymbolType>> = HashMap::new();
        for production in productions {
            first.entry(production.lhs()).or_default();
            for &ty in production.rhs() {
                let entry = first.entry(ty).or_default();
                if ty.is_terminal() {
                    entry.insert(ty);
                }
            }
        }
        changed = true;
        while changed {
            changed = false;
            for production in productions {
                for &ty in production.rhs() {
                    let from = first.get(&ty).cloned().unwrap_or_default();
                    let into = first.entry(production.lhs()).or_default();
                    let before = into.len();
                    into.extend(from);
                    changed |= into.len() != before;
                    if !nullable.contains(&ty) {
                        break;
                    }
                }
            }
        }

        // follow: walk each rhs right-to-left, feeding follow(lhs) through
        // nullable tails and first(successor) across adjacent positions
        let mut follow: HashMap<SymbolType, BTreeSet<SymbolType>> = HashMap::new();
        for production in productions {
            follow.entry(production.lhs()).or_default();
            for &ty in production.rhs() {
                follow.entry(ty).or_default();
            }
        }
        changed = true;
        while changed {
            changed = false;
            for production in productions {
                let rhs = production.rhs();
                let mut tail_nullable = true;
                for i in (0..rhs.len()).rev() {
                    if tail_nullable {
                        let from = follow.get(&production.lhs()).cloned().unwrap_or_default();
                        let into = follow.entry(rhs[i]).or_default();
                        let before = into.len();
                        into.extend(from);
                        changed |= into.len() != before;
                        tail_nullable = nullable.contains(&rhs[i]);
                    }
                    for &follower in &rhs[i + 1..] {
                        let from = first.get(&follower).cloned().unwrap_or_default();
                        let into = follow.entry(rhs[i]).or_default();
                        let before = into.len();
                        into.extend(from);
                        changed |= into.len() != before;
                        if !nullable.contains(&follower) {
                            break;
                        }
                    }
                }
            }
        }

        Self {
            nullable,
            first,
            follow,
            empty: BTreeSet::new(),
        }
    }

    /// `true` if `ty` derives the empty string.
    #[must_use]
    pub fn is_nullable(&self, ty: SymbolType) -> bool {
        self.nullable.contains(&ty)
    }

    /// Terminals that can begin a derivation of `ty`.
    #[must_use]
    pub fn first(&self, ty: SymbolType) -> &BTreeSet<SymbolType> {
        self.first.get(&ty).unwrap_or(&self.empty)
    }

    /// Terminals that can follow `ty` in some sentential form.
    #[must_use]
    pub fn follow(&self, ty: SymbolType) -> &BTreeSet<SymbolType> {
        self.follow.get(&ty).unwrap_or(&self.empty)
    }

    /// The first set of a sequence of symbols.
    #[must_use]
    pub fn first_of_sequence(&self, types: &[SymbolType]) -> BTreeSet<SymbolType> {
        let mut out = BTreeSet::new();
        for &ty in types {
            out.extend(self.first(ty).iter().copied());
            if !self.is_nullable(ty) {
                break;
            }
        }
        out
    }

    /// `true` if every symbol of `types` is nullable (vacuously true when
    /// empty).
    #[must_use]
    pub fn all_nullable(&self, types: &[SymbolType]) -> bool {
        types.iter().all(|&ty| self.is_nullable(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Context;

    /// S -> A B x ; A -> a | <empty> ; B -> b
    fn sample() -> (Context, NullableFirstFollow) {
        let mut ctx = Context::new();
        let a = ctx.terminal("a");
        let b = ctx.terminal("b");
        let x = ctx.terminal("x");
        let s = ctx.non_terminal("S");
        let na = ctx.non_terminal("A");
        let nb = ctx.non_terminal("B");

        let productions = vec![
            Production::new(s, vec![na, nb, x]),
            Production::new(na, vec![a]),
            Production::new(na, vec![]),
            Production::new(nb, vec![b]),
        ];
        let nff = NullableFirstFollow::compute(&productions);
        (ctx, nff)
    }

    #[test]
    fn nullable() {
        let (mut ctx, nff) = sample();
        assert!(nff.is_nullable(ctx.non_terminal("A")));
        assert!(!nff.is_nullable(ctx.non_terminal("B")));
        assert!(!nff.is_nullable(ctx.non_terminal("S")));
    }

    #[test]
    fn first_sets() {
        let (mut ctx, nff) = sample();
        let a = ctx.terminal("a");
        let b = ctx.terminal("b");
        let s = ctx.non_terminal("S");
        // A is nullable, so first(S) includes first(B)
        assert_eq!(nff.first(s), &BTreeSet::from([a, b]));
        assert_eq!(nff.first(a), &BTreeSet::from([a]));
    }

    #[test]
    fn follow_sets() {
        let (mut ctx, nff) = sample();
        let b = ctx.terminal("b");
        let na = ctx.non_terminal("A");
        assert_eq!(nff.follow(na), &BTreeSet::from([b]));
    }

    #[test]
    fn first_of_sequence_stops_at_non_nullable() {
        let (mut ctx, nff) = sample();
        let a = ctx.terminal("a");
        let b = ctx.terminal("b");
        let x = ctx.terminal("x");
        let na = ctx.non_terminal("A");
        let nb = ctx.non_terminal("B");

        assert_eq!(nff.first_of_sequence(&[na, nb, x]), BTreeSet::from([a, b]));
        assert_eq!(nff.first_of_sequence(&[nb, x]), BTreeSet::from([b]));
        assert_eq!(nff.first_of_sequence(&[]), BTreeSet::new());
        assert!(nff.all_nullable(&[na]));
        assert!(!nff.all_nullable(&[na, nb]));
    }
}
