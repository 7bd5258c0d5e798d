//! # Character Sets
//!
//! Immutable transition-label sets and the partitioning algebra that turns
//! overlapping label sets into a disjoint transition alphabet.
//!
//! ## Overview
//!
//! A [`CharSet`] is either a compact inclusive range or an explicit member
//! set. [`CharSet::partitioned_union`] is the core operation: given any
//! collection of possibly-overlapping sets it produces pairwise-disjoint
//! partitions whose union equals the input union, such that every input set
//! is exactly the union of the partitions it intersects. Subset construction
//! relies on that guarantee: a partition never straddles an edge-label
//! boundary, so "label fully contains partition" is equivalent to "label
//! intersects partition".

use std::collections::BTreeSet;
use std::fmt;

use hashbrown::HashMap;

/// An immutable set of characters used as an automaton transition label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CharSet {
    /// All characters in the inclusive range `min..=max`.
    Range { min: char, max: char },
    /// An explicit collection of characters.
    Explicit(BTreeSet<char>),
}

/// The next valid `char` after `c`, skipping the surrogate gap.
pub(crate) fn succ(c: char) -> Option<char> {
    let next = c as u32 + 1;
    let next = if next == 0xD800 { 0xE000 } else { next };
    char::from_u32(next)
}

impl CharSet {
    /// The set containing every `char`.
    #[must_use]
    pub const fn all() -> Self {
        Self::Range {
            min: '\0',
            max: char::MAX,
        }
    }

    /// The set containing exactly `c`.
    #[must_use]
    pub const fn single(c: char) -> Self {
        Self::Range { min: c, max: c }
    }

    /// The inclusive range `min..=max`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    #[must_use]
    pub fn range(min: char, max: char) -> Self {
        assert!(min <= max, "invalid range {min:?}..={max:?}");
        Self::Range { min, max }
    }

    /// An explicit set from arbitrary members.
    #[must_use]
    pub fn explicit(members: impl IntoIterator<Item = char>) -> Self {
        Self::Explicit(members.into_iter().collect())
    }

    /// `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Range { .. } => false,
            Self::Explicit(members) => members.is_empty(),
        }
    }

    /// The smallest member, if any.
    #[must_use]
    pub fn min(&self) -> Option<char> {
        match self {
            Self::Range { min, .. } => Some(*min),
            Self::Explicit(members) => members.first().copied(),
        }
    }

    /// The largest member, if any.
    #[must_use]
    pub fn max(&self) -> Option<char> {
        match self {
            Self::Range { max, .. } => Some(*max),
            Self::Explicit(members) => members.last().copied(),
        }
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        match self {
            Self::Range { min, max } => (*min..=*max).contains(&c),
            Self::Explicit(members) => members.contains(&c),
        }
    }

    /// `true` if every member of `other` is a member of `self`.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Range { min, max },
                Self::Range {
                    min: omin,
                    max: omax,
                },
            ) => min <= omin && omax <= max,
            (_, Self::Explicit(members)) => members.iter().all(|&c| self.contains(c)),
            (Self::Explicit(_), Self::Range { min, max }) => {
                let mut c = *min;
                loop {
                    if !self.contains(c) {
                        return false;
                    }
                    if c == *max {
                        return true;
                    }
                    match succ(c) {
                        Some(next) if next <= *max => c = next,
                        _ => return true,
                    }
                }
            }
        }
    }

    /// Partitions the union of `sets` into pairwise-disjoint sets.
    ///
    /// Guarantees:
    ///
    /// - outputs are pairwise disjoint and their union equals the input union
    /// - every input set equals the union of exactly the partitions it
    ///   intersects (no partition straddles an input boundary)
    /// - idempotent on its own output; empty input yields empty output; a
    ///   single range passes through unchanged
    ///
    /// Contiguous ranges are swept over their sorted boundary points; discrete
    /// members from explicit sets are isolated and grouped by identical
    /// containment signature over the inputs.
    #[must_use]
    pub fn partitioned_union(sets: &[CharSet]) -> Vec<CharSet> {
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        let mut discrete: BTreeSet<char> = BTreeSet::new();
        for set in sets {
            match set {
                Self::Range { min, max } => ranges.push((*min as u32, *max as u32)),
                Self::Explicit(members) => discrete.extend(members.iter().copied()),
            }
        }

        // boundary points: range endpoints plus an isolating cut around every
        // discrete member, so no swept interval contains one
        let mut cuts: BTreeSet<u32> = BTreeSet::new();
        for &(min, max) in &ranges {
            cuts.insert(min);
            cuts.insert(max + 1);
        }
        for &c in &discrete {
            cuts.insert(c as u32);
            cuts.insert(c as u32 + 1);
        }

        let cuts: Vec<u32> = cuts.into_iter().collect();
        let mut partitions: Vec<CharSet> = Vec::new();
        let mut groups: HashMap<Vec<bool>, BTreeSet<char>> = HashMap::new();

        for window in cuts.windows(2) {
            let (lo, hi) = (window[0], window[1] - 1);
            let isolated = (lo == hi)
                .then(|| char::from_u32(lo))
                .flatten()
                .filter(|c| discrete.contains(c));
            if let Some(c) = isolated {
                // discrete members group by containment signature
                let signature: Vec<bool> = sets.iter().map(|s| s.contains(c)).collect();
                groups.entry(signature).or_default().insert(c);
            } else if ranges.iter().any(|&(min, max)| min <= lo && hi <= max) {
                if let Some(range) = materialize(lo, hi) {
                    partitions.push(range);
                }
            }
        }

        let mut grouped: Vec<CharSet> = groups.into_values().map(CharSet::Explicit).collect();
        partitions.append(&mut grouped);
        partitions.sort_by_key(|p| (p.min(), p.max()));
        partitions
    }
}

/// Builds a range over the code points `lo..=hi`, clamping away the surrogate
/// gap. Returns `None` if no valid characters remain.
pub(crate) fn materialize(lo: u32, hi: u32) -> Option<CharSet> {
    let lo = if (0xD800..0xE000).contains(&lo) {
        0xE000
    } else {
        lo
    };
    let hi = if (0xD800..0xE000).contains(&hi) {
        0xD7FF
    } else {
        hi
    };
    if lo > hi {
        return None;
    }
    Some(CharSet::Range {
        min: char::from_u32(lo)?,
        max: char::from_u32(hi)?,
    })
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { min, max } if min == max => write!(f, "{{{min:?}}}"),
            Self::Range { min, max } => write!(f, "[{min:?}-{max:?}]"),
            Self::Explicit(members) => {
                f.write_str("{")?;
                for (i, c) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{c:?}")?;
                }
                f.write_str("}")
            }
        }
    }
}
