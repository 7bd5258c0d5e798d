//! # Finite Automata
//!
//! Generic NFA/DFA graphs over [`CharSet`] transition labels.
//!
//! ## Overview
//!
//! A [`FiniteAutomaton`] is a frozen graph of states (each with an optional
//! accept value) and edges (each with an optional label; `None` is an epsilon
//! transition). Automata are assembled through an [`NfaBuilder`] and never
//! mutated afterwards.
//!
//! The engine provides the three operations subset construction is made of:
//!
//! - [`FiniteAutomaton::closure`]: epsilon-transitive closure to a fixpoint
//! - [`FiniteAutomaton::reachable_states`]: one labelled step (an edge is
//!   taken only when its label fully contains the probe set) followed by
//!   closure
//! - [`FiniteAutomaton::to_dfa`]: worklist subset construction, partitioning
//!   each state-set's outgoing labels through the character-set algebra so
//!   successor probes never straddle an edge boundary
//!
//! When several accepting NFA states merge into one DFA state, the accept
//! value is the first value in the caller-supplied precedence order held by
//! any constituent state. The lexer generator passes token rules in
//! declaration order, making ties resolve to the first-declared rule; that
//! policy is load-bearing and must not change.

mod simulator;

pub use simulator::{DfaSimulator, SimulationStatus};

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::charset::CharSet;

/// Identifier of a state within one automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    /// The state's index within its automaton.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A transition between two states.
///
/// `label` of `None` marks an epsilon edge, traversable without input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: StateId,
    pub label: Option<CharSet>,
    pub to: StateId,
}

/// Incrementally assembles an automaton.
///
/// The first state added becomes the start state.
#[derive(Debug, Clone)]
pub struct NfaBuilder<V> {
    values: Vec<Option<V>>,
    edges: Vec<Edge>,
}

impl<V> NfaBuilder<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a non-accepting state.
    pub fn add_state(&mut self) -> StateId {
        self.values.push(None);
        StateId(self.values.len() as u32 - 1)
    }

    /// Adds an accepting state carrying `value`.
    pub fn add_accept_state(&mut self, value: V) -> StateId {
        self.values.push(Some(value));
        StateId(self.values.len() as u32 - 1)
    }

    /// Adds a labelled transition.
    pub fn add_edge(&mut self, from: StateId, label: CharSet, to: StateId) {
        self.edges.push(Edge {
            from,
            label: Some(label),
            to,
        });
    }

    /// Adds an epsilon transition.
    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.edges.push(Edge {
            from,
            label: None,
            to,
        });
    }

    /// Freezes the graph.
    ///
    /// # Panics
    ///
    /// Panics if no state was added.
    #[must_use]
    pub fn build(self) -> FiniteAutomaton<V> {
        assert!(!self.values.is_empty(), "automaton needs at least one state");
        let mut edges_from: Vec<SmallVec<[u32; 4]>> = vec![SmallVec::new(); self.values.len()];
        for (i, edge) in self.edges.iter().enumerate() {
            edges_from[edge.from.index()].push(i as u32);
        }
        FiniteAutomaton {
            values: self.values,
            edges: self.edges,
            edges_from,
            start: StateId(0),
        }
    }
}

impl<V> Default for NfaBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A frozen automaton.
#[derive(Debug, Clone)]
pub struct FiniteAutomaton<V> {
    values: Vec<Option<V>>,
    edges: Vec<Edge>,
    edges_from: Vec<SmallVec<[u32; 4]>>,
    start: StateId,
}

impl<V> FiniteAutomaton<V> {
    /// The start state.
    #[must_use]
    pub const fn start(&self) -> StateId {
        self.start
    }

    /// Number of states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.values.len()
    }

    /// Number of edges, epsilon edges included.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of epsilon edges.
    #[must_use]
    pub fn epsilon_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.label.is_none()).count()
    }

    /// Number of accepting states.
    #[must_use]
    pub fn accept_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// The accept value of `state`, if it is accepting.
    #[must_use]
    pub fn value(&self, state: StateId) -> Option<&V> {
        self.values[state.index()].as_ref()
    }

    /// All state ids.
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.values.len() as u32).map(StateId)
    }

    /// Outgoing edges of `state`.
    pub fn edges_from(&self, state: StateId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges_from[state.index()]
            .iter()
            .map(move |&i| &self.edges[i as usize])
    }

    /// The epsilon-transitive closure of `states`, to a fixpoint.
    #[must_use]
    pub fn closure(&self, states: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut closed = states.clone();
        let mut pending: Vec<StateId> = states.iter().copied().collect();
        while let Some(state) = pending.pop() {
            for edge in self.edges_from(state) {
                if edge.label.is_none() && closed.insert(edge.to) {
                    pending.push(edge.to);
                }
            }
        }
        closed
    }

    /// One labelled step over `input`, then closure.
    ///
    /// An edge is taken only when its label fully contains `input`; the
    /// caller must guarantee `input` never straddles an edge-label boundary
    /// (which [`CharSet::partitioned_union`] provides).
    #[must_use]
    pub fn reachable_states(
        &self,
        states: &BTreeSet<StateId>,
        input: &CharSet,
    ) -> BTreeSet<StateId> {
        let mut reached = BTreeSet::new();
        for &state in states {
            for edge in self.edges_from(state) {
                if let Some(label) = &edge.label {
                    if label.contains_all(input) {
                        reached.insert(edge.to);
                    }
                }
            }
        }
        self.closure(&reached)
    }
}

impl<V: Clone + Eq + Hash> FiniteAutomaton<V> {
    /// Subset construction.
    ///
    /// Discovers DFA states from `closure({start})` by a worklist: at each
    /// discovered state-set, the outgoing labels are partitioned through the
    /// character-set algebra, and each partition probes `reachable_states`
    /// for the successor. Termination is guaranteed by the bounded powerset
    /// of NFA states and the discovered-set map.
    ///
    /// `values_by_precedence` decides which accept value a merged DFA state
    /// carries: the first value in this slice held by any constituent
    /// accepting NFA state wins.
    #[must_use]
    pub fn to_dfa(&self, values_by_precedence: &[V]) -> FiniteAutomaton<V> {
        let start_set = self.closure(&BTreeSet::from([self.start]));

        let mut state_sets: Vec<BTreeSet<StateId>> = vec![start_set.clone()];
        let mut discovered: HashMap<BTreeSet<StateId>, usize> = HashMap::new();
        discovered.insert(start_set, 0);
        let mut transitions: Vec<Vec<(CharSet, usize)>> = Vec::new();

        let mut current = 0;
        while current < state_sets.len() {
            let state_set = state_sets[current].clone();

            let labels: BTreeSet<CharSet> = state_set
                .iter()
                .flat_map(|&s| self.edges_from(s))
                .filter_map(|e| e.label.clone())
                .collect();
            let labels: Vec<CharSet> = labels.into_iter().collect();
            let alphabet = CharSet::partitioned_union(&labels);

            let mut outgoing = Vec::with_capacity(alphabet.len());
            for partition in alphabet {
                let successor = self.reachable_states(&state_set, &partition);
                if successor.is_empty() {
                    continue;
                }
                let index = match discovered.get(&successor) {
                    Some(&index) => index,
                    None => {
                        let index = state_sets.len();
                        discovered.insert(successor.clone(), index);
                        state_sets.push(successor);
                        index
                    }
                };
                outgoing.push((partition, index));
            }
            transitions.push(outgoing);
            current += 1;
        }

        let mut builder = NfaBuilder::new();
        for state_set in &state_sets {
            match self.value_for_merged(state_set, values_by_precedence) {
                Some(value) => builder.add_accept_state(value),
                None => builder.add_state(),
            };
        }
        for (from, outgoing) in transitions.into_iter().enumerate() {
            for (label, to) in outgoing {
                builder.add_edge(StateId(from as u32), label, StateId(to as u32));
            }
        }
        builder.build()
    }

    /// First value in precedence order held by any constituent accepting
    /// state.
    fn value_for_merged(&self, states: &BTreeSet<StateId>, precedence: &[V]) -> Option<V> {
        let held: Vec<&V> = states.iter().filter_map(|&s| self.value(s)).collect();
        if held.is_empty() {
            return None;
        }
        precedence
            .iter()
            .find(|candidate| held.iter().any(|v| v == candidate))
            .cloned()
    }
}
