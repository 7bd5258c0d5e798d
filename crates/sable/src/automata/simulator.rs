//! Deterministic simulation over a frozen DFA.

use super::{FiniteAutomaton, StateId};

/// Result of feeding one character to a [`DfaSimulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStatus {
    /// The character moved the simulator into an accepting state.
    Accept,
    /// The character moved the simulator into a non-accepting state.
    Reject,
    /// No transition matched; the simulator is stuck until [`DfaSimulator::reset`].
    Error,
}

/// Walks a DFA one character at a time.
///
/// The automaton must satisfy the DFA invariant (no epsilon edges, at most
/// one transition per input), which [`FiniteAutomaton::to_dfa`] guarantees by
/// construction.
#[derive(Debug, Clone)]
pub struct DfaSimulator<'a, V> {
    automaton: &'a FiniteAutomaton<V>,
    current: Option<StateId>,
}

impl<'a, V> DfaSimulator<'a, V> {
    #[must_use]
    pub fn new(automaton: &'a FiniteAutomaton<V>) -> Self {
        Self {
            automaton,
            current: Some(automaton.start()),
        }
    }

    /// Feeds one character. Once stuck, stays stuck until [`Self::reset`].
    pub fn consume(&mut self, c: char) -> SimulationStatus {
        let Some(state) = self.current else {
            return SimulationStatus::Error;
        };
        let target = self.automaton.edges_from(state).find_map(|edge| {
            edge.label
                .as_ref()
                .is_some_and(|label| label.contains(c))
                .then_some(edge.to)
        });
        match target {
            Some(to) => {
                self.current = Some(to);
                if self.automaton.value(to).is_some() {
                    SimulationStatus::Accept
                } else {
                    SimulationStatus::Reject
                }
            }
            None => {
                self.current = None;
                SimulationStatus::Error
            }
        }
    }

    /// The accept value of the current state, if accepting.
    #[must_use]
    pub fn current_value(&self) -> Option<&'a V> {
        self.current.and_then(|s| self.automaton.value(s))
    }

    /// Returns to the start state.
    pub fn reset(&mut self) {
        self.current = Some(self.automaton.start());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::NfaBuilder;
    use crate::charset::CharSet;

    fn two_char_dfa() -> FiniteAutomaton<&'static str> {
        let mut builder = NfaBuilder::new();
        let s0 = builder.add_state();
        let s1 = builder.add_state();
        let s2 = builder.add_accept_state("ab");
        builder.add_edge(s0, CharSet::single('a'), s1);
        builder.add_edge(s1, CharSet::single('b'), s2);
        builder.build()
    }

    #[test]
    fn accepts_then_errors() {
        let dfa = two_char_dfa();
        let mut sim = DfaSimulator::new(&dfa);
        assert_eq!(sim.consume('a'), SimulationStatus::Reject);
        assert_eq!(sim.consume('b'), SimulationStatus::Accept);
        assert_eq!(sim.current_value(), Some(&"ab"));
        assert_eq!(sim.consume('c'), SimulationStatus::Error);
        // stuck until reset
        assert_eq!(sim.consume('a'), SimulationStatus::Error);
        sim.reset();
        assert_eq!(sim.consume('a'), SimulationStatus::Reject);
    }
}
