// Levenshtein automaton: matches keys within a fixed edit distance of a
// query, measured over Unicode code points while the transducer walk stays
// on raw bytes.
//
// A code-point cost-row automaton drives a one-time compilation into a
// byte-level DFA (`dfa`), bridging code points to byte ranges with UTF-8
// scalar-range sequences (`utf8`). Matching during iteration is then a
// plain table walk.

mod dfa;
mod utf8;

use crate::automaton::Automaton;
use dfa::{Dfa, DfaBuilder, DEAD};

/// Maximum number of DFA states a single automaton may compile to.
pub const STATE_LIMIT: usize = 10_000;

/// Errors from building a [`Levenshtein`] automaton.
#[derive(Debug, thiserror::Error)]
pub enum LevenshteinError {
    /// The query/distance combination expands to more than the allowed
    /// number of DFA states.
    #[error("levenshtein automaton contains more than {0} states")]
    TooManyStates(usize),
}

/// Automaton accepting byte strings whose decoded form is within a given
/// edit distance of the query.
pub struct Levenshtein {
    dfa: Dfa,
    distance: u32,
}

impl Levenshtein {
    /// Compile an automaton for `query` at the given maximum edit
    /// distance.
    pub fn new(query: &str, distance: u32) -> Result<Levenshtein, LevenshteinError> {
        let prog = DynamicLevenshtein {
            query: query.to_owned(),
            distance,
        };
        let dfa = DfaBuilder::new(&prog).build()?;
        Ok(Levenshtein { dfa, distance })
    }

    /// The maximum edit distance this automaton matches at.
    pub fn distance(&self) -> u32 {
        self.distance
    }
}

impl Automaton for Levenshtein {
    /// Index into the compiled DFA; `None` once no match can be reached.
    type State = Option<u32>;

    fn start(&self) -> Option<u32> {
        Some(0)
    }

    fn is_match(&self, state: &Option<u32>) -> bool {
        state.is_some_and(|si| self.dfa.states[si as usize].is_match)
    }

    fn can_match(&self, state: &Option<u32>) -> bool {
        state.is_some()
    }

    fn will_always_match(&self, _state: &Option<u32>) -> bool {
        false
    }

    fn accept(&self, state: &Option<u32>, inp: u8) -> Option<u32> {
        state.and_then(|si| {
            let next = self.dfa.states[si as usize].next[inp as usize];
            if next == DEAD {
                None
            } else {
                Some(next)
            }
        })
    }
}

/// The classic dynamic-programming automaton over code points: a state is
/// the row of edit costs against the query, capped at `distance + 1`.
pub(crate) struct DynamicLevenshtein {
    pub(crate) query: String,
    pub(crate) distance: u32,
}

impl DynamicLevenshtein {
    pub(crate) fn start(&self) -> Vec<u32> {
        (0..=self.query.chars().count() as u32).collect()
    }

    pub(crate) fn is_match(&self, state: &[u32]) -> bool {
        state.last().is_some_and(|&cost| cost <= self.distance)
    }

    pub(crate) fn can_match(&self, state: &[u32]) -> bool {
        state.iter().min().is_some_and(|&min| min <= self.distance)
    }

    /// Advance the row by one consumed code point; `None` is the
    /// any-other-character step used for mismatch edges.
    pub(crate) fn accept(&self, state: &[u32], chr: Option<char>) -> Vec<u32> {
        let mut next = vec![state[0] + 1];
        for (i, c) in self.query.chars().enumerate() {
            let cost = if chr == Some(c) { 0 } else { 1 };
            let v = (next[i] + 1)
                .min(state[i + 1] + 1)
                .min(state[i] + cost);
            next.push(v.min(self.distance + 1));
        }
        next
    }
}
