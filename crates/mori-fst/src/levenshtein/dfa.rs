// Byte-level DFA compiled from the code-point cost-row automaton.
//
// Each distinct reachable cost row becomes one DFA state. Edges for the
// query's own code points are added precisely; every other code point goes
// through shared "mismatch" edges. Both kinds expand to byte edges via
// UTF-8 scalar-range sequences, inserting chain states for multi-byte
// encodings.

use hashbrown::{HashMap, HashSet};

use super::utf8::{Utf8Range, Utf8Sequences};
use super::{DynamicLevenshtein, LevenshteinError, STATE_LIMIT};

/// Sentinel for an absent byte edge.
pub(crate) const DEAD: u32 = u32::MAX;

pub(crate) struct DfaState {
    pub next: [u32; 256],
    pub is_match: bool,
}

pub(crate) struct Dfa {
    pub states: Vec<DfaState>,
}

pub(crate) struct DfaBuilder<'a> {
    dfa: Dfa,
    lev: &'a DynamicLevenshtein,
    /// Cost row -> DFA state index.
    cache: HashMap<Vec<u32>, u32>,
}

impl<'a> DfaBuilder<'a> {
    pub(crate) fn new(lev: &'a DynamicLevenshtein) -> DfaBuilder<'a> {
        DfaBuilder {
            dfa: Dfa { states: Vec::new() },
            lev,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn build(mut self) -> Result<Dfa, LevenshteinError> {
        let mut stack = vec![self.lev.start()];
        let mut seen: HashSet<u32> = HashSet::new();

        while let Some(lev_state) = stack.pop() {
            let Some(dfa_si) = self.cached(&lev_state) else {
                continue;
            };

            // shared edges for every code point the query does not name
            let mismatch = self.lev.accept(&lev_state, None);
            if let Some(mismatch_si) = self.cached(&mismatch) {
                self.add_utf8_sequences(false, dfa_si, mismatch_si, '\0', char::MAX);
                if seen.insert(mismatch_si) {
                    stack.push(mismatch);
                }
            }

            for (i, c) in self.lev.query.chars().enumerate() {
                if lev_state[i] > self.lev.distance {
                    continue;
                }
                let next = self.lev.accept(&lev_state, Some(c));
                if let Some(next_si) = self.cached(&next) {
                    self.add_utf8_sequences(true, dfa_si, next_si, c, c);
                    if seen.insert(next_si) {
                        stack.push(next);
                    }
                }
            }

            if self.dfa.states.len() > STATE_LIMIT {
                return Err(LevenshteinError::TooManyStates(STATE_LIMIT));
            }
        }

        Ok(self.dfa)
    }

    /// DFA state for a cost row, allocating on first sight. Rows that can
    /// no longer match have no state at all.
    fn cached(&mut self, lev_state: &[u32]) -> Option<u32> {
        if !self.lev.can_match(lev_state) {
            return None;
        }
        if let Some(&si) = self.cache.get(lev_state) {
            return Some(si);
        }
        let si = self.new_state(self.lev.is_match(lev_state));
        self.cache.insert(lev_state.to_vec(), si);
        Some(si)
    }

    /// Add byte edges from `from` to `to` for every code point in
    /// `[from_char, to_char]`, chaining fresh states for the leading bytes
    /// of multi-byte encodings. With `overwrite` unset, existing edges win
    /// (used by the mismatch fill so exact edges can be layered on top).
    fn add_utf8_sequences(
        &mut self,
        overwrite: bool,
        from: u32,
        to: u32,
        from_char: char,
        to_char: char,
    ) {
        for seq in Utf8Sequences::new(from_char as u32, to_char as u32) {
            let ranges = seq.as_slice();
            let mut fsi = from;
            for r in &ranges[..ranges.len() - 1] {
                let tsi = self.new_state(false);
                self.add_utf8_range(overwrite, fsi, tsi, r);
                fsi = tsi;
            }
            self.add_utf8_range(overwrite, fsi, to, &ranges[ranges.len() - 1]);
        }
    }

    fn add_utf8_range(&mut self, overwrite: bool, from: u32, to: u32, r: &Utf8Range) {
        for b in r.start..=r.end {
            let slot = &mut self.dfa.states[from as usize].next[b as usize];
            if overwrite || *slot == DEAD {
                *slot = to;
            }
        }
    }

    fn new_state(&mut self, is_match: bool) -> u32 {
        self.dfa.states.push(DfaState {
            next: [DEAD; 256],
            is_match,
        });
        (self.dfa.states.len() - 1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(query: &str, distance: u32) -> Dfa {
        let lev = DynamicLevenshtein {
            query: query.to_owned(),
            distance,
        };
        DfaBuilder::new(&lev).build().unwrap()
    }

    fn walk(dfa: &Dfa, input: &[u8]) -> Option<u32> {
        let mut si = 0u32;
        for &b in input {
            let next = dfa.states[si as usize].next[b as usize];
            if next == DEAD {
                return None;
            }
            si = next;
        }
        Some(si)
    }

    #[test]
    fn exact_walk_matches() {
        let dfa = build("abc", 0);
        let si = walk(&dfa, b"abc").unwrap();
        assert!(dfa.states[si as usize].is_match);
        assert_eq!(walk(&dfa, b"abd"), None);
    }

    #[test]
    fn within_distance_walk_matches() {
        let dfa = build("abc", 1);
        for ok in [&b"abc"[..], b"abd", b"ab", b"abcd", b"xbc"] {
            let si = walk(&dfa, ok).expect("live state");
            assert!(dfa.states[si as usize].is_match);
        }
    }

    #[test]
    fn beyond_distance_walk_dies() {
        let dfa = build("abc", 1);
        assert_eq!(walk(&dfa, b"xyc"), None);
    }

    #[test]
    fn multibyte_query_compiles() {
        // two-byte code points in the query round-trip through the
        // sequence chains
        let dfa = build("h\u{e4}t", 0);
        let si = walk(&dfa, "hät".as_bytes()).unwrap();
        assert!(dfa.states[si as usize].is_match);
        assert_eq!(walk(&dfa, b"hat"), None);
    }

    #[test]
    fn state_limit_is_enforced() {
        // a long query at a generous distance exceeds the state limit
        let query: String = (0..600).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let lev = DynamicLevenshtein {
            query,
            distance: 4,
        };
        assert!(matches!(
            DfaBuilder::new(&lev).build(),
            Err(LevenshteinError::TooManyStates(STATE_LIMIT))
        ));
    }
}
