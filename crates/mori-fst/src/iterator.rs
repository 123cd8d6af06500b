// Ordered iteration over a transducer, optionally intersected with a byte
// automaton, inside a half-open key window.
//
// The iterator keeps parallel stacks, one entry per depth of the current
// path: the transducer state, the automaton state, the byte taken, the
// index of that byte in the parent's transition list (for resumption after
// a pop), and the output the edge contributed. Transitions are sorted
// ascending and advancement always resumes at the successor of the last
// taken index, so emitted keys are strictly ascending.

use crate::automaton::Automaton;
use crate::decoder::StateView;
use crate::fst::Fst;
use crate::Error;

/// Iterator over `(key, value)` pairs in ascending byte order.
///
/// Construct through [`Fst::iter`], [`Fst::range`] or [`Fst::search`]; the
/// constructor positions the iterator on its first entry. Not shareable:
/// each reader owns its iterator (and its automaton states).
pub struct FstIterator<'f, A: Automaton> {
    fst: &'f Fst,
    aut: A,
    start: Vec<u8>,
    end: Option<Vec<u8>>,

    states: Vec<StateView<'f>>,
    aut_states: Vec<A::State>,
    keys: Vec<u8>,
    key_pos: Vec<usize>,
    vals: Vec<u64>,
}

impl<'f, A: Automaton> FstIterator<'f, A> {
    pub(crate) fn new(
        fst: &'f Fst,
        aut: A,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<FstIterator<'f, A>, Error> {
        let mut it = FstIterator {
            fst,
            aut,
            start: start.unwrap_or_default().to_vec(),
            end: end.map(|e| e.to_vec()),
            states: Vec::new(),
            aut_states: Vec::new(),
            keys: Vec::new(),
            key_pos: Vec::new(),
            vals: Vec::new(),
        };
        let key = it.start.clone();
        it.point_to(&key)?;
        Ok(it)
    }

    /// The pair currently pointed at, or `None` when the iterator is not
    /// on a valid entry (after an error from the constructor, `next` or
    /// `seek`).
    pub fn current(&self) -> Option<(&[u8], u64)> {
        let depth = self.states.len().checked_sub(1)?;
        let curr = &self.states[depth];
        if curr.is_final() && self.aut.is_match(&self.aut_states[depth]) {
            let total: u64 = self.vals.iter().sum::<u64>() + curr.final_output();
            Some((self.keys.as_slice(), total))
        } else {
            None
        }
    }

    /// Advance to the next pair. Returns [`Error::IteratorDone`] once the
    /// window is exhausted; calling again keeps returning it.
    pub fn next(&mut self) -> Result<(), Error> {
        self.step(None)
    }

    /// Reposition on the least key `>= max(key, start)` inside the window.
    pub fn seek(&mut self, key: &[u8]) -> Result<(), Error> {
        self.point_to(key)
    }

    /// Descend along `key` (clamped to the window), then settle on the
    /// first valid entry at or after it.
    fn point_to(&mut self, key: &[u8]) -> Result<(), Error> {
        let key: Vec<u8> = if key < self.start.as_slice() {
            self.start.clone()
        } else if self.end.as_deref().is_some_and(|end| key > end) {
            self.end.clone().unwrap_or_default()
        } else {
            key.to_vec()
        };

        self.states.clear();
        self.aut_states.clear();
        self.keys.clear();
        self.key_pos.clear();
        self.vals.clear();

        self.states.push(self.fst.root());
        self.aut_states.push(self.aut.start());

        // index to resume from at the depth where the descent stopped
        let mut resume: Option<usize> = None;
        for &b in &key {
            let depth = self.states.len() - 1;
            let curr = self.states[depth];
            let followed = match curr.find_input(b) {
                Some(pos) => {
                    let aut_next = self.aut.accept(&self.aut_states[depth], b);
                    // a dead automaton state prunes like a missing edge
                    if self.aut.can_match(&aut_next) {
                        Some((pos, aut_next))
                    } else {
                        None
                    }
                }
                None => None,
            };
            match followed {
                Some((pos, aut_next)) => {
                    let t = curr.transition(pos);
                    self.states.push(self.fst.state_at(t.addr));
                    self.aut_states.push(aut_next);
                    self.keys.push(b);
                    self.key_pos.push(pos);
                    self.vals.push(t.out);
                }
                None => {
                    for q in 0..curr.num_transitions() {
                        if curr.input(q) < b {
                            resume = Some(q);
                        }
                    }
                    break;
                }
            }
        }

        let depth = self.states.len() - 1;
        let positioned = self.states[depth].is_final()
            && self.aut.is_match(&self.aut_states[depth])
            && self.keys == key
            && self
                .end
                .as_deref()
                .is_none_or(|end| self.keys.as_slice() < end);
        if positioned {
            Ok(())
        } else {
            self.step(resume)
        }
    }

    /// Walk forward until a final, matching state with a key strictly
    /// greater than the one held at entry.
    fn step(&mut self, mut resume: Option<usize>) -> Result<(), Error> {
        let entry = self.keys.clone();
        loop {
            let depth = self.states.len() - 1;
            let curr = self.states[depth];

            if curr.is_final()
                && self.aut.is_match(&self.aut_states[depth])
                && self.keys > entry
            {
                return Ok(());
            }

            // try the next viable outgoing transition at this depth
            let always = self.aut.will_always_match(&self.aut_states[depth]);
            let mut next_idx = resume.map_or(0, |pos| pos + 1);
            resume = None;
            let mut pushed = false;
            while next_idx < curr.num_transitions() {
                let t = curr.transition(next_idx);
                let aut_next = self.aut.accept(&self.aut_states[depth], t.inp);
                if always || self.aut.can_match(&aut_next) {
                    self.keys.push(t.inp);
                    if self
                        .end
                        .as_deref()
                        .is_some_and(|end| self.keys.as_slice() >= end)
                    {
                        // keys ascend, so everything from here on is out of
                        // the window; unwind the probe byte and finish
                        self.keys.pop();
                        return Err(Error::IteratorDone);
                    }
                    self.states.push(self.fst.state_at(t.addr));
                    self.aut_states.push(aut_next);
                    self.key_pos.push(next_idx);
                    self.vals.push(t.out);
                    pushed = true;
                    break;
                }
                next_idx += 1;
            }
            if pushed {
                continue;
            }

            if self.states.len() > 1 {
                self.states.pop();
                self.aut_states.pop();
                self.keys.pop();
                self.vals.pop();
                resume = self.key_pos.pop();
            } else {
                return Err(Error::IteratorDone);
            }
        }
    }
}
