// Byte-automaton contract, intersected with the transducer at iteration
// time.

/// A finite automaton over bytes.
///
/// Implementations choose their own state representation through the
/// associated [`State`](Automaton::State) type: an integer index for
/// DFA-backed automata, a small struct for NFA simulations, `()` when no
/// state is needed. The iterator drives the automaton in lockstep with the
/// transducer walk and prunes subtrees whose automaton state can no longer
/// reach a match.
pub trait Automaton {
    /// Opaque traversal state handed back on every operation.
    type State;

    /// The start state.
    fn start(&self) -> Self::State;

    /// Whether the bytes consumed so far form a match.
    fn is_match(&self, state: &Self::State) -> bool;

    /// Whether at least one extension of the consumed bytes can match.
    /// Returning `false` marks a dead state and prunes the subtree.
    fn can_match(&self, state: &Self::State) -> bool;

    /// Whether every extension of the consumed bytes matches.
    fn will_always_match(&self, state: &Self::State) -> bool;

    /// The state after consuming `inp`.
    fn accept(&self, state: &Self::State, inp: u8) -> Self::State;
}

/// Automaton that accepts every byte string; used for unrestricted
/// iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysMatch;

impl Automaton for AlwaysMatch {
    type State = ();

    fn start(&self) -> Self::State {}

    fn is_match(&self, _state: &Self::State) -> bool {
        true
    }

    fn can_match(&self, _state: &Self::State) -> bool {
        true
    }

    fn will_always_match(&self, _state: &Self::State) -> bool {
        true
    }

    fn accept(&self, _state: &Self::State, _inp: u8) -> Self::State {}
}
