// Bounded cache of frozen subtrees, answering "does an equivalent
// already-encoded state exist?".
//
// The table is `table_size` buckets of `mru_size` slots each. A lookup
// hashes the probe node, scans its bucket for a deep-equal entry, and
// either promotes the hit to the front or evicts the bucket's LRU slot and
// installs the probe. Equivalence compares destination node *identity*,
// not structure: a node is only probed after its whole subtree has been
// frozen, so equal subtrees already share destination ids.
//
// The cache is approximate. Equivalent subtrees that collide or age out of
// a bucket are encoded twice; the output stays correct, just larger.

use crate::builder::{NodeArena, NodeId};

const FNV_PRIME: u64 = 1_099_511_628_211;
const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;

pub(crate) struct Registry {
    table: Vec<Option<NodeId>>,
    table_size: usize,
    mru_size: usize,
}

impl Registry {
    /// A `table_size` of 0 disables reuse entirely.
    pub(crate) fn new(table_size: usize, mru_size: usize) -> Registry {
        Registry {
            table: vec![None; table_size * mru_size],
            table_size,
            mru_size,
        }
    }

    /// Look up an already-registered node equivalent to `node`. On a miss
    /// the probe is installed in place of the bucket's LRU entry and `None`
    /// is returned.
    pub(crate) fn entry(&mut self, arena: &NodeArena, node: NodeId) -> Option<NodeId> {
        if self.table.is_empty() {
            return None;
        }
        let bucket = self.hash(arena, node);
        let start = bucket * self.mru_size;
        let slots = &mut self.table[start..start + self.mru_size];

        if slots.len() == 1 {
            if let Some(cell) = slots[0] {
                if arena.equiv(cell, node) {
                    return Some(cell);
                }
            }
            slots[0] = Some(node);
            return None;
        }

        for i in 0..slots.len() {
            if let Some(ent) = slots[i] {
                if arena.equiv(ent, node) {
                    promote(slots, i);
                    return Some(ent);
                }
            }
        }

        let last = slots.len() - 1;
        slots[last] = Some(node);
        promote(slots, last);
        None
    }

    fn hash(&self, arena: &NodeArena, node: NodeId) -> usize {
        let n = &arena[node];
        let mut h = FNV_OFFSET;
        h ^= (n.is_final as u64).wrapping_mul(FNV_PRIME);
        h ^= n.final_output.wrapping_mul(FNV_PRIME);
        for t in &n.transitions {
            h ^= (t.inp as u64).wrapping_mul(FNV_PRIME);
            h ^= t.out.wrapping_mul(FNV_PRIME);
            h ^= (t.dest as u64).wrapping_mul(FNV_PRIME);
        }
        (h % self.table_size as u64) as usize
    }
}

/// Bubble the entry at `i` to the front of its bucket.
fn promote(slots: &mut [Option<NodeId>], i: usize) {
    for j in (1..=i).rev() {
        slots.swap(j - 1, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderTransition, NodeArena};

    /// A tiny arena with two structurally equal leaves, parents over each,
    /// and one distinct parent.
    fn fixture() -> (NodeArena, NodeId, NodeId, NodeId) {
        let mut arena = NodeArena::default();
        let leaf_a = arena.alloc();
        arena[leaf_a].is_final = true;
        let leaf_b = arena.alloc();
        arena[leaf_b].is_final = true;

        let parent1 = arena.alloc();
        arena[parent1].transitions.push(BuilderTransition {
            inp: b'x',
            out: 0,
            dest: leaf_a,
        });
        // same shape, same destination id: equivalent to parent1
        let parent2 = arena.alloc();
        arena[parent2].transitions.push(BuilderTransition {
            inp: b'x',
            out: 0,
            dest: leaf_a,
        });
        // same shape, different destination id: not equivalent
        let parent3 = arena.alloc();
        arena[parent3].transitions.push(BuilderTransition {
            inp: b'x',
            out: 0,
            dest: leaf_b,
        });
        (arena, parent1, parent2, parent3)
    }

    #[test]
    fn miss_installs_then_hit_returns_original() {
        let (arena, p1, p2, _p3) = fixture();
        let mut reg = Registry::new(16, 2);
        assert_eq!(reg.entry(&arena, p1), None);
        assert_eq!(reg.entry(&arena, p2), Some(p1));
    }

    #[test]
    fn destination_identity_distinguishes_nodes() {
        let (arena, p1, _p2, p3) = fixture();
        let mut reg = Registry::new(16, 2);
        assert_eq!(reg.entry(&arena, p1), None);
        // p3 points at a different (if structurally equal) leaf
        assert_eq!(reg.entry(&arena, p3), None);
    }

    #[test]
    fn single_slot_bucket_replaces_on_miss() {
        let (arena, p1, p2, p3) = fixture();
        // one bucket, one slot: every miss overwrites
        let mut reg = Registry::new(1, 1);
        assert_eq!(reg.entry(&arena, p1), None);
        assert_eq!(reg.entry(&arena, p3), None); // evicts p1
        assert_eq!(reg.entry(&arena, p2), None); // p1 is gone, miss again
        assert_eq!(reg.entry(&arena, p1), Some(p2));
    }

    #[test]
    fn zero_table_size_disables_reuse() {
        let (arena, p1, p2, _p3) = fixture();
        let mut reg = Registry::new(0, 2);
        assert_eq!(reg.entry(&arena, p1), None);
        assert_eq!(reg.entry(&arena, p2), None);
    }

    #[test]
    fn promote_moves_hit_to_front() {
        let (mut arena, p1, p2, p3) = fixture();
        // one bucket of two slots shared by everything
        let mut reg = Registry::new(1, 2);
        assert_eq!(reg.entry(&arena, p1), None); // bucket: [p1, -]
        assert_eq!(reg.entry(&arena, p3), None); // bucket: [p3, p1]
        assert_eq!(reg.entry(&arena, p2), Some(p1)); // hit promotes p1
        // p3 is now the LRU; a fresh distinct node evicts it
        let leaf_c = arena.alloc();
        arena[leaf_c].is_final = true;
        arena[leaf_c].final_output = 9;
        assert_eq!(reg.entry(&arena, leaf_c), None); // bucket: [leaf_c, p1]
        assert_eq!(reg.entry(&arena, p1), Some(p1));
    }
}
