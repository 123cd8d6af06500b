// Incremental minimizing builder.
//
// The live graph is a tree whose only mutable part is the spine: the path
// from the root to the terminal of the most recently inserted key. Each
// insert freezes the part of the previous spine that the new key diverges
// from, consulting the registry so equivalent frozen subtrees are encoded
// once, then appends the new key's suffix as a fresh chain of nodes.
//
// Nodes live in an arena and reference each other by index. A slot is
// recycled only when a just-frozen probe node is replaced by a registry
// equivalent or by the implicit final state: such a node was never
// installed in the registry and its only referencer was the spine parent
// that just swapped it out, so reuse cannot alias an id the registry still
// holds.

use std::io::Write;
use std::ops::{Index, IndexMut};

use crate::encoder::EncoderV1;
use crate::registry::Registry;
use crate::{Error, VERSION_V1};

/// Arena index of a builder node. Doubles as the node's identity for
/// registry equivalence and as its label in GraphViz exports.
pub(crate) type NodeId = usize;

/// One outgoing edge of a builder node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BuilderTransition {
    pub inp: u8,
    pub out: u64,
    pub dest: NodeId,
}

/// A state of the live graph. Transitions stay sorted ascending by input
/// byte because keys arrive in ascending order; the last transition is
/// always the one the current spine runs through.
#[derive(Debug, Default)]
pub(crate) struct BuilderNode {
    pub is_final: bool,
    pub final_output: u64,
    pub transitions: Vec<BuilderTransition>,
    /// Byte offset of the encoded state, once frozen. The implicit final
    /// state freezes at address 0 without emitting anything.
    pub addr: Option<u64>,
}

impl BuilderNode {
    pub(crate) fn has_transitions(&self) -> bool {
        !self.transitions.is_empty()
    }

    pub(crate) fn find_transition(&self, inp: u8) -> Option<usize> {
        self.transitions.iter().position(|t| t.inp == inp)
    }

    pub(crate) fn last_transition(&self) -> Option<BuilderTransition> {
        self.transitions.last().copied()
    }

    pub(crate) fn replace_transition(&mut self, replacement: BuilderTransition) {
        if let Some(pos) = self.find_transition(replacement.inp) {
            self.transitions[pos] = replacement;
        }
    }
}

/// Grow-mostly arena of builder nodes.
#[derive(Default)]
pub(crate) struct NodeArena {
    nodes: Vec<BuilderNode>,
    free: Vec<NodeId>,
}

impl NodeArena {
    pub(crate) fn alloc(&mut self) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = BuilderNode::default();
            id
        } else {
            self.nodes.push(BuilderNode::default());
            self.nodes.len() - 1
        }
    }

    pub(crate) fn free(&mut self, id: NodeId) {
        self.free.push(id);
    }

    /// Deep equality up to one level: destinations compare by identity.
    pub(crate) fn equiv(&self, a: NodeId, b: NodeId) -> bool {
        let (a, b) = (&self[a], &self[b]);
        a.is_final == b.is_final
            && a.final_output == b.final_output
            && a.transitions == b.transitions
    }
}

impl Index<NodeId> for NodeArena {
    type Output = BuilderNode;

    fn index(&self, id: NodeId) -> &BuilderNode {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut BuilderNode {
        &mut self.nodes[id]
    }
}

/// Options controlling a [`Builder`].
#[derive(Debug, Clone)]
pub struct BuilderOpts {
    /// Encoding version to write. Only version 1 is registered.
    pub encoder_version: u64,
    /// Number of registry buckets. `0` disables subtree reuse; the output
    /// stays correct but grows.
    pub registry_table_size: usize,
    /// Slots per registry bucket.
    pub registry_mru_size: usize,
}

impl Default for BuilderOpts {
    fn default() -> BuilderOpts {
        BuilderOpts {
            encoder_version: VERSION_V1,
            registry_table_size: 10_000,
            registry_mru_size: 2,
        }
    }
}

/// Builds a transducer from keys inserted in ascending lexicographic
/// order, streaming encoded states to `w` as they freeze.
pub struct Builder<W: Write> {
    arena: NodeArena,
    root: NodeId,
    node_count: usize,
    last_key: Vec<u8>,
    len: usize,
    registry: Registry,
    encoder: EncoderV1<W>,
    implicit_final: Option<NodeId>,
}

impl<W: Write> Builder<W> {
    /// Create a builder with default options and write the file header.
    pub fn new(w: W) -> Result<Builder<W>, Error> {
        Builder::with_opts(w, BuilderOpts::default())
    }

    /// Create a builder with explicit options and write the file header.
    pub fn with_opts(w: W, opts: BuilderOpts) -> Result<Builder<W>, Error> {
        if opts.encoder_version != VERSION_V1 {
            return Err(Error::UnknownVersion(opts.encoder_version));
        }
        let mut arena = NodeArena::default();
        let root = arena.alloc();
        let mut encoder = EncoderV1::new(w);
        encoder.start()?;
        Ok(Builder {
            arena,
            root,
            node_count: 1,
            last_key: Vec::new(),
            len: 0,
            registry: Registry::new(opts.registry_table_size, opts.registry_mru_size),
            encoder,
            implicit_final: None,
        })
    }

    /// Insert a key/value pair. Keys must arrive in strictly ascending
    /// byte order; anything at or below the previous key is rejected with
    /// [`Error::OutOfOrder`] and the builder stays usable.
    pub fn insert(&mut self, key: &[u8], val: u64) -> Result<(), Error> {
        if self.len > 0 && key <= self.last_key.as_slice() {
            return Err(Error::OutOfOrder);
        }
        let common_len = common_prefix_len(&self.last_key, key);
        self.last_key.clear();
        self.last_key.extend_from_slice(key);

        // walk the shared prefix, pushing outputs down as needed
        let (opt_state, residual) = self.traverse_insert(&key[..common_len], val);
        // freeze the part of the old spine the new key diverges from
        self.optimize(opt_state)?;
        // grow the new suffix, carrying the residual on its first edge
        self.add_suffix(opt_state, &key[common_len..], residual);
        self.len += 1;
        Ok(())
    }

    /// Finish the transducer: freeze and encode the root, write the footer
    /// and return the flushed sink.
    pub fn close(mut self) -> Result<W, Error> {
        let root_addr = self.finalize()?;
        log::debug!(
            "fst build complete: {} entries, {} nodes, root at {root_addr:#x}",
            self.len,
            self.node_count
        );
        self.encoder.finish(self.len as u64, root_addr)?;
        self.encoder.into_inner()
    }

    /// Number of keys inserted so far.
    pub fn num_entries(&self) -> usize {
        self.len
    }

    /// Number of live nodes in the graph, counting the root.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Read a key back from the live graph: `Some(total)` iff the path
    /// exists and ends in a final state. Useful for containment checks
    /// while the builder is still open.
    pub fn traverse(&self, key: &[u8]) -> Option<u64> {
        let mut state = self.root;
        let mut val = 0u64;
        for &inp in key {
            let pos = self.arena[state].find_transition(inp)?;
            let t = self.arena[state].transitions[pos];
            val += t.out;
            state = t.dest;
        }
        let node = &self.arena[state];
        if node.is_final {
            Some(val + node.final_output)
        } else {
            None
        }
    }

    /// Whether the live graph accepts `key`.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.traverse(key).is_some()
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }

    pub(crate) fn node(&self, id: NodeId) -> &BuilderNode {
        &self.arena[id]
    }

    /// Freeze and encode the root; shared by `close` and the tests that
    /// inspect node counts afterwards.
    fn finalize(&mut self) -> Result<u64, Error> {
        self.last_key.clear();
        self.optimize(self.root)?;
        let root_addr = self.encoder.encode_state(&self.arena, self.root)?;
        self.arena[self.root].addr = Some(root_addr);
        Ok(root_addr)
    }

    /// Walk the spine along `prefix`, consuming the stored outputs from
    /// `val`. When an edge already carries more than the remaining value,
    /// the difference is pushed onto every outgoing edge of its destination
    /// (and its final output) so no previously inserted total changes.
    fn traverse_insert(&mut self, prefix: &[u8], mut val: u64) -> (NodeId, u64) {
        let mut state = self.root;
        for &inp in prefix {
            let Some(pos) = self.arena[state].find_transition(inp) else {
                // the common prefix is always present in the live graph
                return (state, val);
            };
            let mut adjustment = 0u64;
            {
                let t = &mut self.arena[state].transitions[pos];
                if t.out > val {
                    let diff = t.out - val;
                    adjustment = diff;
                    t.out -= diff;
                    val = 0;
                } else {
                    val -= t.out;
                }
            }
            let dest = self.arena[state].transitions[pos].dest;
            if adjustment > 0 {
                let d = &mut self.arena[dest];
                if d.is_final {
                    d.final_output += adjustment;
                }
                for dt in &mut d.transitions {
                    dt.out += adjustment;
                }
            }
            state = dest;
        }
        (state, val)
    }

    /// Recursively freeze the subtree hanging off `state`'s last
    /// transition. Leaf-ward nodes freeze first so every destination has an
    /// address (or a registry identity) before its parent is probed.
    fn optimize(&mut self, state: NodeId) -> Result<(), Error> {
        let Some(last) = self.arena[state].last_transition() else {
            return Ok(());
        };
        self.optimize(last.dest)?;

        let dest = &self.arena[last.dest];
        if dest.is_final && !dest.has_transitions() && dest.final_output == 0 {
            // the universal terminal: held out of the registry so it never
            // costs a slot, and encoded as address 0
            match self.implicit_final {
                None => {
                    self.implicit_final = Some(last.dest);
                    self.arena[last.dest].addr = Some(0);
                }
                Some(implicit) => {
                    self.arena[state].replace_transition(BuilderTransition {
                        inp: last.inp,
                        out: last.out,
                        dest: implicit,
                    });
                    self.node_count -= 1;
                    self.arena.free(last.dest);
                }
            }
            return Ok(());
        }

        if let Some(equiv) = self.registry.entry(&self.arena, last.dest) {
            self.arena[state].replace_transition(BuilderTransition {
                inp: last.inp,
                out: last.out,
                dest: equiv,
            });
            self.node_count -= 1;
            self.arena.free(last.dest);
        } else {
            let addr = self.encoder.encode_state(&self.arena, last.dest)?;
            self.arena[last.dest].addr = Some(addr);
        }
        Ok(())
    }

    /// Append `suffix` as a fresh chain under `start`, attaching the
    /// residual output to the first new edge and marking the terminal
    /// final. An empty suffix (only possible for the empty key, inserted
    /// first) lands the residual in the final output instead.
    fn add_suffix(&mut self, start: NodeId, suffix: &[u8], val: u64) {
        if suffix.is_empty() {
            let node = &mut self.arena[start];
            node.is_final = true;
            node.final_output = val;
            return;
        }
        let mut node = start;
        for (i, &inp) in suffix.iter().enumerate() {
            let new_node = self.arena.alloc();
            let out = if i == 0 { val } else { 0 };
            self.arena[node].transitions.push(BuilderTransition {
                inp,
                out,
                dest: new_node,
            });
            node = new_node;
            self.node_count += 1;
        }
        self.arena[node].is_final = true;
    }
}

/// Length of the common prefix of two byte slices.
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
