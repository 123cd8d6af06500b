// GraphViz (dot) rendering of a live builder graph.

use std::fmt::Write as _;
use std::io::{self, BufWriter, Write};

use hashbrown::HashSet;

use crate::builder::{Builder, NodeId};

const DOT_HEADER: &str = "digraph g {\nrankdir=LR\n";
const DOT_FOOTER: &str = "}\n";

/// Write the builder's current graph in the GraphViz dot format. Final
/// states are drawn as double circles; edges carry `byte` or
/// `byte/output` labels; nodes with a nonzero final output are labeled
/// `id (output)`.
pub fn export_builder_dot<S: Write, W: Write>(
    builder: &Builder<S>,
    w: W,
) -> io::Result<()> {
    let mut bw = BufWriter::new(w);
    bw.write_all(DOT_HEADER.as_bytes())?;
    let mut seen = HashSet::new();
    export_state(builder, builder.root_id(), &mut bw, &mut seen)?;
    bw.write_all(DOT_FOOTER.as_bytes())?;
    bw.flush()
}

fn export_state<S: Write, W: Write>(
    builder: &Builder<S>,
    id: NodeId,
    bw: &mut BufWriter<W>,
    seen: &mut HashSet<NodeId>,
) -> io::Result<()> {
    if !seen.insert(id) {
        return Ok(());
    }
    let node = builder.node(id);

    let mut buf = String::new();
    if node.final_output != 0 {
        let _ = writeln!(buf, "{id} [label=\"{id} ({})\"]", node.final_output);
    }
    if node.is_final {
        let _ = writeln!(buf, "{id} [shape=doublecircle]");
    }
    for t in &node.transitions {
        if t.out != 0 {
            let _ = writeln!(buf, "{id} -> {} [label=\"{}/{}\"]", t.dest, t.inp as char, t.out);
        } else {
            let _ = writeln!(buf, "{id} -> {} [label=\"{}\"]", t.dest, t.inp as char);
        }
    }
    buf.push_str("\n\n");
    bw.write_all(buf.as_bytes())?;

    for t in &node.transitions {
        export_state(builder, t.dest, bw, seen)?;
    }
    Ok(())
}
