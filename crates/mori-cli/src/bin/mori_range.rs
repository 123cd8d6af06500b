// mori-range: dump the contents of an FST file in key order.
//
// Usage:
//   mori-range <file.fst> [start] [end]
//
// Prints `key - value` lines for every entry in the half-open window
// [start, end); both bounds are optional.

use std::io::{self, Write};

use mori_fst::{Error, Fst};

fn main() {
    mori_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if mori_cli::wants_help(&args) {
        println!("mori-range: dump the contents of an FST file in key order.");
        println!();
        println!("Usage: mori-range <file.fst> [start] [end]");
        println!();
        println!("Prints `key - value` for every entry with start <= key < end.");
        return;
    }
    if args.is_empty() {
        mori_cli::fatal("path is required");
    }

    let fst = Fst::open(&args[0])
        .unwrap_or_else(|e| mori_cli::fatal(&format!("cannot open {}: {e}", args[0])));

    let start = args.get(1).map(|s| s.as_bytes());
    let end = args.get(2).map(|s| s.as_bytes());

    let mut it = match fst.range(start, end) {
        Ok(it) => it,
        Err(Error::IteratorDone) => return, // empty window
        Err(e) => mori_cli::fatal(&e.to_string()),
    };

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    loop {
        if let Some((key, val)) = it.current() {
            let _ = writeln!(out, "{} - {val}", String::from_utf8_lossy(key));
        }
        match it.next() {
            Ok(()) => {}
            Err(Error::IteratorDone) => break,
            Err(e) => mori_cli::fatal(&e.to_string()),
        }
    }
}
