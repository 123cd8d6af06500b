// mori-build: build an FST file from a two-column CSV.
//
// Reads `key,value` lines (value is a decimal u64) and inserts them in
// file order, so the input must already be sorted by key.
//
// Usage:
//   mori-build <in.csv> <out.fst>

use std::fs::File;
use std::io::{BufRead, BufReader};

use mori_fst::Builder;

fn main() {
    mori_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if mori_cli::wants_help(&args) {
        println!("mori-build: build an FST file from a two-column CSV.");
        println!();
        println!("Usage: mori-build <in.csv> <out.fst>");
        println!();
        println!("Each line is `key,value` with a decimal u64 value. Lines");
        println!("must already be sorted ascending by key.");
        return;
    }
    if args.len() < 2 {
        mori_cli::fatal("input and output paths required");
    }

    let input = File::open(&args[0])
        .unwrap_or_else(|e| mori_cli::fatal(&format!("cannot open {}: {e}", args[0])));
    let output = File::create(&args[1])
        .unwrap_or_else(|e| mori_cli::fatal(&format!("cannot create {}: {e}", args[1])));

    let mut builder =
        Builder::new(output).unwrap_or_else(|e| mori_cli::fatal(&e.to_string()));

    let mut count = 0u64;
    for line in BufReader::new(input).lines() {
        let line = line.unwrap_or_else(|e| mori_cli::fatal(&format!("read error: {e}")));
        if line.is_empty() {
            continue;
        }
        let (key, val) =
            mori_cli::parse_record(&line).unwrap_or_else(|e| mori_cli::fatal(&e));
        builder
            .insert(key.as_bytes(), val)
            .unwrap_or_else(|e| mori_cli::fatal(&format!("insert {key:?}: {e}")));
        count += 1;
    }

    builder
        .close()
        .unwrap_or_else(|e| mori_cli::fatal(&e.to_string()));
    log::info!("built {} from {}", args[1], args[0]);
    println!("inserted {count} records");
}
