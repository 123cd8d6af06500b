// mori-cli: shared utilities for the mori command line tools.

use std::process;

/// Install the logger and read `RUST_LOG` for verbosity.
pub fn init_logging() {
    env_logger::init();
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Parse one `key,value` record: everything up to the last comma is the
/// key, the rest is a decimal u64. Splitting from the right lets keys
/// contain commas.
pub fn parse_record(line: &str) -> Result<(&str, u64), String> {
    let Some((key, val)) = line.rsplit_once(',') else {
        return Err(format!("malformed record (no value column): {line}"));
    };
    let val: u64 = val
        .trim()
        .parse()
        .map_err(|e| format!("bad value in record {line:?}: {e}"))?;
    Ok((key, val))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_record() {
        assert_eq!(parse_record("cat,5").unwrap(), ("cat", 5));
    }

    #[test]
    fn key_may_contain_commas() {
        assert_eq!(parse_record("a,b,c,42").unwrap(), ("a,b,c", 42));
    }

    #[test]
    fn rejects_missing_value() {
        assert!(parse_record("no-comma").is_err());
        assert!(parse_record("key,not-a-number").is_err());
    }
}
