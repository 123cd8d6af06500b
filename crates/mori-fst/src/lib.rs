//! Immutable on-disk finite state transducer (FST) mapping byte-string keys
//! to `u64` values.
//!
//! Keys are inserted in ascending lexicographic order through a [`Builder`],
//! which minimizes the transducer incrementally and streams the encoded
//! states to the output sink as soon as they freeze. The finished file is
//! opened as an [`Fst`] and queried by exact lookup, ordered range
//! iteration, or intersection with a caller-supplied byte [`Automaton`]
//! (prefix, fuzzy and similar searches over the key universe).
//!
//! # Architecture
//!
//! - `pack` -- variable-width integer codec and header code tables
//! - [`automaton`] -- the byte-automaton contract consumed by the iterator
//! - `registry` -- bounded MRU cache of frozen, equivalent subtrees
//! - [`builder`] -- incremental minimizing builder over a node arena
//! - `encoder` -- the v1 byte-aligned state encoder
//! - `decoder` -- random-access state views over the encoded bytes
//! - [`fst`] -- the read side: open, get, range, search
//! - [`iterator`] -- stack-based ordered iteration inside a key window
//! - [`export_dot`] -- GraphViz rendering of a live builder graph
//! - [`levenshtein`] -- edit-distance automaton for fuzzy search

pub mod automaton;
pub mod builder;
pub mod export_dot;
pub mod fst;
pub mod iterator;
pub mod levenshtein;

mod decoder;
mod encoder;
mod pack;
mod registry;

pub use automaton::{AlwaysMatch, Automaton};
pub use builder::{Builder, BuilderOpts};
pub use export_dot::export_builder_dot;
pub use fst::Fst;
pub use iterator::FstIterator;
pub use levenshtein::{Levenshtein, LevenshteinError};

/// Size of the fixed file header: version and transducer type, both `u64` LE.
pub(crate) const HEADER_SIZE: usize = 16;

/// Size of the v1 footer: entry count and root address, both `u64` LE.
pub(crate) const FOOTER_SIZE_V1: usize = 16;

/// Format version written and understood by the v1 codec.
pub(crate) const VERSION_V1: u64 = 1;

/// Error type for building, opening and iterating transducers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A key was inserted at or below the previously inserted key.
    #[error("keys must be inserted in ascending lexicographic order")]
    OutOfOrder,

    /// The iterator moved past the end of its window, or ran out of keys.
    /// Returned on every subsequent advance; never fatal.
    #[error("iterator is done")]
    IteratorDone,

    /// The file's version field has no registered codec.
    #[error("no codec registered for format version {0}")]
    UnknownVersion(u64),

    /// A fixed-size header or footer write completed only partially.
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },

    /// The file is smaller than the fixed header and footer.
    #[error("file too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// An underlying reader or writer failed. The builder or encoder state
    /// is undefined afterwards and should be abandoned.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
