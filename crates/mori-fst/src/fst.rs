// The read side: an immutable transducer over an owned byte buffer.

use std::path::Path;

use crate::automaton::{AlwaysMatch, Automaton};
use crate::decoder::{self, StateView};
use crate::iterator::FstIterator;
use crate::{Error, FOOTER_SIZE_V1, HEADER_SIZE, VERSION_V1};

/// An immutable finite state transducer mapping byte keys to `u64` values.
///
/// The encoded bytes are held in an owned buffer; opening a file reads it
/// whole. Multiple iterators may be taken concurrently, each with its own
/// stacks. Resources are released on drop.
pub struct Fst {
    data: Vec<u8>,
    version: u64,
    len: u64,
    root_addr: u64,
}

impl Fst {
    /// Open a transducer file.
    pub fn open(path: impl AsRef<Path>) -> Result<Fst, Error> {
        let data = std::fs::read(path)?;
        Fst::from_bytes(data)
    }

    /// Load a transducer from its encoded bytes, validating the header and
    /// footer.
    pub fn from_bytes(data: Vec<u8>) -> Result<Fst, Error> {
        if data.len() < HEADER_SIZE + FOOTER_SIZE_V1 {
            return Err(Error::TooShort {
                expected: HEADER_SIZE + FOOTER_SIZE_V1,
                actual: data.len(),
            });
        }
        let (version, _ty) = decoder::decode_header(&data)?;
        if version != VERSION_V1 {
            return Err(Error::UnknownVersion(version));
        }
        let (len, root_addr) = decoder::decode_footer(&data);
        log::debug!("opened fst: {len} entries, root at {root_addr:#x}");
        Ok(Fst {
            data,
            version,
            len,
            root_addr,
        })
    }

    /// Value stored for `key`. `Some(0)` is a real value; absence is
    /// `None`.
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        let mut total = 0u64;
        let mut state = self.root();
        for &inp in key {
            let i = state.find_input(inp)?;
            let t = state.transition(i);
            total += t.out;
            state = self.state_at(t.addr);
        }
        if state.is_final() {
            Some(total + state.final_output())
        } else {
            None
        }
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Encoding version of the backing file.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Iterate every key/value pair in ascending key order.
    ///
    /// Returns [`Error::IteratorDone`] immediately when there is nothing to
    /// yield.
    pub fn iter(&self) -> Result<FstIterator<'_, AlwaysMatch>, Error> {
        self.range(None, None)
    }

    /// Iterate pairs inside the half-open window `[start, end)`, with
    /// `None` meaning unbounded on that side.
    pub fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<FstIterator<'_, AlwaysMatch>, Error> {
        self.search(AlwaysMatch, start, end)
    }

    /// Iterate pairs whose keys are accepted by `aut`, restricted to the
    /// window `[start, end)`.
    pub fn search<A: Automaton>(
        &self,
        aut: A,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<FstIterator<'_, A>, Error> {
        FstIterator::new(self, aut, start, end)
    }

    pub(crate) fn root(&self) -> StateView<'_> {
        self.state_at(self.root_addr)
    }

    pub(crate) fn state_at(&self, addr: u64) -> StateView<'_> {
        decoder::state_at(&self.data, addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn build(pairs: &[(&[u8], u64)]) -> Fst {
        let mut b = Builder::new(Vec::new()).unwrap();
        for &(k, v) in pairs {
            b.insert(k, v).unwrap();
        }
        Fst::from_bytes(b.close().unwrap()).unwrap()
    }

    #[test]
    fn get_round_trip() {
        let fst = build(&[(b"jul", 0), (b"mar", 0)]);
        assert_eq!(fst.get(b"jul"), Some(0));
        assert_eq!(fst.get(b"mar"), Some(0));
        assert_eq!(fst.get(b"abc"), None);
        assert_eq!(fst.get(b"ju"), None);
        assert_eq!(fst.get(b"juls"), None);
        assert_eq!(fst.len(), 2);
        assert_eq!(fst.version(), 1);
    }

    #[test]
    fn get_accumulates_outputs() {
        let fst = build(&[(b"cat", 5), (b"catch", 3)]);
        assert_eq!(fst.get(b"cat"), Some(5));
        assert_eq!(fst.get(b"catch"), Some(3));
        assert_eq!(fst.get(b"catc"), None);
    }

    #[test]
    fn shared_suffix_still_resolves() {
        let fst = build(&[(b"car", 7), (b"cat", 9)]);
        assert_eq!(fst.get(b"car"), Some(7));
        assert_eq!(fst.get(b"cat"), Some(9));
    }

    #[test]
    fn empty_fst() {
        let b = Builder::new(Vec::new()).unwrap();
        let fst = Fst::from_bytes(b.close().unwrap()).unwrap();
        assert!(fst.is_empty());
        assert_eq!(fst.get(b""), None);
        assert_eq!(fst.get(b"a"), None);
        assert!(matches!(fst.iter(), Err(Error::IteratorDone)));
    }

    #[test]
    fn empty_key_only() {
        let mut b = Builder::new(Vec::new()).unwrap();
        b.insert(b"", 0).unwrap();
        let fst = Fst::from_bytes(b.close().unwrap()).unwrap();
        assert_eq!(fst.get(b""), Some(0));
        assert_eq!(fst.get(b"a"), None);
        let it = fst.iter().unwrap();
        assert_eq!(it.current(), Some((&b""[..], 0)));
    }

    #[test]
    fn empty_key_with_value() {
        let mut b = Builder::new(Vec::new()).unwrap();
        b.insert(b"", 11).unwrap();
        b.insert(b"z", 4).unwrap();
        let fst = Fst::from_bytes(b.close().unwrap()).unwrap();
        assert_eq!(fst.get(b""), Some(11));
        assert_eq!(fst.get(b"z"), Some(4));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut b = Builder::new(Vec::new()).unwrap();
        b.insert(b"a", 1).unwrap();
        let mut bytes = b.close().unwrap();
        bytes[0] = 9;
        assert!(matches!(
            Fst::from_bytes(bytes),
            Err(Error::UnknownVersion(9))
        ));
    }

    #[test]
    fn rejects_truncated_file() {
        assert!(matches!(
            Fst::from_bytes(vec![1, 0, 0]),
            Err(Error::TooShort { .. })
        ));
    }
}
