// v1 state decoder: random-access views over the encoded bytes.
//
// A state is parsed backwards from its address (the offset of its header
// byte). Parsing fills in block offsets only; transition fields are read
// on demand, so a view never allocates. The file-level header and footer
// are validated once at open; state parsing itself trusts the bytes, the
// same way the traversal side of a validated transition table is trusted.

use crate::pack::{common_input, decode_pack_size, read_packed};
use crate::{Error, FOOTER_SIZE_V1, HEADER_SIZE};

const ONE_TRANSITION: u8 = 1 << 7;
const TRANSITION_NEXT: u8 = 1 << 6;
const STATE_FINAL: u8 = 1 << 6;

/// Parse the 16-byte file header into (version, transducer type).
pub(crate) fn decode_header(data: &[u8]) -> Result<(u64, u64), Error> {
    if data.len() < HEADER_SIZE {
        return Err(Error::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }
    let version = read_packed(&data[..8]);
    let ty = read_packed(&data[8..16]);
    Ok((version, ty))
}

/// Parse the v1 footer into (entry count, root address).
pub(crate) fn decode_footer(data: &[u8]) -> (u64, u64) {
    let base = data.len() - FOOTER_SIZE_V1;
    let count = read_packed(&data[base..base + 8]);
    let root = read_packed(&data[base + 8..base + 16]);
    (count, root)
}

/// A decoded transition: input byte, destination address, output value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub inp: u8,
    pub addr: u64,
    pub out: u64,
}

/// Read-only view of one encoded state. Copy-cheap; borrows the backing
/// buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StateView<'d> {
    /// The canonical final state at address 0: final, no output, no
    /// transitions. Never materialized in the byte stream.
    EmptyFinal,
    /// Single-transition, non-final state; decoded eagerly.
    One { inp: u8, dest: u64, out: u64 },
    /// The general form.
    Many {
        data: &'d [u8],
        ntrans: usize,
        is_final: bool,
        trans_pack: usize,
        out_pack: usize,
        /// Offset of the first (smallest) transition's input byte.
        inputs_end: usize,
        /// Offset of the state's first byte; deltas are relative to it.
        start: u64,
    },
}

/// Materialize the state at `addr`.
pub(crate) fn state_at(data: &[u8], addr: u64) -> StateView<'_> {
    if addr == 0 {
        return StateView::EmptyFinal;
    }
    let addr = addr as usize;
    let header = data[addr];
    if header & ONE_TRANSITION != 0 {
        decode_one(data, addr, header)
    } else {
        decode_many(data, addr, header)
    }
}

fn decode_one(data: &[u8], addr: usize, header: u8) -> StateView<'_> {
    let code = header & 0x0F;
    if header & TRANSITION_NEXT != 0 {
        // destination is the state emitted just before this one
        let (inp, size) = if code != 0 {
            (common_input(code), 1)
        } else {
            (data[addr - 1], 2)
        };
        return StateView::One {
            inp,
            dest: (addr - size) as u64,
            out: 0,
        };
    }

    let mut pos = addr - 1;
    let inp = if code != 0 {
        common_input(code)
    } else {
        let b = data[pos];
        pos -= 1;
        b
    };
    let (trans_pack, out_pack) = decode_pack_size(data[pos]);
    pos -= 1;
    let delta = read_packed(&data[pos + 1 - trans_pack..pos + 1]);
    let out = if out_pack > 0 {
        read_packed(&data[pos + 1 - trans_pack - out_pack..pos + 1 - trans_pack])
    } else {
        0
    };
    let start = (pos + 1 - trans_pack - out_pack) as u64;
    let dest = if delta == 0 { 0 } else { start - delta };
    StateView::One { inp, dest, out }
}

fn decode_many(data: &[u8], addr: usize, header: u8) -> StateView<'_> {
    let is_final = header & STATE_FINAL != 0;
    let mut pos = addr - 1;
    let inline = (header & 0x3F) as usize;
    let ntrans = if inline != 0 {
        inline
    } else {
        let count = data[pos] as usize;
        pos -= 1;
        // 256 is stored as 1, which always fits inline and so never
        // appears in the count byte otherwise
        if count == 1 {
            256
        } else {
            count
        }
    };
    let (trans_pack, out_pack) = decode_pack_size(data[pos]);
    let inputs_end = pos - 1;
    let blocks = ntrans + ntrans * trans_pack + ntrans * out_pack;
    let final_out_width = if is_final && out_pack > 0 { out_pack } else { 0 };
    let start = (inputs_end + 1 - blocks - final_out_width) as u64;
    StateView::Many {
        data,
        ntrans,
        is_final,
        trans_pack,
        out_pack,
        inputs_end,
        start,
    }
}

impl<'d> StateView<'d> {
    pub(crate) fn is_final(&self) -> bool {
        match self {
            StateView::EmptyFinal => true,
            StateView::One { .. } => false,
            StateView::Many { is_final, .. } => *is_final,
        }
    }

    pub(crate) fn final_output(&self) -> u64 {
        match *self {
            StateView::Many {
                data,
                is_final: true,
                out_pack,
                start,
                ..
            } if out_pack > 0 => {
                let start = start as usize;
                read_packed(&data[start..start + out_pack])
            }
            _ => 0,
        }
    }

    pub(crate) fn num_transitions(&self) -> usize {
        match self {
            StateView::EmptyFinal => 0,
            StateView::One { .. } => 1,
            StateView::Many { ntrans, .. } => *ntrans,
        }
    }

    /// Input byte of transition `i`, with `i = 0` the smallest input.
    pub(crate) fn input(&self, i: usize) -> u8 {
        match *self {
            StateView::EmptyFinal => unreachable!("empty state has no transitions"),
            StateView::One { inp, .. } => inp,
            StateView::Many {
                data, inputs_end, ..
            } => data[inputs_end - i],
        }
    }

    /// Full transition `i` in ascending input order.
    pub(crate) fn transition(&self, i: usize) -> Transition {
        match *self {
            StateView::EmptyFinal => unreachable!("empty state has no transitions"),
            StateView::One { inp, dest, out } => Transition {
                inp,
                addr: dest,
                out,
            },
            StateView::Many {
                data,
                ntrans,
                trans_pack,
                out_pack,
                inputs_end,
                start,
                ..
            } => {
                let inp = data[inputs_end - i];
                let deltas_end = inputs_end - ntrans;
                let hi = deltas_end + 1 - i * trans_pack;
                let delta = read_packed(&data[hi - trans_pack..hi]);
                let out = if out_pack > 0 {
                    let outs_end = deltas_end - ntrans * trans_pack;
                    let hi = outs_end + 1 - i * out_pack;
                    read_packed(&data[hi - out_pack..hi])
                } else {
                    0
                };
                let addr = if delta == 0 { 0 } else { start - delta };
                Transition { inp, addr, out }
            }
        }
    }

    /// Index of the transition for input `b`, if present. Transitions are
    /// few and sorted; a linear scan with early exit is enough.
    pub(crate) fn find_input(&self, b: u8) -> Option<usize> {
        for i in 0..self.num_transitions() {
            let inp = self.input(i);
            if inp == b {
                return Some(i);
            }
            if inp > b {
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The encoded stream pinned by the encoder tests:
    //   B at 18: 'e' -> 0, C at 20: 'z' -> B, D at 29: final(5) with
    //   'a'/2 -> B and 'b'/0 -> C.
    fn sample() -> Vec<u8> {
        let mut data = vec![0u8; 16];
        data[0] = 1; // version
        data.extend_from_slice(&[
            0x00, 0x10, 0x81, // B
            b'z', 0xC0, // C
            0x05, 0x00, 0x02, 0x01, 0x03, b'b', b'a', 0x11, 0x42, // D
        ]);
        data
    }

    #[test]
    fn header_and_footer() {
        let mut data = sample();
        data.extend_from_slice(&7u64.to_le_bytes());
        data.extend_from_slice(&29u64.to_le_bytes());
        let (version, ty) = decode_header(&data).unwrap();
        assert_eq!(version, 1);
        assert_eq!(ty, 0);
        assert_eq!(decode_footer(&data), (7, 29));
    }

    #[test]
    fn header_too_short() {
        assert!(matches!(
            decode_header(&[0u8; 8]),
            Err(Error::TooShort {
                expected: 16,
                actual: 8
            })
        ));
    }

    #[test]
    fn address_zero_is_empty_final() {
        let data = sample();
        let s = state_at(&data, 0);
        assert!(s.is_final());
        assert_eq!(s.final_output(), 0);
        assert_eq!(s.num_transitions(), 0);
        assert_eq!(s.find_input(b'a'), None);
    }

    #[test]
    fn one_transition_general_form() {
        let data = sample();
        let s = state_at(&data, 18);
        assert!(!s.is_final());
        assert_eq!(s.num_transitions(), 1);
        assert_eq!(s.input(0), b'e');
        assert_eq!(
            s.transition(0),
            Transition {
                inp: b'e',
                addr: 0,
                out: 0
            }
        );
        assert_eq!(s.find_input(b'e'), Some(0));
        assert_eq!(s.find_input(b'f'), None);
    }

    #[test]
    fn one_transition_next_form() {
        let data = sample();
        let s = state_at(&data, 20);
        assert_eq!(
            s.transition(0),
            Transition {
                inp: b'z',
                addr: 18,
                out: 0
            }
        );
    }

    #[test]
    fn many_transitions_form() {
        let data = sample();
        let s = state_at(&data, 29);
        assert!(s.is_final());
        assert_eq!(s.final_output(), 5);
        assert_eq!(s.num_transitions(), 2);
        assert_eq!(
            s.transition(0),
            Transition {
                inp: b'a',
                addr: 18,
                out: 2
            }
        );
        assert_eq!(
            s.transition(1),
            Transition {
                inp: b'b',
                addr: 20,
                out: 0
            }
        );
        assert_eq!(s.find_input(b'a'), Some(0));
        assert_eq!(s.find_input(b'b'), Some(1));
        assert_eq!(s.find_input(b'c'), None);
    }
}
