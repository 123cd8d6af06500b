// v1 state encoder.
//
// States are emitted post-order, each laid out back to front: a state's
// address is the offset of its *last* byte, the header. Destinations are
// stored as positive deltas from the state's first byte, so referenced
// states always precede their referrers. Three forms:
//
//   zero byte   final, no transitions, no output -- nothing is emitted and
//               the state's address is 0
//   one-trans   non-final with a single transition; a compact variant
//               drops the address entirely when the destination is the
//               immediately preceding emitted state
//   many-trans  everything else; per-field blocks written in reverse
//               transition order, then pack-size, count and header bytes

use std::io::{BufWriter, Write};

use crate::builder::{BuilderTransition, NodeArena, NodeId};
use crate::pack::{
    delta_addr, encode_common, encode_num_trans, encode_pack_size, packed_size,
};
use crate::{Error, FOOTER_SIZE_V1, HEADER_SIZE, VERSION_V1};

const ONE_TRANSITION: u8 = 1 << 7;
const TRANSITION_NEXT: u8 = 1 << 6;
const STATE_FINAL: u8 = 1 << 6;

pub(crate) struct EncoderV1<W: Write> {
    w: BufWriter<W>,
    counter: u64,
    /// Address of the most recently emitted state. Zero-byte states never
    /// update this, and the initial `None` keeps a first state that points
    /// at address 0 out of the transition-next form.
    last_addr: Option<u64>,
}

impl<W: Write> EncoderV1<W> {
    pub(crate) fn new(w: W) -> EncoderV1<W> {
        EncoderV1 {
            w: BufWriter::new(w),
            counter: 0,
            last_addr: None,
        }
    }

    /// Write the 16-byte file header: version, then transducer type (0).
    pub(crate) fn start(&mut self) -> Result<(), Error> {
        let mut header = [0u8; HEADER_SIZE];
        header[..8].copy_from_slice(&VERSION_V1.to_le_bytes());
        let n = self.w.write(&header)?;
        self.counter += n as u64;
        if n != HEADER_SIZE {
            return Err(Error::ShortWrite {
                expected: HEADER_SIZE,
                actual: n,
            });
        }
        Ok(())
    }

    /// Encode a frozen node and return its address. Every destination must
    /// already be frozen.
    pub(crate) fn encode_state(&mut self, arena: &NodeArena, id: NodeId) -> Result<u64, Error> {
        let node = &arena[id];
        if node.transitions.is_empty() && node.is_final && node.final_output == 0 {
            return Ok(0);
        }
        let addr = if node.transitions.len() != 1 || node.is_final {
            self.encode_state_many(arena, id)?
        } else {
            let t = node.transitions[0];
            if t.out == 0 && Some(dest_addr(arena, &t)) == self.last_addr {
                self.encode_state_one_finish(t.inp, TRANSITION_NEXT)?
            } else {
                self.encode_state_one(arena, id)?
            }
        };
        self.last_addr = Some(addr);
        Ok(addr)
    }

    fn encode_state_one(&mut self, arena: &NodeArena, id: NodeId) -> Result<u64, Error> {
        let start = self.counter;
        let t = arena[id].transitions[0];
        let out_pack_size = if t.out != 0 {
            let size = packed_size(t.out);
            self.write_packed(t.out, size)?;
            size
        } else {
            0
        };
        let delta = delta_addr(start, dest_addr(arena, &t));
        let trans_pack_size = packed_size(delta);
        self.write_packed(delta, trans_pack_size)?;
        self.write_byte(encode_pack_size(trans_pack_size, out_pack_size))?;
        self.encode_state_one_finish(t.inp, 0)
    }

    fn encode_state_one_finish(&mut self, inp: u8, next: u8) -> Result<u64, Error> {
        let code = encode_common(inp);
        if code == 0 {
            self.write_byte(inp)?;
        }
        self.write_byte(ONE_TRANSITION | next | code)?;
        Ok(self.counter - 1)
    }

    fn encode_state_many(&mut self, arena: &NodeArena, id: NodeId) -> Result<u64, Error> {
        let start = self.counter;
        let node = &arena[id];

        let mut trans_pack_size = 0;
        let mut out_pack_size = packed_size(node.final_output);
        let mut any_outputs = node.final_output != 0;
        for t in &node.transitions {
            let delta = delta_addr(start, dest_addr(arena, t));
            trans_pack_size = trans_pack_size.max(packed_size(delta));
            out_pack_size = out_pack_size.max(packed_size(t.out));
            any_outputs = any_outputs || t.out != 0;
        }
        if !any_outputs {
            out_pack_size = 0;
        }

        if any_outputs {
            if node.is_final {
                self.write_packed(node.final_output, out_pack_size)?;
            }
            for t in node.transitions.iter().rev() {
                self.write_packed(t.out, out_pack_size)?;
            }
        }

        for t in node.transitions.iter().rev() {
            let delta = delta_addr(start, dest_addr(arena, t));
            self.write_packed(delta, trans_pack_size)?;
        }

        for t in node.transitions.iter().rev() {
            self.write_byte(t.inp)?;
        }

        self.write_byte(encode_pack_size(trans_pack_size, out_pack_size))?;

        let num_trans = encode_num_trans(node.transitions.len());
        if num_trans == 0 {
            if node.transitions.len() == 256 {
                // 256 does not fit in a byte; reuse the value 1, which
                // always fits inline and so never appears here
                self.write_byte(1)?;
            } else {
                self.write_byte(node.transitions.len() as u8)?;
            }
        }

        let mut header = num_trans;
        if node.is_final {
            header |= STATE_FINAL;
        }
        self.write_byte(header)?;

        Ok(self.counter - 1)
    }

    /// Write the 16-byte footer (entry count, root address) and flush.
    pub(crate) fn finish(&mut self, count: u64, root_addr: u64) -> Result<(), Error> {
        let mut footer = [0u8; FOOTER_SIZE_V1];
        footer[..8].copy_from_slice(&count.to_le_bytes());
        footer[8..].copy_from_slice(&root_addr.to_le_bytes());
        let n = self.w.write(&footer)?;
        self.counter += n as u64;
        if n != FOOTER_SIZE_V1 {
            return Err(Error::ShortWrite {
                expected: FOOTER_SIZE_V1,
                actual: n,
            });
        }
        self.w.flush()?;
        Ok(())
    }

    pub(crate) fn into_inner(self) -> Result<W, Error> {
        self.w
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }

    fn write_byte(&mut self, b: u8) -> Result<(), Error> {
        self.w.write_all(&[b])?;
        self.counter += 1;
        Ok(())
    }

    fn write_packed(&mut self, v: u64, width: usize) -> Result<(), Error> {
        let bytes = v.to_le_bytes();
        self.w.write_all(&bytes[..width])?;
        self.counter += width as u64;
        Ok(())
    }
}

fn dest_addr(arena: &NodeArena, t: &BuilderTransition) -> u64 {
    arena[t.dest]
        .addr
        .expect("destination state is frozen before its parent")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuilderNode;

    fn leaf(arena: &mut NodeArena, addr: Option<u64>) -> NodeId {
        let id = arena.alloc();
        arena[id] = BuilderNode {
            is_final: true,
            final_output: 0,
            transitions: Vec::new(),
            addr,
        };
        id
    }

    fn chain(
        arena: &mut NodeArena,
        inp: u8,
        out: u64,
        dest: NodeId,
    ) -> NodeId {
        let id = arena.alloc();
        arena[id].transitions.push(BuilderTransition { inp, out, dest });
        id
    }

    #[test]
    fn implicit_final_emits_nothing() {
        let mut arena = NodeArena::default();
        let id = leaf(&mut arena, None);
        let mut enc = EncoderV1::new(Vec::new());
        enc.start().unwrap();
        assert_eq!(enc.encode_state(&arena, id).unwrap(), 0);
        let bytes = enc.into_inner().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    // Three states on top of the implicit final state, exercising each
    // emitted form and pinning the exact output bytes:
    //
    //   B --'e'/0--> (implicit)   general one-trans, common input
    //   C --'z'/0--> B            transition-next, explicit input
    //   D final(5), 'a'/2 -> B, 'b'/0 -> C   many-trans
    #[test]
    fn state_forms_byte_exact() {
        let mut arena = NodeArena::default();
        let implicit = leaf(&mut arena, Some(0));
        let b = chain(&mut arena, b'e', 0, implicit);
        let c = chain(&mut arena, b'z', 0, b);

        let mut enc = EncoderV1::new(Vec::new());
        enc.start().unwrap();

        // B: delta 0 (dest addr 0), one address byte, no output bytes
        let b_addr = enc.encode_state(&arena, b).unwrap();
        assert_eq!(b_addr, 18);
        arena[b].addr = Some(b_addr);

        // C: dest is the previous state, so only input + header
        let c_addr = enc.encode_state(&arena, c).unwrap();
        assert_eq!(c_addr, 20);
        arena[c].addr = Some(c_addr);

        let d = arena.alloc();
        arena[d].is_final = true;
        arena[d].final_output = 5;
        arena[d].transitions.push(BuilderTransition { inp: b'a', out: 2, dest: b });
        arena[d].transitions.push(BuilderTransition { inp: b'b', out: 0, dest: c });
        let d_addr = enc.encode_state(&arena, d).unwrap();
        assert_eq!(d_addr, 29);

        let bytes = enc.into_inner().unwrap();
        assert_eq!(
            &bytes[HEADER_SIZE..],
            &[
                // B at 16..=18: delta 0, pack (1,0), header one|code('e')
                0x00, 0x10, 0x81,
                // C at 19..=20: explicit 'z', header one|next
                b'z', 0xC0,
                // D at 21..=29: final output 5, outputs b,a reversed,
                // deltas b,a reversed, inputs reversed, pack (1,1),
                // header final|2
                0x05, 0x00, 0x02, 0x01, 0x03, b'b', b'a', 0x11, 0x42,
            ]
        );
    }

    #[test]
    fn first_state_pointing_at_zero_is_not_transition_next() {
        // the very first emitted state has no predecessor; a destination
        // address of 0 must take the general form
        let mut arena = NodeArena::default();
        let implicit = leaf(&mut arena, Some(0));
        let b = chain(&mut arena, b'q', 0, implicit);
        let mut enc = EncoderV1::new(Vec::new());
        enc.start().unwrap();
        enc.encode_state(&arena, b).unwrap();
        let bytes = enc.into_inner().unwrap();
        // delta, pack, explicit input, header -- not the 2-byte next form
        assert_eq!(&bytes[HEADER_SIZE..], &[0x00, 0x10, b'q', 0x80]);
    }

    #[test]
    fn separate_count_byte_beyond_inline_range() {
        let mut arena = NodeArena::default();
        let implicit = leaf(&mut arena, Some(0));
        let node = arena.alloc();
        for i in 0..70u8 {
            arena[node].transitions.push(BuilderTransition {
                inp: i,
                out: 0,
                dest: implicit,
            });
        }
        let mut enc = EncoderV1::new(Vec::new());
        enc.start().unwrap();
        enc.encode_state(&arena, node).unwrap();
        let bytes = enc.into_inner().unwrap();
        let header = bytes[bytes.len() - 1];
        let count = bytes[bytes.len() - 2];
        assert_eq!(header, 0); // no inline count, not final
        assert_eq!(count, 70);
    }

    #[test]
    fn footer_carries_count_and_root() {
        let mut enc = EncoderV1::new(Vec::new());
        enc.start().unwrap();
        enc.finish(3, 0x1234).unwrap();
        let bytes = enc.into_inner().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + FOOTER_SIZE_V1);
        assert_eq!(&bytes[..8], &1u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &3u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &0x1234u64.to_le_bytes());
    }
}
