// Decompose a range of Unicode scalar values into sequences of byte
// ranges that, chained together, match exactly the UTF-8 encodings of the
// range. Surrogates are carved out, and splits fall on encoded-length and
// continuation-byte boundaries so every sequence is a simple product of
// per-byte ranges.

const MAX_UTF8_BYTES: usize = 4;

/// An inclusive range of values for a single byte position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Utf8Range {
    pub start: u8,
    pub end: u8,
}

impl Utf8Range {
    #[cfg(test)]
    fn matches(&self, b: u8) -> bool {
        self.start <= b && b <= self.end
    }
}

/// One UTF-8 encoding shape: between one and four byte ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Utf8Sequence(Vec<Utf8Range>);

impl Utf8Sequence {
    fn from_encoded_range(start: &[u8], end: &[u8]) -> Utf8Sequence {
        Utf8Sequence(
            start
                .iter()
                .zip(end)
                .map(|(&s, &e)| Utf8Range { start: s, end: e })
                .collect(),
        )
    }

    pub(crate) fn as_slice(&self) -> &[Utf8Range] {
        &self.0
    }

    /// Whether `bytes` is exactly one encoding matched by this sequence.
    #[cfg(test)]
    pub(crate) fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() == self.0.len()
            && self.0.iter().zip(bytes).all(|(r, &b)| r.matches(b))
    }
}

/// Iterator over the [`Utf8Sequence`]s covering a scalar-value range.
pub(crate) struct Utf8Sequences {
    range_stack: Vec<ScalarRange>,
}

impl Utf8Sequences {
    /// Sequences for the scalar values in `[start, end]`. Surrogate code
    /// points inside the range are skipped.
    pub(crate) fn new(start: u32, end: u32) -> Utf8Sequences {
        Utf8Sequences {
            range_stack: vec![ScalarRange { start, end }],
        }
    }
}

impl Iterator for Utf8Sequences {
    type Item = Utf8Sequence;

    fn next(&mut self) -> Option<Utf8Sequence> {
        'top: while let Some(mut r) = self.range_stack.pop() {
            loop {
                if let Some((r1, r2)) = r.split() {
                    self.range_stack.push(r2);
                    r = r1;
                    continue;
                }
                if !r.is_valid() {
                    continue 'top;
                }
                // split on encoded-length boundaries
                for i in 1..MAX_UTF8_BYTES {
                    let max = max_scalar_value(i);
                    if r.start <= max && max < r.end {
                        self.range_stack.push(ScalarRange {
                            start: max + 1,
                            end: r.end,
                        });
                        r.end = max;
                        continue;
                    }
                }
                if let Some(ascii) = r.as_ascii() {
                    return Some(Utf8Sequence(vec![ascii]));
                }
                // split so the trailing continuation bytes span their full
                // range and the sequence becomes a per-byte product
                for i in 1..MAX_UTF8_BYTES {
                    let m = (1 << (6 * i)) - 1;
                    if (r.start & !m) != (r.end & !m) {
                        if (r.start & m) != 0 {
                            self.range_stack.push(ScalarRange {
                                start: (r.start | m) + 1,
                                end: r.end,
                            });
                            r.end = r.start | m;
                            continue;
                        }
                        if (r.end & m) != m {
                            self.range_stack.push(ScalarRange {
                                start: r.end & !m,
                                end: r.end,
                            });
                            r.end = (r.end & !m) - 1;
                            continue;
                        }
                    }
                }
                let mut start = [0u8; MAX_UTF8_BYTES];
                let mut end = [0u8; MAX_UTF8_BYTES];
                let n = encode_utf8(r.start, &mut start);
                let m = encode_utf8(r.end, &mut end);
                debug_assert_eq!(n, m);
                return Some(Utf8Sequence::from_encoded_range(&start[..n], &end[..n]));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct ScalarRange {
    start: u32,
    end: u32,
}

impl ScalarRange {
    /// Carve the surrogate gap out of the range, if it overlaps.
    fn split(&self) -> Option<(ScalarRange, ScalarRange)> {
        if self.start < 0xE000 && self.end > 0xD7FF {
            Some((
                ScalarRange {
                    start: self.start,
                    end: 0xD7FF,
                },
                ScalarRange {
                    start: 0xE000,
                    end: self.end,
                },
            ))
        } else {
            None
        }
    }

    fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    fn as_ascii(&self) -> Option<Utf8Range> {
        if self.is_valid() && self.end <= 0x7F {
            Some(Utf8Range {
                start: self.start as u8,
                end: self.end as u8,
            })
        } else {
            None
        }
    }
}

fn max_scalar_value(nbytes: usize) -> u32 {
    match nbytes {
        1 => 0x007F,
        2 => 0x07FF,
        3 => 0xFFFF,
        _ => 0x0010_FFFF,
    }
}

/// Raw UTF-8 encoding of a scalar value; returns the byte count.
fn encode_utf8(cp: u32, buf: &mut [u8; MAX_UTF8_BYTES]) -> usize {
    match cp {
        0..=0x7F => {
            buf[0] = cp as u8;
            1
        }
        0x80..=0x7FF => {
            buf[0] = 0xC0 | (cp >> 6) as u8;
            buf[1] = 0x80 | (cp & 0x3F) as u8;
            2
        }
        0x800..=0xFFFF => {
            buf[0] = 0xE0 | (cp >> 12) as u8;
            buf[1] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            buf[2] = 0x80 | (cp & 0x3F) as u8;
            3
        }
        _ => {
            buf[0] = 0xF0 | (cp >> 18) as u8;
            buf[1] = 0x80 | ((cp >> 12) & 0x3F) as u8;
            buf[2] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            buf[3] = 0x80 | (cp & 0x3F) as u8;
            4
        }
    }
}
