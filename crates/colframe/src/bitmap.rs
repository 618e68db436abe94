/// A compact bit vector used for row masks and cycle bookkeeping.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

impl BitVec {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            len: 0,
            ones: 0,
        }
    }

    pub fn with_capacity_bits(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(64)),
            len: 0,
            ones: 0,
        }
    }

    pub fn with_len_all_false(bits: usize) -> Self {
        if bits == 0 {
            return Self::new();
        }
        Self {
            words: vec![0u64; bits.div_ceil(64)],
            len: bits,
            ones: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, value: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }

        if value {
            let word = self.len / 64;
            self.words[word] |= 1u64 << bit;
            self.ones += 1;
        }

        self.len += 1;
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word = self.words[index / 64];
        let bit = index % 64;
        ((word >> bit) & 1) == 1
    }

    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word_idx = index / 64;
        let mask = 1u64 << (index % 64);
        let was_set = (self.words[word_idx] & mask) != 0;

        match (was_set, value) {
            (true, false) => {
                self.words[word_idx] &= !mask;
                self.ones -= 1;
            }
            (false, true) => {
                self.words[word_idx] |= mask;
                self.ones += 1;
            }
            _ => {}
        }
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn all_true(&self) -> bool {
        self.ones == self.len
    }

    /// Word-wise `self &= other`. Both vectors must have the same length.
    pub fn and_inplace(&mut self, other: &BitVec) {
        self.combine(other, |a, b| a & b);
    }

    /// Word-wise `self |= other`. Both vectors must have the same length.
    pub fn or_inplace(&mut self, other: &BitVec) {
        self.combine(other, |a, b| a | b);
    }

    pub fn not_inplace(&mut self) {
        for w in &mut self.words {
            *w = !*w;
        }
        self.clear_tail();
        self.ones = self.len - self.ones;
    }

    fn combine(&mut self, other: &BitVec, op: impl Fn(u64, u64) -> u64) {
        debug_assert_eq!(self.len, other.len, "BitVec length mismatch");
        for (w, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *w = op(*w, o);
        }
        self.clear_tail();
        self.ones = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }

    /// Zero the bits of the last word that lie past `len`.
    fn clear_tail(&mut self) {
        let rem_bits = self.len % 64;
        if rem_bits != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem_bits) - 1;
            }
        }
    }

    /// Indices of set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        let len = self.len;
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_idx, &word)| {
                let mut w = word;
                std::iter::from_fn(move || {
                    if w == 0 {
                        return None;
                    }
                    let bit = w.trailing_zeros() as usize;
                    w &= w - 1;
                    Some(word_idx * 64 + bit)
                })
            })
            .take_while(move |&idx| idx < len)
    }
}

impl Default for BitVec {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<bool> for BitVec {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut out = BitVec::with_capacity_bits(iter.size_hint().0);
        for bit in iter {
            out.push(bit);
        }
        out
    }
}
