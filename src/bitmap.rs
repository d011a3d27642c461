//! Bit vectors used for slot bookkeeping.
//!
//! [`Bitmap`] is sized at runtime and tracks the slots of a GPA bucket.
//! [`BitSet`] has a compile-time word count and lives inline.

const WORD_BITS: usize = u64::BITS as usize;

#[inline]
fn split(index: usize) -> (usize, u64) {
  (index / WORD_BITS, 1u64 << (index % WORD_BITS))
}

/// Runtime-sized bit vector. `1` marks a used slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
  words: Box<[u64]>,
  len: usize,
}

impl Bitmap {
  /// Creates a bitmap of `len` cleared bits.
  pub fn new(len: usize) -> Self {
    Self {
      words: vec![0u64; len.div_ceil(WORD_BITS)].into_boxed_slice(),
      len,
    }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn get(
    &self,
    index: usize,
  ) -> bool {
    if index >= self.len {
      return false;
    }
    let (word, mask) = split(index);
    self.words[word] & mask != 0
  }

  /// # Panics
  ///
  /// Panics if `index` is out of bounds.
  pub fn set(
    &mut self,
    index: usize,
  ) {
    assert!(index < self.len, "bit index out of bounds");
    let (word, mask) = split(index);
    self.words[word] |= mask;
  }

  /// # Panics
  ///
  /// Panics if `index` is out of bounds.
  pub fn clear(
    &mut self,
    index: usize,
  ) {
    assert!(index < self.len, "bit index out of bounds");
    let (word, mask) = split(index);
    self.words[word] &= !mask;
  }

  /// Index of the lowest cleared bit, scanning from bit 0.
  pub fn first_zero(&self) -> Option<usize> {
    for (word_idx, word) in self.words.iter().enumerate() {
      if *word == u64::MAX {
        continue;
      }

      let index = word_idx * WORD_BITS + (!word).trailing_zeros() as usize;
      return (index < self.len).then_some(index);
    }

    None
  }

  pub fn count_ones(&self) -> usize {
    self.words.iter().map(|word| word.count_ones() as usize).sum()
  }
}

/// Fixed-capacity bit set holding `WORDS * 64` bits inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSet<const WORDS: usize> {
  words: [u64; WORDS],
}

impl<const WORDS: usize> BitSet<WORDS> {
  pub const CAPACITY: usize = WORDS * WORD_BITS;

  pub const fn new() -> Self {
    Self { words: [0; WORDS] }
  }

  pub fn test(
    &self,
    index: usize,
  ) -> bool {
    let (word, mask) = split(index);
    word < WORDS && self.words[word] & mask != 0
  }

  pub fn set(
    &mut self,
    index: usize,
  ) {
    let (word, mask) = split(index);
    self.words[word] |= mask;
  }

  pub fn clear(
    &mut self,
    index: usize,
  ) {
    let (word, mask) = split(index);
    self.words[word] &= !mask;
  }

  pub fn is_empty(&self) -> bool {
    self.words.iter().all(|word| *word == 0)
  }

  pub fn count(&self) -> usize {
    self.words.iter().map(|word| word.count_ones() as usize).sum()
  }

  /// Indices of the set bits in ascending order.
  pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
    self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
      let mut bits = word;
      std::iter::from_fn(move || {
        if bits == 0 {
          return None;
        }
        let bit = bits.trailing_zeros() as usize;
        bits &= bits - 1;
        Some(word_idx * WORD_BITS + bit)
      })
    })
  }
}

impl<const WORDS: usize> Default for BitSet<WORDS> {
  fn default() -> Self {
    Self::new()
  }
}
