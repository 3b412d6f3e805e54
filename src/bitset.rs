//! Compact bitset representation for the leaf side of a split.
//!
//! Bit `i` stands for taxon `i` of a [`TaxonIndex`](crate::taxa::TaxonIndex).
//!
//! # Example
//! For taxa [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Side {A, C} → bitset `0b0101`
//! - Side {B, C, D} → bitset `0b1110`

/// A compact bitset over leaf indices, stored in `u64` words.
///
/// Ordering and hashing are derived from the words, so bitsets of equal
/// width can live in hash sets and be sorted deterministically.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Number of words needed for `num_leaves` bits.
    #[inline]
    pub fn words_for(num_leaves: usize) -> usize {
        num_leaves.div_ceil(64)
    }

    /// Creates a new bitset with all bits set to 0.
    ///
    /// ```
    /// # use split_accuracy::bitset::Bitset;
    /// let bs = Bitset::zeros(Bitset::words_for(100));
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Marks leaf `idx` as present.
    ///
    /// ```
    /// # use split_accuracy::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        self.0[idx >> 6] |= 1u64 << (idx & 63);
    }

    /// Whether leaf `idx` is present.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0
            .get(idx >> 6)
            .is_some_and(|word| word & (1u64 << (idx & 63)) != 0)
    }

    /// Union in place: `self` becomes `self ∪ other`.
    ///
    /// ```
    /// # use split_accuracy::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    /// left.or_assign(&right);
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Population count: how many leaves are on this side.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// The other side of the split over `num_leaves` leaves.
    ///
    /// Bits at or beyond `num_leaves` stay 0 in the result.
    ///
    /// ```
    /// # use split_accuracy::bitset::Bitset;
    /// let mut ab = Bitset::zeros(1);
    /// ab.set(0);
    /// ab.set(1);
    /// assert_eq!(ab.complement(4).0[0], 0b1100);
    /// ```
    pub fn complement(&self, num_leaves: usize) -> Bitset {
        let mut words: Vec<u64> = self.0.iter().map(|w| !w).collect();
        let tail = num_leaves & 63;
        let full_words = num_leaves >> 6;
        for (i, word) in words.iter_mut().enumerate() {
            if i > full_words || (i == full_words && tail == 0) {
                *word = 0;
            } else if i == full_words {
                *word &= (1u64 << tail) - 1;
            }
        }
        Bitset(words)
    }
}
