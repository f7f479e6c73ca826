//! Occurrence-keyed Bloom filter.
//!
//! A filter summarizes the lines of a file. Each inserted key is a
//! `(line, occurrence)` pair so that duplicate lines stay distinguishable:
//! the filter answers "does the file hold at least N copies of this line".
//!
//! ## Sizing
//!
//! For an expected element count `n` and false-positive rate `p`:
//!
//! - design bits: `ceil(-n * ln(p) / ln(2)^2)`
//! - bytes: `ceil(design_bits / 8)`, and the filter addresses all of them,
//!   so `size = bytes * 8`
//! - capacity: `floor(size * ln(2)^2 / -ln(p))`
//! - hash rounds: `k = ceil(size / capacity * ln(2))`
//!
//! `size`, `capacity` and `k` are functions of the byte length alone, so a
//! peer rebuilding a filter from its wire bytes lands on identical
//! parameters. Only the bit array travels.

use std::f64::consts::LN_2;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::hash::Fingerprint;

/// Default target false-positive rate.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.05;

/// A fixed-size, insert-only Bloom filter over `(line, occurrence)` keys.
#[derive(Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Bit array, most significant bit first within each byte.
    bits: Vec<u8>,
    /// Number of addressable bits (`bits.len() * 8`).
    size: usize,
    /// Element count the filter was sized for.
    capacity: usize,
    /// Number of probe rounds per key.
    hash_count: u32,
}

impl BloomFilter {
    /// Create an empty filter for `n` elements at the default rate.
    ///
    /// The textbook size `ceil(-n ln p / ln²2)` is rounded up to whole
    /// bytes, and the filter then addresses every bit of them:
    /// [`size_in_bits`](Self::size_in_bits) is `num_bytes * 8`, and
    /// [`hash_count`](Self::hash_count) is derived from that size and the
    /// capacity it inverts to, not from `n`. A receiver that sees only the
    /// byte length therefore rebuilds the same shape. For `n = 3` at 5%
    /// this gives 24 bits and 6 hash rounds rather than 19 bits and 5.
    pub fn new(n: usize) -> Result<Self> {
        Self::with_rate(n, DEFAULT_FALSE_POSITIVE_RATE)
    }

    /// Create an empty filter for `n` elements at false-positive rate `p`.
    ///
    /// Sized as described on [`new`](Self::new).
    pub fn with_rate(n: usize, p: f64) -> Result<Self> {
        if n == 0 {
            return Err(CoreError::InvalidParameter(
                "expected element count must be positive".into(),
            ));
        }
        let num_bytes = byte_len_for(n, p)?;
        Self::from_bytes(vec![0u8; num_bytes], p)
    }

    /// Rebuild a filter from its serialized bit array.
    ///
    /// `p` must be the rate the sender used. Size, capacity and hash count
    /// are recomputed from the byte length.
    pub fn from_bytes(bytes: Vec<u8>, p: f64) -> Result<Self> {
        check_rate(p)?;
        if bytes.is_empty() {
            return Err(CoreError::EmptyFilter);
        }
        let size = bytes.len() * 8;
        let capacity = capacity_for_bits(size, p);
        if capacity == 0 {
            return Err(CoreError::DeserializationMismatch {
                expected: byte_len_for(1, p)?,
                got: bytes.len(),
            });
        }
        let hash_count = hash_count_for(size, capacity);
        Ok(Self {
            bits: bytes,
            size,
            capacity,
            hash_count,
        })
    }

    /// Create a filter from a byte slice.
    pub fn from_slice(bytes: &[u8], p: f64) -> Result<Self> {
        Self::from_bytes(bytes.to_vec(), p)
    }

    /// Insert the `occurrence`-th copy of `line`.
    pub fn insert(&mut self, line: &str, occurrence: u64) {
        let fp = Fingerprint::of(line, occurrence);
        for round in 0..self.hash_count {
            let index = self.index(&fp, round);
            self.set_bit(index);
        }
    }

    /// Test whether the `occurrence`-th copy of `line` may be present.
    ///
    /// Returns `false` only if the key was definitely never inserted.
    pub fn contains(&self, line: &str, occurrence: u64) -> bool {
        let fp = Fingerprint::of(line, occurrence);
        for round in 0..self.hash_count {
            let index = self.index(&fp, round);
            if !self.get_bit(index) {
                return false;
            }
        }
        true
    }

    /// Number of hash rounds per key.
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Filter size in bits.
    pub fn size_in_bits(&self) -> usize {
        self.size
    }

    /// Filter size in bytes.
    pub fn num_bytes(&self) -> usize {
        self.bits.len()
    }

    /// Element count the filter is sized for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the raw bit array.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Consume the filter, returning the raw bit array.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bits
    }

    /// Count the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Fraction of bits set.
    pub fn fill_ratio(&self) -> f64 {
        self.count_ones() as f64 / self.size as f64
    }

    /// Check whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    fn index(&self, fp: &Fingerprint, round: u32) -> usize {
        (fp.probe(round) % self.size as u64) as usize
    }

    fn set_bit(&mut self, index: usize) {
        self.bits[index / 8] |= 0x80 >> (index % 8);
    }

    fn get_bit(&self, index: usize) -> bool {
        self.bits[index / 8] & (0x80 >> (index % 8)) != 0
    }
}

impl fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilter")
            .field("bits", &self.size)
            .field("capacity", &self.capacity)
            .field("hash_count", &self.hash_count)
            .field("fill_ratio", &format!("{:.2}%", self.fill_ratio() * 100.0))
            .finish()
    }
}

/// Design bit count for `n` elements at rate `p`.
pub fn design_bits(n: usize, p: f64) -> Result<usize> {
    check_rate(p)?;
    Ok((-(n as f64) * p.ln() / (LN_2 * LN_2)).ceil() as usize)
}

/// Serialized length in bytes of a filter sized for `n` elements.
pub fn byte_len_for(n: usize, p: f64) -> Result<usize> {
    Ok(design_bits(n, p)?.div_ceil(8))
}

/// Element count a filter of `bits` bits is sized for.
///
/// Inverse of [`design_bits`] up to byte rounding:
/// `capacity_for_bits(byte_len_for(n, p) * 8, p) >= n`.
pub fn capacity_for_bits(bits: usize, p: f64) -> usize {
    (bits as f64 * (LN_2 * LN_2) / -p.ln()).floor() as usize
}

/// Element count implied by a serialized filter of `num_bytes` bytes.
pub fn capacity_for_byte_len(num_bytes: usize, p: f64) -> usize {
    capacity_for_bits(num_bytes * 8, p)
}

fn hash_count_for(size: usize, capacity: usize) -> u32 {
    let k = (size as f64 / capacity as f64 * LN_2).ceil() as u32;
    k.max(1)
}

fn check_rate(p: f64) -> Result<()> {
    if !(p > 0.0 && p < 1.0) {
        return Err(CoreError::InvalidParameter(format!(
            "false-positive rate must be in (0, 1), got {}",
            p
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_elements() {
        assert!(matches!(
            BloomFilter::new(0),
            Err(CoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_bad_rate() {
        assert!(BloomFilter::with_rate(10, 0.0).is_err());
        assert!(BloomFilter::with_rate(10, 1.0).is_err());
        assert!(BloomFilter::with_rate(10, f64::NAN).is_err());
    }

    #[test]
    fn test_design_bits_formula() {
        // ceil(-3 * ln(0.05) / ln(2)^2) = ceil(18.71)
        assert_eq!(design_bits(3, 0.05).unwrap(), 19);
        assert_eq!(byte_len_for(3, 0.05).unwrap(), 3);
        // ceil(-100 * ln(0.05) / ln(2)^2) = ceil(623.5)
        assert_eq!(design_bits(100, 0.05).unwrap(), 624);
        assert_eq!(byte_len_for(100, 0.05).unwrap(), 78);
    }

    #[test]
    fn test_new_filter_parameters() {
        let filter = BloomFilter::new(100).unwrap();
        assert_eq!(filter.num_bytes(), 78);
        assert_eq!(filter.size_in_bits(), 624);
        assert!(filter.capacity() >= 100);
        assert_eq!(filter.hash_count(), 5);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_size_rounds_up_to_whole_bytes() {
        // 19 design bits become 3 bytes; all 24 bits are addressed.
        let filter = BloomFilter::new(3).unwrap();
        assert_eq!(filter.size_in_bits(), 24);
        assert_eq!(filter.capacity(), 3);
        assert_eq!(filter.hash_count(), 6);
    }

    #[test]
    fn test_capacity_never_below_request() {
        for n in 1..2000 {
            let bytes = byte_len_for(n, DEFAULT_FALSE_POSITIVE_RATE).unwrap();
            let cap = capacity_for_byte_len(bytes, DEFAULT_FALSE_POSITIVE_RATE);
            assert!(cap >= n, "n={} bytes={} cap={}", n, bytes, cap);
        }
    }

    #[test]
    fn test_parameters_recovered_from_bytes() {
        // n=4 is the case where naive inversion of the unrounded formula
        // lands on a different modulus.
        for n in [1usize, 2, 3, 4, 7, 64, 1000] {
            let mut filter = BloomFilter::new(n).unwrap();
            filter.insert("line\n", 1);
            let rebuilt =
                BloomFilter::from_slice(filter.as_bytes(), DEFAULT_FALSE_POSITIVE_RATE).unwrap();
            assert_eq!(rebuilt.size_in_bits(), filter.size_in_bits());
            assert_eq!(rebuilt.hash_count(), filter.hash_count());
            assert_eq!(rebuilt.capacity(), filter.capacity());
            assert!(rebuilt.contains("line\n", 1));
        }
    }

    #[test]
    fn test_insert_contains() {
        let mut filter = BloomFilter::new(10).unwrap();
        assert!(!filter.contains("a\n", 1));

        filter.insert("a\n", 1);
        assert!(filter.contains("a\n", 1));
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_occurrences_are_distinct_keys() {
        let mut filter = BloomFilter::new(1000).unwrap();
        filter.insert("a\n", 1);
        filter.insert("a\n", 2);
        assert!(filter.contains("a\n", 1));
        assert!(filter.contains("a\n", 2));
        // The third copy was never inserted; at this load a hit is very unlikely.
        assert!(!filter.contains("a\n", 3));
    }

    #[test]
    fn test_from_bytes_empty() {
        assert!(matches!(
            BloomFilter::from_bytes(Vec::new(), DEFAULT_FALSE_POSITIVE_RATE),
            Err(CoreError::EmptyFilter)
        ));
    }

    #[test]
    fn test_bit_order_msb_first() {
        let mut filter = BloomFilter::from_bytes(vec![0u8; 4], 0.05).unwrap();
        filter.set_bit(0);
        filter.set_bit(9);
        assert_eq!(filter.as_bytes(), &[0x80, 0x40, 0x00, 0x00]);
        assert!(filter.get_bit(0));
        assert!(filter.get_bit(9));
        assert!(!filter.get_bit(1));
    }

    #[test]
    fn test_empirical_false_positive_rate() {
        let n = 2000;
        let mut filter = BloomFilter::new(n).unwrap();
        for i in 0..n {
            filter.insert(&format!("present line {}\n", i), 1);
        }

        let trials = 20_000;
        let hits = (0..trials)
            .filter(|i| filter.contains(&format!("absent line {}\n", i), 1))
            .count();
        let rate = hits as f64 / trials as f64;

        assert!(rate < 0.08, "false-positive rate too high: {}", rate);
        assert!(rate > 0.02, "false-positive rate suspiciously low: {}", rate);
    }
}
