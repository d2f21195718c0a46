//! K-mer value type with compile-time width
//!
//! A `Kmer<K>` packs K bases into the 2K low bits of a `u64`, first base in
//! the highest pair, so numeric order equals lexicographic order on the
//! decoded text. Both supported widths (13 and 23) fit a single word.

use crate::encoding::{decode_base, encode_base, EncodingError};
use std::fmt;

/// Which strand of a query matched the indexed canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    /// The k-mer as given matched.
    Forward,
    /// The reverse-complement matched.
    Reverse,
}

/// K-mer with compile-time width K (K ≤ 32, this crate uses 13 and 23).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kmer<const K: usize> {
    bits: u64,
}

impl<const K: usize> Kmer<K> {
    /// Mask covering the 2K low bits.
    pub const MASK: u64 = if K == 32 { u64::MAX } else { (1u64 << (2 * K)) - 1 };

    /// Create a k-mer from raw bits (low 2K bits are kept).
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Self { bits: bits & Self::MASK }
    }

    /// The raw 2-bit packed value.
    #[inline]
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Encode a byte window of exactly K bases.
    ///
    /// # Errors
    /// Returns an error if the window length differs from K or any byte is
    /// not A/C/G/T.
    pub fn from_bytes(window: &[u8]) -> Result<Self, EncodingError> {
        if window.len() != K {
            return Err(EncodingError::LengthMismatch {
                expected: K,
                actual: window.len(),
            });
        }
        let mut bits = 0u64;
        for &base in window {
            bits = (bits << 2) | encode_base(base)? as u64;
        }
        Ok(Self { bits })
    }

    /// Encode a k-mer given as a DNA string.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, EncodingError> {
        Self::from_bytes(s.as_bytes())
    }

    /// Reverse-complement via bit-parallel operations: complement every pair
    /// with one XOR, reverse pair order with the swap cascade, then realign
    /// into the 2K low bits.
    #[inline]
    pub fn reverse_complement(&self) -> Self {
        let mut x = !self.bits;
        x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
        x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0F) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
        x = x.swap_bytes();
        x >>= 64 - 2 * K;
        Self { bits: x }
    }

    /// Canonical form: the numerically smaller of forward and
    /// reverse-complement. Both strands of a site map to one canonical value.
    #[inline]
    pub fn canonical(&self) -> Self {
        let rc = self.reverse_complement();
        if self.bits <= rc.bits {
            *self
        } else {
            rc
        }
    }

    /// Canonical form plus the strand this k-mer contributes on.
    #[inline]
    pub fn canonical_with_strand(&self) -> (Self, Strand) {
        let rc = self.reverse_complement();
        if self.bits <= rc.bits {
            (*self, Strand::Forward)
        } else {
            (rc, Strand::Reverse)
        }
    }

    /// Decode back to ASCII text.
    pub fn to_text(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(K);
        for i in (0..K).rev() {
            out.push(decode_base((self.bits >> (2 * i)) as u8));
        }
        out
    }
}

impl<const K: usize> fmt::Display for Kmer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..K).rev() {
            write!(f, "{}", decode_base((self.bits >> (2 * i)) as u8) as char)?;
        }
        Ok(())
    }
}

impl<const K: usize> fmt::Debug for Kmer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kmer<{}>(\"{}\")", K, self)
    }
}

impl<const K: usize> std::str::FromStr for Kmer<K> {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

/// The dense-mode k-mer width.
pub type Kmer13 = Kmer<13>;
/// The perfect-hash-mode k-mer width.
pub type Kmer23 = Kmer<23>;

/// Call `f(offset, canonical_bits)` for every K-wide window of `seq` made
/// entirely of ACGT bases.
///
/// Forward and reverse-complement encodings are maintained by rolling
/// updates; any other byte (N, the record or mate separator) breaks the run,
/// so no window ever crosses it.
pub fn scan_canonical<const K: usize>(seq: &[u8], mut f: impl FnMut(usize, u64)) {
    let mut fwd = 0u64;
    let mut rc = 0u64;
    let mut run = 0usize;
    for (i, &base) in seq.iter().enumerate() {
        match crate::encoding::encode_base(base) {
            Ok(code) => {
                fwd = ((fwd << 2) | code as u64) & Kmer::<K>::MASK;
                rc = (rc >> 2)
                    | ((crate::encoding::complement_base(code) as u64) << (2 * (K - 1)));
                run += 1;
                if run >= K {
                    f(i + 1 - K, fwd.min(rc));
                }
            }
            Err(_) => run = 0,
        }
    }
}

/// Like [`scan_canonical`] but yields the forward encoding of each window.
pub fn scan_forward<const K: usize>(seq: &[u8], mut f: impl FnMut(usize, u64)) {
    let mut fwd = 0u64;
    let mut run = 0usize;
    for (i, &base) in seq.iter().enumerate() {
        match crate::encoding::encode_base(base) {
            Ok(code) => {
                fwd = ((fwd << 2) | code as u64) & Kmer::<K>::MASK;
                run += 1;
                if run >= K {
                    f(i + 1 - K, fwd);
                }
            }
            Err(_) => run = 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let texts = [
            "ACGTACGTACGTACGTACGTACG",
            "AAAAAAAAAAAAAAAAAAAAAAA",
            "TTTTTTTTTTTTTTTTTTTTTTT",
            "GATTACAGATTACAGATTACAGA",
        ];
        for text in texts {
            let kmer = Kmer23::from_str(text).unwrap();
            assert_eq!(kmer.to_string(), text);
        }
    }

    #[test]
    fn test_first_base_is_highest_pair() {
        // "C" followed by twelve "A"s is numerically larger than any
        // k-mer starting with "A".
        let c_first = Kmer13::from_str("CAAAAAAAAAAAA").unwrap();
        let a_first = Kmer13::from_str("ATTTTTTTTTTTT").unwrap();
        assert!(c_first.bits() > a_first.bits());
        assert_eq!(c_first.bits(), 1u64 << 24);
    }

    #[test]
    fn test_reverse_complement() {
        let kmer = Kmer13::from_str("ACGTACGTACGTA").unwrap();
        assert_eq!(kmer.reverse_complement().to_string(), "TACGTACGTACGT");

        let kmer = Kmer23::from_str("AAAAAAAAAAAAAAAAAAAAAAA").unwrap();
        assert_eq!(
            kmer.reverse_complement().to_string(),
            "TTTTTTTTTTTTTTTTTTTTTTT"
        );

        let kmer = Kmer23::from_str("ACGTACGTACGTACGTACGTACG").unwrap();
        assert_eq!(kmer.reverse_complement().reverse_complement(), kmer);
    }

    #[test]
    fn test_canonical_is_min() {
        let kmer = Kmer23::from_str("TTTTTTTTTTTTTTTTTTTTTTT").unwrap();
        let canon = kmer.canonical();
        assert_eq!(canon.to_string(), "AAAAAAAAAAAAAAAAAAAAAAA");
        assert_eq!(canon.bits(), kmer.bits().min(kmer.reverse_complement().bits()));

        // Both strands share the canonical form.
        let fwd = Kmer23::from_str("ACGTTGCAACGTTGCAACGTTGC").unwrap();
        assert_eq!(fwd.canonical(), fwd.reverse_complement().canonical());
    }

    #[test]
    fn test_canonical_with_strand() {
        let a_run = Kmer23::from_str("AAAAAAAAAAAAAAAAAAAAAAA").unwrap();
        let (canon, strand) = a_run.canonical_with_strand();
        assert_eq!(canon, a_run);
        assert_eq!(strand, Strand::Forward);

        let t_run = Kmer23::from_str("TTTTTTTTTTTTTTTTTTTTTTT").unwrap();
        let (canon, strand) = t_run.canonical_with_strand();
        assert_eq!(canon, a_run);
        assert_eq!(strand, Strand::Reverse);
    }

    #[test]
    fn test_case_insensitive() {
        let lower = Kmer13::from_str("acgtacgtacgta").unwrap();
        let upper = Kmer13::from_str("ACGTACGTACGTA").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Kmer13::from_str("ACGTNACGTACGT").is_err());
        assert!(Kmer13::from_str("ACGT").is_err());
        assert!(Kmer23::from_str("ACGTACGTACGTACGTACGTAC~").is_err());
    }

    #[test]
    fn test_numeric_order_is_lexicographic() {
        let a = Kmer13::from_str("AAAAAAAAAAAAC").unwrap();
        let b = Kmer13::from_str("AAAAAAAAAAAAG").unwrap();
        let c = Kmer13::from_str("CAAAAAAAAAAAA").unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_scan_canonical_matches_naive() {
        let seq = b"ACGTACGTACGTACGTTTT";
        let mut rolled = Vec::new();
        scan_canonical::<13>(seq, |offset, bits| rolled.push((offset, bits)));

        let mut naive = Vec::new();
        for i in 0..=seq.len() - 13 {
            let kmer = Kmer13::from_bytes(&seq[i..i + 13]).unwrap();
            naive.push((i, kmer.canonical().bits()));
        }
        assert_eq!(rolled, naive);
    }

    #[test]
    fn test_scan_skips_blocked_windows() {
        // The separator in the middle blocks every window that would
        // cross it.
        let seq = b"ACGTACGTACGTA~ACGTACGTACGTA";
        let mut offsets = Vec::new();
        scan_canonical::<13>(seq, |offset, _| offsets.push(offset));
        assert_eq!(offsets, vec![0, 14]);

        let mut none = Vec::new();
        scan_canonical::<13>(b"ACGTNACGTACGT", |offset, _| none.push(offset));
        assert!(none.is_empty());
    }

    #[test]
    fn test_scan_forward_is_uncollapsed() {
        let seq = b"TTTTTTTTTTTTT";
        let mut bits = Vec::new();
        scan_forward::<13>(seq, |_, b| bits.push(b));
        assert_eq!(bits, vec![Kmer13::from_bytes(seq).unwrap().bits()]);
    }
}
