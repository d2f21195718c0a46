//! DNA nucleotide encoding
//!
//! Two bits per base, with the complement reachable by a single XOR:
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - G (71/103) -> 10
//! - T (84/116) -> 11
//!
//! A k-mer of width k occupies the 2k low bits of a `u64`, first base in the
//! highest pair. Any byte outside ACGT (including N and IUPAC codes) makes
//! the enclosing k-mer invalid.

use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid DNA base (A/C/G/T)
    #[error("Invalid DNA base: {0:?}")]
    InvalidBase(u8),
    /// The input string length does not match the expected k-mer length
    #[error("K-mer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected k-mer length
        expected: usize,
        /// Actual string length
        actual: usize,
    },
}

/// Encode a single DNA nucleotide to 2 bits.
#[inline]
pub const fn encode_base(base: u8) -> Result<u8, EncodingError> {
    match base {
        b'A' | b'a' => Ok(0b00),
        b'C' | b'c' => Ok(0b01),
        b'G' | b'g' => Ok(0b10),
        b'T' | b't' => Ok(0b11),
        _ => Err(EncodingError::InvalidBase(base)),
    }
}

/// Decode a 2-bit value to a DNA nucleotide (uppercase).
#[inline]
pub const fn decode_base(bits: u8) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b10 => b'G',
        _ => b'T',
    }
}

/// Complement of an encoded base: A<->T and C<->G are each one XOR away.
#[inline]
pub const fn complement_base(bits: u8) -> u8 {
    (bits ^ 0b11) & 0b11
}

/// Whether a byte is one of the four indexable bases.
#[inline]
pub const fn is_dna_base(base: u8) -> bool {
    matches!(base, b'A' | b'a' | b'C' | b'c' | b'G' | b'g' | b'T' | b't')
}

/// Encode a window of `window.len()` bases into the low bits of a `u64`,
/// first base in the highest pair. Runtime-width companion of
/// [`Kmer::from_bytes`](crate::kmer::Kmer::from_bytes) for code paths where
/// the width is not a compile-time constant.
pub fn encode_kmer_bits(window: &[u8]) -> Result<u64, EncodingError> {
    debug_assert!(window.len() <= 32);
    let mut bits = 0u64;
    for &base in window {
        bits = (bits << 2) | encode_base(base)? as u64;
    }
    Ok(bits)
}

/// Decode a packed encoding of width `k` back to ASCII text.
pub fn decode_kmer_text(bits: u64, k: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(k);
    for i in (0..k).rev() {
        out.push(decode_base((bits >> (2 * i)) as u8));
    }
    out
}

/// Reverse-complement of a plain-text sequence.
///
/// Only ACGT (either case) is complemented; any other byte is passed through
/// unchanged, so record separators survive the transform.
pub fn reverse_complement_text(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'a' => b't',
            b'C' => b'G',
            b'c' => b'g',
            b'G' => b'C',
            b'g' => b'c',
            b'T' => b'A',
            b't' => b'a',
            other => other,
        })
        .collect()
}
