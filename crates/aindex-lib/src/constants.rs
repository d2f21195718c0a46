//! Constants and small helpers shared across the index.

/// K-mer width of the dense (exhaustively enumerated) mode.
pub const SMALL_K: usize = 13;

/// K-mer width of the perfect-hash mode.
pub const LARGE_K: usize = 23;

/// Number of distinct 13-mers: the dense TF array has exactly this length.
pub const DENSE_ID_SPACE: usize = 1 << (2 * SMALL_K);

/// Default per-k-mer cap on stored posting-list length. TF itself is never
/// capped; position lists are truncated to `max_tf - 1` entries at query time.
pub const DEFAULT_MAX_TF: u32 = 10_000;

/// Record separator in the linearized reads blob.
pub const READ_SEPARATOR: u8 = b'\n';

/// Separator joining the two mates of a paired-end record.
pub const MATE_SEPARATOR: u8 = b'~';

/// The k-mer widths this index supports.
pub const VALID_K_VALUES: &[usize] = &[SMALL_K, LARGE_K];

/// Check whether a k-mer width is supported.
#[inline]
pub const fn is_valid_k(k: usize) -> bool {
    k == SMALL_K || k == LARGE_K
}

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_k_values() {
        for &k in VALID_K_VALUES {
            assert!(is_valid_k(k), "k={} should be valid", k);
        }
        assert!(!is_valid_k(21));
        assert!(!is_valid_k(31));
        assert!(!is_valid_k(0));
    }

    #[test]
    fn test_dense_id_space() {
        assert_eq!(DENSE_ID_SPACE, 4usize.pow(13));
    }
}
