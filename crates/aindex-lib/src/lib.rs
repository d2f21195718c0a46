// aindex: associative k-mer index over a short-read corpus
//
// Couples a minimal perfect hash over observed k-mers, a term-frequency
// array, an inverted byte-offset index and a read-position index into one
// strand-canonical query surface.

//! Given a fixed-width DNA word, the index answers three queries in O(1)
//! expected time: how often it occurs, at which byte offsets of the reads
//! blob it starts, and which read (plus local offset and strand) each
//! occurrence belongs to. Two widths are supported: k = 13 backed by a
//! dense table over the full 4^13 universe, and k = 23 backed by a minimal
//! perfect hash over the k-mers that actually occur. Forward and
//! reverse-complement queries return the same answers.

#![warn(missing_docs)]

pub mod constants;
pub mod encoding;
pub mod error;
pub mod files;
pub mod kmer;
pub mod mphf;
pub mod kmer_table;
pub mod dense_table;
pub mod read_store;
pub mod position_index;
pub mod builder;
pub mod query;
pub mod linearize;
pub mod counting;

#[cfg(test)]
pub(crate) mod test_util;

pub use builder::{AindexBuilder, BuildConfiguration, BuiltAindex};
pub use dense_table::{DenseIdSpace, DenseKmerTable};
pub use error::{AindexError, Result};
pub use kmer::{Kmer, Kmer13, Kmer23, Strand};
pub use kmer_table::{KidSpace, KmerTable, KmerTableBuilder};
pub use position_index::PositionIndex;
pub use query::{Hit, QueryEngine};
pub use read_store::{ReadRecord, ReadStore};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let (major, minor, patch) = version();
        assert_eq!(major, 0);
        assert_eq!(minor, 1);
        assert_eq!(patch, 0);
    }
}
