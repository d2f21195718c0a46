//! Dense 13-mer table
//!
//! With k = 13 the key universe (4^13 encodings) is small enough to hold a
//! TF counter for every possible word, so no hash is needed: the canonical
//! encoding itself is the k-mer id. Posting lists, when built, use the same
//! dense id space, which keeps the position-index layout identical to the
//! 23-mer mode.

use crate::constants::DENSE_ID_SPACE;
use crate::error::{AindexError, Result};
use crate::files::{self, IndexPaths};
use crate::kmer::{Kmer13, Strand};
use crate::kmer_table::KidSpace;
use tracing::info;

/// The loaded 13-mer table: one mmap'd TF entry per possible canonical word.
pub struct DenseKmerTable {
    tf: files::MappedArray<u32>,
}

impl DenseKmerTable {
    /// Open the `.tf.bin` companion of a prefix. The array must cover the
    /// full 4^13 id space.
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let tf = files::MappedArray::<u32>::open(&paths.tf_bin())?;
        if tf.len() != DENSE_ID_SPACE {
            return Err(AindexError::format(
                paths.tf_bin(),
                format!("expected {} TF entries, found {}", DENSE_ID_SPACE, tf.len()),
            ));
        }
        info!("loaded dense 13-mer table");
        Ok(Self { tf })
    }

    /// Resolve a 13-mer to its dense id and matching strand. `None` means
    /// the word never occurs in the corpus.
    #[inline]
    pub fn resolve(&self, kmer: Kmer13) -> Option<(u64, Strand)> {
        let (canonical, strand) = kmer.canonical_with_strand();
        let kid = canonical.bits();
        if self.tf.as_slice()[kid as usize] > 0 {
            Some((kid, strand))
        } else {
            None
        }
    }

    /// Term frequency by dense id.
    #[inline]
    pub fn tf_of(&self, kid: u64) -> u32 {
        self.tf.as_slice()[kid as usize]
    }

    /// Term frequency of a 13-mer; absent words count zero.
    #[inline]
    pub fn tf(&self, kmer: Kmer13) -> u32 {
        self.tf_of(kmer.canonical().bits())
    }

    /// The canonical 13-mer a dense id stands for.
    #[inline]
    pub fn kmer_of_kid(&self, kid: u64) -> Option<Kmer13> {
        if (kid as usize) < DENSE_ID_SPACE {
            Some(Kmer13::from_bits(kid))
        } else {
            None
        }
    }

    /// Number of distinct canonical 13-mers observed (non-zero TF entries).
    pub fn num_observed(&self) -> u64 {
        self.tf.as_slice().iter().filter(|&&tf| tf > 0).count() as u64
    }
}

impl KidSpace for DenseKmerTable {
    #[inline]
    fn num_kids(&self) -> u64 {
        DENSE_ID_SPACE as u64
    }

    #[inline]
    fn kid_of_canonical(&self, bits: u64) -> Option<u64> {
        // The encoding is the id; nothing to verify in the dense universe.
        if (bits as usize) < DENSE_ID_SPACE {
            Some(bits)
        } else {
            None
        }
    }
}

/// The dense id space itself: every canonical 13-mer encoding is its own id.
///
/// Builds run over this (no TF file needed yet); the loaded
/// [`DenseKmerTable`] answers the same ids at query time.
pub struct DenseIdSpace;

impl KidSpace for DenseIdSpace {
    #[inline]
    fn num_kids(&self) -> u64 {
        DENSE_ID_SPACE as u64
    }

    #[inline]
    fn kid_of_canonical(&self, bits: u64) -> Option<u64> {
        if (bits as usize) < DENSE_ID_SPACE {
            Some(bits)
        } else {
            None
        }
    }
}

/// Persist a dense TF array as the `.tf.bin` companion of a prefix.
pub fn write_dense_tf(paths: &IndexPaths, tf: &[u32]) -> Result<()> {
    if tf.len() != DENSE_ID_SPACE {
        return Err(AindexError::inconsistent(format!(
            "dense TF array has {} entries, expected {}",
            tf.len(),
            DENSE_ID_SPACE
        )));
    }
    files::write_u32s(&paths.tf_bin(), tf)
}
