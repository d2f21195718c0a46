//! Minimal perfect hash over observed canonical k-mers
//!
//! We use PHast (Perfect Hashing made fast) from the `ph` crate with ahash
//! instead of the default SipHash hasher for faster evaluations during both
//! construction and query. The fixed hasher seeds ensure deterministic
//! behavior required for serialization round-trips.
//!
//! The function maps every key of its training set to a unique id in
//! `[0, n)`. On any other key it returns an unspecified id; callers must
//! verify candidate ids against the checker array before trusting them.

use crate::error::{AindexError, Result};
use ph::phast;
use ph::seeds::Bits8;
use ph::GetSize;
use ph::Seedable;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes identifying a serialized perfect-hash file.
const PF_MAGIC: &[u8; 8] = b"AIDXPF01";

/// The seeded hasher used inside the MPHF.
///
/// ahash with fixed seeds is significantly faster than the `ph` crate's
/// default SipHash and stays deterministic across processes.
pub type MphfHasher = Seedable<ahash::RandomState>;

/// The MPHF type — PHast with `Bits8` seeds and the ahash-backed hasher.
pub type Mphf = phast::Function<Bits8, phast::SeedOnly, phast::DefaultCompressedArray, MphfHasher>;

/// Create the deterministic MPHF hasher.
///
/// Must use the same fixed seeds at both build and load time so the
/// serialized function evaluates identically after deserialization.
fn mphf_hasher() -> MphfHasher {
    Seedable(ahash::RandomState::with_seeds(0, 0, 0, 0))
}

/// PHast parameters: 8 bits per seed with the matching bucket size.
fn mphf_params() -> phast::Params<Bits8> {
    phast::Params::new(Bits8, phast::bits_per_seed_to_100_bucket_size(8))
}

/// A minimal perfect hash over a set of canonical k-mer encodings, together
/// with the size of its id space.
pub struct PerfectHash {
    mphf: Mphf,
    num_keys: u64,
}

impl PerfectHash {
    /// Build the function over a set of canonical k-mer encodings.
    ///
    /// `threads == 1` builds single-threaded; any other value uses PHast's
    /// multi-threaded construction (0 means all cores via rayon).
    pub fn build(keys: Vec<u64>, threads: usize) -> Self {
        let num_keys = keys.len() as u64;
        let mphf = if threads == 1 {
            Mphf::with_vec_p_hash_sc(keys, &mphf_params(), mphf_hasher(), phast::SeedOnly)
        } else {
            let threads = if threads == 0 {
                rayon::current_num_threads()
            } else {
                threads
            };
            Mphf::with_slice_p_threads_hash_sc(
                &keys,
                &mphf_params(),
                threads,
                mphf_hasher(),
                phast::SeedOnly,
            )
        };
        Self { mphf, num_keys }
    }

    /// Evaluate the function on a key.
    ///
    /// For training-set keys this is the key's unique id in `[0, n)`. For
    /// any other key the result is arbitrary and may be `>= n`; verify it
    /// against the checker array before use.
    #[inline]
    pub fn get(&self, key: u64) -> u64 {
        self.mphf.get(&key) as u64
    }

    /// Size of the id space (number of training keys).
    #[inline]
    pub fn num_keys(&self) -> u64 {
        self.num_keys
    }

    /// Serialized size of the function in bytes.
    pub fn write_bytes(&self) -> usize {
        self.mphf.size_bytes()
    }

    /// Serialize to a `.pf` file: magic, key count, then the PHast native
    /// serialization.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(PF_MAGIC)?;
        out.write_all(&self.num_keys.to_le_bytes())?;
        self.mphf.write(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Load a `.pf` file produced by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let mut input = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 8];
        input.read_exact(&mut magic)?;
        if &magic != PF_MAGIC {
            return Err(AindexError::format(path, "bad magic for perfect-hash file"));
        }

        let mut count_bytes = [0u8; 8];
        input.read_exact(&mut count_bytes)?;
        let num_keys = u64::from_le_bytes(count_bytes);

        let mphf = Mphf::read_with_hasher_sc(&mut input, mphf_hasher(), phast::SeedOnly)?;
        Ok(Self { mphf, num_keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_keys(n: u64) -> Vec<u64> {
        // Spread keys out so they resemble packed k-mer encodings.
        (0..n).map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15)).collect()
    }

    #[test]
    fn test_build_is_minimal_and_perfect() {
        let keys = sample_keys(1000);
        let hash = PerfectHash::build(keys.clone(), 1);
        assert_eq!(hash.num_keys(), 1000);

        let mut seen = vec![false; keys.len()];
        for &key in &keys {
            let id = hash.get(key) as usize;
            assert!(id < keys.len(), "id {} out of range", id);
            assert!(!seen[id], "id {} assigned twice", id);
            seen[id] = true;
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hash.pf");

        let keys = sample_keys(500);
        let hash = PerfectHash::build(keys.clone(), 1);
        hash.save(&path).unwrap();

        let reloaded = PerfectHash::load(&path).unwrap();
        assert_eq!(reloaded.num_keys(), hash.num_keys());
        for &key in &keys {
            assert_eq!(reloaded.get(key), hash.get(key));
        }
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.pf");
        std::fs::write(&path, b"NOTAPF00junkjunkjunk").unwrap();
        assert!(PerfectHash::load(&path).is_err());
    }
}
