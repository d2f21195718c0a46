//! Verified k-mer lookup for the perfect-hash (k = 23) mode
//!
//! The table couples three structures over one id space:
//! - the minimal perfect hash assigning each observed canonical 23-mer a
//!   unique id in `[0, n)`;
//! - the checker array holding, per id, the canonical encoding that must
//!   hash there — this is what rejects perfect-hash false positives;
//! - the TF array of per-k-mer occurrence counts.
//!
//! The hash alone cannot answer membership: on an unseen key it returns an
//! arbitrary id. Every lookup therefore confirms `checker[kid] == bits`
//! before the id is trusted.

use crate::error::{AindexError, Result};
use crate::files::{self, IndexPaths};
use crate::kmer::{Kmer23, Strand};
use crate::mphf::PerfectHash;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;

/// Assigns stable integer ids to canonical k-mer encodings.
///
/// Implemented by both table flavors so the position-index builder can run
/// over either id space.
pub trait KidSpace {
    /// Size of the id space.
    fn num_kids(&self) -> u64;

    /// Verified id of a canonical encoding, or `None` when the encoding is
    /// not part of the id space.
    fn kid_of_canonical(&self, bits: u64) -> Option<u64>;
}

/// The loaded 23-mer table: perfect hash plus mmap'd checker and TF arrays.
pub struct KmerTable {
    hash: PerfectHash,
    checker: files::MappedArray<u64>,
    tf: files::MappedArray<u32>,
}

impl KmerTable {
    /// Open the `.pf`, `.kmers.bin` and `.tf.bin` companions of a prefix.
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let hash = PerfectHash::load(&paths.pf())?;
        let checker = files::MappedArray::<u64>::open(&paths.kmers_bin())?;
        let tf = files::MappedArray::<u32>::open(&paths.tf_bin())?;

        let n = hash.num_keys() as usize;
        if checker.len() != n || tf.len() != n {
            return Err(AindexError::inconsistent(format!(
                "hash has {} keys but checker has {} and tf has {} entries",
                n,
                checker.len(),
                tf.len()
            )));
        }

        info!("loaded k-mer table: {} k-mers", n);
        Ok(Self { hash, checker, tf })
    }

    /// Number of indexed canonical k-mers.
    #[inline]
    pub fn num_kmers(&self) -> u64 {
        self.hash.num_keys()
    }

    /// Resolve a k-mer to its id and matching strand.
    ///
    /// Tries the forward encoding first, then the reverse-complement; each
    /// candidate id is accepted only if the checker confirms it. `None`
    /// means the k-mer (on either strand) is absent from the corpus.
    #[inline]
    pub fn resolve(&self, kmer: Kmer23) -> Option<(u64, Strand)> {
        let checker = self.checker.as_slice();
        let n = self.num_kmers();

        let fwd = kmer.bits();
        let kid = self.hash.get(fwd);
        if kid < n && checker[kid as usize] == fwd {
            return Some((kid, Strand::Forward));
        }

        let rc = kmer.reverse_complement().bits();
        let kid = self.hash.get(rc);
        if kid < n && checker[kid as usize] == rc {
            return Some((kid, Strand::Reverse));
        }

        None
    }

    /// Term frequency by id.
    #[inline]
    pub fn tf_of(&self, kid: u64) -> u32 {
        self.tf.as_slice()[kid as usize]
    }

    /// Term frequency of a k-mer; absent k-mers count zero.
    #[inline]
    pub fn tf(&self, kmer: Kmer23) -> u32 {
        match self.resolve(kmer) {
            Some((kid, _)) => self.tf_of(kid),
            None => 0,
        }
    }

    /// Id of a k-mer on either strand.
    #[inline]
    pub fn kid_of(&self, kmer: Kmer23) -> Option<u64> {
        self.resolve(kmer).map(|(kid, _)| kid)
    }

    /// The canonical k-mer an id stands for.
    pub fn kmer_of_kid(&self, kid: u64) -> Option<Kmer23> {
        self.checker
            .as_slice()
            .get(kid as usize)
            .map(|&bits| Kmer23::from_bits(bits))
    }

    /// The checker array (canonical encodings in kid order).
    #[inline]
    pub fn checker(&self) -> &[u64] {
        self.checker.as_slice()
    }
}

impl KidSpace for KmerTable {
    #[inline]
    fn num_kids(&self) -> u64 {
        self.num_kmers()
    }

    #[inline]
    fn kid_of_canonical(&self, bits: u64) -> Option<u64> {
        let kid = self.hash.get(bits);
        if kid < self.num_kmers() && self.checker.as_slice()[kid as usize] == bits {
            Some(kid)
        } else {
            None
        }
    }
}

/// Writes the table companions for a counted set of canonical 23-mers.
pub struct KmerTableBuilder {
    /// Threads for perfect-hash construction (0 = all cores).
    pub threads: usize,
    /// Also write the `.kmers.txt` text dump.
    pub dump_text: bool,
}

impl KmerTableBuilder {
    /// Build the perfect hash over `entries` (canonical encoding, count)
    /// and persist `.pf`, `.kmers.bin` and `.tf.bin` (plus `.kmers.txt`
    /// when requested). Returns the number of keys.
    pub fn write(&self, paths: &IndexPaths, entries: &[(u64, u32)]) -> Result<u64> {
        let n = entries.len();
        info!("building perfect hash over {} canonical k-mers", n);

        let keys: Vec<u64> = entries.iter().map(|&(bits, _)| bits).collect();
        let hash = PerfectHash::build(keys, self.threads);

        // Scatter encodings and counts into kid order.
        let mut checker = vec![0u64; n];
        let mut tf = vec![0u32; n];
        for &(bits, count) in entries {
            let kid = hash.get(bits) as usize;
            debug_assert!(kid < n, "training key hashed out of range");
            checker[kid] = bits;
            tf[kid] = count;
        }

        hash.save(&paths.pf())?;
        files::write_u64s(&paths.kmers_bin(), &checker)?;
        files::write_u32s(&paths.tf_bin(), &tf)?;

        if self.dump_text {
            let mut out = BufWriter::new(File::create(paths.kmers_txt())?);
            for &bits in &checker {
                out.write_all(&Kmer23::from_bits(bits).to_text())?;
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }

        info!(
            "wrote table companions ({} keys, hash {} bytes)",
            n,
            hash.write_bytes()
        );
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn build_table(kmers: &[(&str, u32)]) -> (tempfile::TempDir, KmerTable) {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(&dir.path().join("test"), 23);

        let entries: Vec<(u64, u32)> = kmers
            .iter()
            .map(|&(text, count)| (Kmer23::from_str(text).unwrap().canonical().bits(), count))
            .collect();

        let builder = KmerTableBuilder {
            threads: 1,
            dump_text: true,
        };
        builder.write(&paths, &entries).unwrap();

        let table = KmerTable::open(&paths).unwrap();
        (dir, table)
    }

    #[test]
    fn test_resolve_forward_and_reverse() {
        let (_dir, table) = build_table(&[
            ("AAAAAAAAAAAAAAAAAAAAAAA", 3),
            ("ACGTACGTACGTACGTACGTACG", 1),
        ]);
        assert_eq!(table.num_kmers(), 2);

        let fwd = Kmer23::from_str("AAAAAAAAAAAAAAAAAAAAAAA").unwrap();
        let (kid_f, strand_f) = table.resolve(fwd).unwrap();
        assert_eq!(strand_f, Strand::Forward);

        let rev = Kmer23::from_str("TTTTTTTTTTTTTTTTTTTTTTT").unwrap();
        let (kid_r, strand_r) = table.resolve(rev).unwrap();
        assert_eq!(strand_r, Strand::Reverse);
        assert_eq!(kid_f, kid_r);
    }

    #[test]
    fn test_tf_and_absent() {
        let (_dir, table) = build_table(&[("AAAAAAAAAAAAAAAAAAAAAAA", 3)]);

        let present = Kmer23::from_str("AAAAAAAAAAAAAAAAAAAAAAA").unwrap();
        assert_eq!(table.tf(present), 3);

        // Same count through the reverse strand.
        let rc = present.reverse_complement();
        assert_eq!(table.tf(rc), 3);

        let absent = Kmer23::from_str("GCGCGCGCGCGCGCGCGCGCGCG").unwrap();
        assert_eq!(table.tf(absent), 0);
        assert!(table.resolve(absent).is_none());
    }

    #[test]
    fn test_kid_kmer_roundtrip() {
        let (_dir, table) = build_table(&[
            ("ACGTACGTACGTACGTACGTACG", 1),
            ("GATTACAGATTACAGATTACAGA", 2),
        ]);

        for text in ["ACGTACGTACGTACGTACGTACG", "GATTACAGATTACAGATTACAGA"] {
            let kmer = Kmer23::from_str(text).unwrap();
            let kid = table.kid_of(kmer).unwrap();
            let stored = table.kmer_of_kid(kid).unwrap();
            assert_eq!(stored, kmer.canonical());
        }
    }

    #[test]
    fn test_kid_space_verification() {
        let (_dir, table) = build_table(&[("AAAAAAAAAAAAAAAAAAAAAAA", 1)]);

        let member = Kmer23::from_str("AAAAAAAAAAAAAAAAAAAAAAA")
            .unwrap()
            .canonical()
            .bits();
        assert!(table.kid_of_canonical(member).is_some());

        let stranger = Kmer23::from_str("GGGGGGGGGGGGGGGGGGGGGGG")
            .unwrap()
            .canonical()
            .bits();
        assert!(table.kid_of_canonical(stranger).is_none());
    }

    #[test]
    fn test_kmers_txt_dump() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(&dir.path().join("test"), 23);
        let entries =
            vec![(Kmer23::from_str("ACGTACGTACGTACGTACGTACG").unwrap().canonical().bits(), 1)];
        KmerTableBuilder {
            threads: 1,
            dump_text: true,
        }
        .write(&paths, &entries)
        .unwrap();

        let text = std::fs::read_to_string(paths.kmers_txt()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text.lines().next().unwrap().len(), 23);
    }
}
