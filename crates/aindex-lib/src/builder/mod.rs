//! Position-index construction
//!
//! The build runs in four phases over the linearized reads blob:
//! 1. Count TF — scan every record in parallel and bump an atomic counter
//!    per resolved k-mer id. Windows containing a non-ACGT byte, or whose
//!    canonical encoding the id space rejects, are skipped.
//! 2. Allocate slots — a prefix sum over `min(tf, max_tf)` fixes each id's
//!    slice of the position array.
//! 3. Scatter — re-scan the records; each occurrence claims a slot through
//!    a per-id atomic cursor and stores its byte offset plus one (0 marks a
//!    slot that was never filled). Occurrences past the cap are dropped.
//! 4. Persist — write the TF, bound and position arrays (plus per-read
//!    start offsets as auxiliary metadata) to the companion files.
//!
//! No two threads ever write the same position slot: the fetch-add on the
//! cursor hands out distinct slots, and TF updates are plain atomic adds.

pub mod config;

pub use config::BuildConfiguration;

use crate::error::Result;
use crate::files::{self, IndexPaths};
use crate::kmer::scan_canonical;
use crate::kmer_table::KidSpace;
use crate::position_index::write_position_files;
use crate::read_store::ReadStore;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::info;

/// The arrays produced by a build, before or after persisting.
pub struct BuiltAindex {
    /// Exact per-id term frequencies.
    pub tf: Vec<u32>,
    /// Prefix-sum bounds, `num_kids + 1` entries.
    pub indices: Vec<u64>,
    /// Position slots, 1-based offsets, 0 = never filled.
    pub positions: Vec<u64>,
}

impl BuiltAindex {
    /// Phase 4: write every array to the companion files of a prefix.
    /// `read_starts` lands in the auxiliary `pos.bin`.
    pub fn persist(&self, paths: &IndexPaths, read_starts: &[u64]) -> Result<()> {
        files::write_u32s(&paths.tf_bin(), &self.tf)?;
        write_position_files(paths, &self.indices, &self.positions, read_starts)?;
        info!(
            "persisted position index: {} ids, {} slots",
            self.tf.len(),
            self.positions.len()
        );
        Ok(())
    }
}

/// Builds the inverted position lists for one id space over one read store.
pub struct AindexBuilder<'a, S: KidSpace + Sync> {
    reads: &'a ReadStore,
    kids: &'a S,
    config: &'a BuildConfiguration,
}

impl<'a, S: KidSpace + Sync> AindexBuilder<'a, S> {
    /// Create a builder over a read store and an id space.
    pub fn new(reads: &'a ReadStore, kids: &'a S, config: &'a BuildConfiguration) -> Self {
        Self {
            reads,
            kids,
            config,
        }
    }

    /// Run all in-memory phases. `K` must equal `config.k`.
    pub fn build<const K: usize>(&self) -> Result<BuiltAindex> {
        debug_assert_eq!(K, self.config.k);
        self.config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| crate::error::AindexError::inconsistent(e.to_string()))?;

        pool.install(|| {
            info!("phase 1: counting term frequencies");
            let tf = self.count_tf::<K>();

            info!("phase 2: allocating posting slots");
            let indices = self.allocate_slots(&tf);

            info!("phase 3: scattering positions");
            let positions = self.scatter::<K>(&indices);

            Ok(BuiltAindex {
                tf,
                indices,
                positions,
            })
        })
    }

    /// Phase 1: parallel TF count over disjoint records.
    pub fn count_tf<const K: usize>(&self) -> Vec<u32> {
        let n = self.kids.num_kids() as usize;
        let counters: Vec<AtomicU32> = (0..n).map(|_| AtomicU32::new(0)).collect();

        let blob = self.reads.bytes();
        self.reads.records().par_iter().for_each(|record| {
            let text = &blob[record.start as usize..=record.end as usize];
            scan_canonical::<K>(text, |_, canonical| {
                if let Some(kid) = self.kids.kid_of_canonical(canonical) {
                    counters[kid as usize].fetch_add(1, Ordering::Relaxed);
                }
            });
        });

        counters.into_iter().map(AtomicU32::into_inner).collect()
    }

    /// Phase 2: prefix sum with the per-id cap.
    fn allocate_slots(&self, tf: &[u32]) -> Vec<u64> {
        let mut indices = Vec::with_capacity(tf.len() + 1);
        let mut total = 0u64;
        indices.push(0);
        for &count in tf {
            total += count.min(self.config.max_tf) as u64;
            indices.push(total);
        }
        indices
    }

    /// Phase 3: parallel scatter through per-id cursors.
    fn scatter<const K: usize>(&self, indices: &[u64]) -> Vec<u64> {
        let n = indices.len() - 1;
        let total = indices[n] as usize;

        let cursors: Vec<AtomicU64> = indices[..n].iter().map(|&lo| AtomicU64::new(lo)).collect();
        let slots: Vec<AtomicU64> = (0..total).map(|_| AtomicU64::new(0)).collect();

        let blob = self.reads.bytes();
        self.reads.records().par_iter().for_each(|record| {
            let start = record.start as usize;
            let text = &blob[start..=record.end as usize];
            scan_canonical::<K>(text, |local, canonical| {
                if let Some(kid) = self.kids.kid_of_canonical(canonical) {
                    let kid = kid as usize;
                    let slot = cursors[kid].fetch_add(1, Ordering::Relaxed);
                    if slot < indices[kid + 1] {
                        let offset = (start + local) as u64;
                        slots[slot as usize].store(offset + 1, Ordering::Relaxed);
                    }
                }
            });
        });

        slots.into_iter().map(AtomicU64::into_inner).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::Kmer23;
    use crate::test_util::write_fixture;
    use ahash::AHashMap;
    use tempfile::tempdir;

    /// Id space over an explicit canonical set, for exercising the builder
    /// without a perfect hash.
    struct FixedKids {
        map: AHashMap<u64, u64>,
    }

    impl FixedKids {
        fn from_texts(texts: &[&str]) -> Self {
            let mut map = AHashMap::new();
            for (i, text) in texts.iter().enumerate() {
                let canonical = Kmer23::from_str(text).unwrap().canonical().bits();
                map.insert(canonical, i as u64);
            }
            Self { map }
        }
    }

    impl KidSpace for FixedKids {
        fn num_kids(&self) -> u64 {
            self.map.len() as u64
        }

        fn kid_of_canonical(&self, bits: u64) -> Option<u64> {
            self.map.get(&bits).copied()
        }
    }

    fn single_thread_config() -> BuildConfiguration {
        BuildConfiguration {
            k: 23,
            max_tf: 10,
            num_threads: 1,
        }
    }

    #[test]
    fn test_single_occurrence() {
        let dir = tempdir().unwrap();
        let (reads_path, ridx_path) = write_fixture(dir.path(), &["ACACACACACACACACACACACA"]);
        let store = ReadStore::open(&reads_path, &ridx_path).unwrap();
        let kids = FixedKids::from_texts(&["ACACACACACACACACACACACA"]);
        let config = single_thread_config();

        let built = AindexBuilder::new(&store, &kids, &config)
            .build::<23>()
            .unwrap();

        assert_eq!(built.tf, vec![1]);
        assert_eq!(built.indices, vec![0, 1]);
        // Offset 0, stored 1-based.
        assert_eq!(built.positions, vec![1]);
    }

    #[test]
    fn test_strand_collapse() {
        let dir = tempdir().unwrap();
        let (reads_path, ridx_path) = write_fixture(
            dir.path(),
            &["AAAAAAAAAAAAAAAAAAAAAAA", "TTTTTTTTTTTTTTTTTTTTTTT"],
        );
        let store = ReadStore::open(&reads_path, &ridx_path).unwrap();
        let kids = FixedKids::from_texts(&["AAAAAAAAAAAAAAAAAAAAAAA"]);
        let config = single_thread_config();

        let built = AindexBuilder::new(&store, &kids, &config)
            .build::<23>()
            .unwrap();

        // Both strands land on one id.
        assert_eq!(built.tf, vec![2]);
        let mut stored: Vec<u64> = built.positions.iter().map(|&p| p - 1).collect();
        stored.sort_unstable();
        assert_eq!(stored, vec![0, 24]);
    }

    #[test]
    fn test_cap_truncates_slots_not_tf() {
        let dir = tempdir().unwrap();
        let reads: Vec<&str> = std::iter::repeat("ACACACACACACACACACACACA")
            .take(100)
            .collect();
        let (reads_path, ridx_path) = write_fixture(dir.path(), &reads);
        let store = ReadStore::open(&reads_path, &ridx_path).unwrap();
        let kids = FixedKids::from_texts(&["ACACACACACACACACACACACA"]);
        let config = single_thread_config();

        let built = AindexBuilder::new(&store, &kids, &config)
            .build::<23>()
            .unwrap();

        // TF is exact; only the slots are capped.
        assert_eq!(built.tf, vec![100]);
        assert_eq!(built.indices, vec![0, 10]);
        assert_eq!(built.positions.len(), 10);
        assert!(built.positions.iter().all(|&p| p != 0));
    }

    #[test]
    fn test_unknown_kmers_are_skipped() {
        let dir = tempdir().unwrap();
        let (reads_path, ridx_path) = write_fixture(
            dir.path(),
            &["ACACACACACACACACACACACA", "GGGGGGGGGGGGGGGGGGGGGGG"],
        );
        let store = ReadStore::open(&reads_path, &ridx_path).unwrap();
        // Only the first read's word is in the id space.
        let kids = FixedKids::from_texts(&["ACACACACACACACACACACACA"]);
        let config = single_thread_config();

        let built = AindexBuilder::new(&store, &kids, &config)
            .build::<23>()
            .unwrap();
        assert_eq!(built.tf, vec![1]);
        assert_eq!(built.positions, vec![1]);
    }

    #[test]
    fn test_paired_record_offsets() {
        let dir = tempdir().unwrap();
        // Two mates, each one window wide.
        let (reads_path, ridx_path) = write_fixture(
            dir.path(),
            &["ACGTACGTACGTACGTACGTACG~TGCATGCATGCATGCATGCATGC"],
        );
        let store = ReadStore::open(&reads_path, &ridx_path).unwrap();
        let kids = FixedKids::from_texts(&[
            "ACGTACGTACGTACGTACGTACG",
            "TGCATGCATGCATGCATGCATGC",
        ]);
        let config = single_thread_config();

        let built = AindexBuilder::new(&store, &kids, &config)
            .build::<23>()
            .unwrap();

        assert_eq!(built.tf, vec![1, 1]);
        let mut stored: Vec<u64> = built.positions.iter().map(|&p| p - 1).collect();
        stored.sort_unstable();
        // Left mate at 0, right mate just past the separator.
        assert_eq!(stored, vec![0, 24]);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempdir().unwrap();
        let (reads_path, ridx_path) = write_fixture(dir.path(), &["ACACACACACACACACACACACA"]);
        let store = ReadStore::open(&reads_path, &ridx_path).unwrap();
        let kids = FixedKids::from_texts(&["ACACACACACACACACACACACA"]);
        let config = single_thread_config();

        let built = AindexBuilder::new(&store, &kids, &config)
            .build::<23>()
            .unwrap();

        let paths = IndexPaths::new(&dir.path().join("sample"), 23);
        let starts: Vec<u64> = store.records().iter().map(|r| r.start).collect();
        built.persist(&paths, &starts).unwrap();

        let index =
            crate::position_index::PositionIndex::open(&paths, kids.num_kids(), config.max_tf)
                .unwrap();
        assert_eq!(index.positions_of(0).collect::<Vec<_>>(), vec![0]);
        assert!(index.has_aux());
    }
}
