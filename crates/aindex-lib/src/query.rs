//! Query engine: TF, positions and read-context hits for one index
//!
//! The engine owns the loaded table (dense 13-mer or perfect-hash 23-mer,
//! chosen by the width the index was opened with), the mmap'd read store and
//! the position index. All state is read-only after open, so queries may run
//! concurrently without locking.
//!
//! A query flows: text -> bit encoding -> table resolve (forward, then
//! reverse-complement, checker-verified) -> TF; the id then selects a
//! position slice whose offsets project through the read store into
//! (read id, local offset, strand) hits.

use crate::constants::{is_valid_k, MATE_SEPARATOR};
use crate::dense_table::DenseKmerTable;
use crate::error::Result;
use crate::files::{self, IndexPaths};
use crate::kmer::{Kmer, Strand};
use crate::kmer_table::{KidSpace, KmerTable};
use crate::position_index::PositionIndex;
use crate::read_store::ReadStore;
use std::path::Path;
use tracing::{info, warn};

/// The two table flavors, tagged by k-mer width.
pub enum IndexTable {
    /// Dense 13-mer mode.
    Dense(DenseKmerTable),
    /// Perfect-hash 23-mer mode.
    Hashed(KmerTable),
}

impl IndexTable {
    /// The k-mer width this table answers.
    #[inline]
    pub fn k(&self) -> usize {
        match self {
            IndexTable::Dense(_) => crate::constants::SMALL_K,
            IndexTable::Hashed(_) => crate::constants::LARGE_K,
        }
    }

    /// Size of the table's id space.
    #[inline]
    pub fn num_kids(&self) -> u64 {
        match self {
            IndexTable::Dense(t) => t.num_kids(),
            IndexTable::Hashed(t) => t.num_kids(),
        }
    }

    fn resolve_text(&self, text: &[u8]) -> Option<(u64, Strand)> {
        match self {
            IndexTable::Dense(t) => Kmer::<13>::from_bytes(text).ok().and_then(|k| t.resolve(k)),
            IndexTable::Hashed(t) => Kmer::<23>::from_bytes(text).ok().and_then(|k| t.resolve(k)),
        }
    }

    fn tf_of(&self, kid: u64) -> u32 {
        match self {
            IndexTable::Dense(t) => t.tf_of(kid),
            IndexTable::Hashed(t) => t.tf_of(kid),
        }
    }

    fn kmer_text_of_kid(&self, kid: u64) -> Option<Vec<u8>> {
        match self {
            IndexTable::Dense(t) => t.kmer_of_kid(kid).map(|k| k.to_text()),
            IndexTable::Hashed(t) => t.kmer_of_kid(kid).map(|k| k.to_text()),
        }
    }
}

/// One projected occurrence of a queried k-mer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Read record containing the occurrence.
    pub rid: usize,
    /// Byte offset of that record's first base in the reads blob.
    pub start: u64,
    /// Offset of the k-mer within the mate it fell into.
    pub local_pos: usize,
    /// 0 for the left (or only) mate, 1 for the right mate.
    pub ori: u8,
    /// Which strand of the query matched the read text.
    pub strand: Strand,
    /// The mate's text.
    pub read: Vec<u8>,
}

/// Read-only query surface over one loaded index.
pub struct QueryEngine {
    table: IndexTable,
    reads: ReadStore,
    positions: Option<PositionIndex>,
}

impl QueryEngine {
    /// Open the index family under a prefix for the given k-mer width.
    ///
    /// The reads blob, its record index and the table companions are
    /// required; the position-index companions are loaded when present and
    /// position/hit queries answer empty without them.
    pub fn open(prefix: &Path, k: usize, max_tf: u32) -> Result<Self> {
        if !is_valid_k(k) {
            return Err(crate::error::AindexError::UnsupportedK(k));
        }

        let reads = ReadStore::open(&files::reads_path(prefix), &files::ridx_path(prefix))?;

        let paths = IndexPaths::new(prefix, k);
        let table = if k == crate::constants::SMALL_K {
            IndexTable::Dense(DenseKmerTable::open(&paths)?)
        } else {
            IndexTable::Hashed(KmerTable::open(&paths)?)
        };

        let positions = if paths.indices_bin().exists() {
            Some(PositionIndex::open(&paths, table.num_kids(), max_tf)?)
        } else {
            info!("no position index for k={k}; TF-only queries available");
            None
        };

        Ok(Self {
            table,
            reads,
            positions,
        })
    }

    /// The k-mer width this engine answers.
    #[inline]
    pub fn k(&self) -> usize {
        self.table.k()
    }

    /// The underlying read store.
    #[inline]
    pub fn reads(&self) -> &ReadStore {
        &self.reads
    }

    /// Term frequency of a k-mer. Invalid or absent queries count zero.
    pub fn tf(&self, kmer: &str) -> u32 {
        match self.table.resolve_text(kmer.as_bytes()) {
            Some((kid, _)) => self.table.tf_of(kid),
            None => 0,
        }
    }

    /// Which strand of the query is indexed, if any.
    pub fn strand_of(&self, kmer: &str) -> Option<Strand> {
        self.table
            .resolve_text(kmer.as_bytes())
            .map(|(_, strand)| strand)
    }

    /// Verified id of a k-mer on either strand.
    pub fn kid_of(&self, kmer: &str) -> Option<u64> {
        self.table.resolve_text(kmer.as_bytes()).map(|(kid, _)| kid)
    }

    /// The canonical k-mer text an id stands for.
    pub fn kmer_of_kid(&self, kid: u64) -> Option<String> {
        self.table
            .kmer_text_of_kid(kid)
            .map(|text| String::from_utf8(text).expect("decoded k-mers are ASCII"))
    }

    /// Byte offsets (0-based) in the reads blob where the k-mer starts.
    ///
    /// Absent k-mers yield an empty list; present k-mers yield at most
    /// `max_tf - 1` offsets in scatter order.
    pub fn positions(&self, kmer: &str) -> Vec<u64> {
        let Some(index) = &self.positions else {
            return Vec::new();
        };
        match self.table.resolve_text(kmer.as_bytes()) {
            Some((kid, _)) => index.positions_of(kid).collect(),
            None => Vec::new(),
        }
    }

    /// Project every stored position of a k-mer into its containing read.
    ///
    /// Each hit records the read id, the mate (`ori`), the offset within
    /// that mate and the matching strand. A position whose read text does
    /// not carry the queried k-mer on either strand means the index and the
    /// blob disagree; such hits are logged and skipped while the rest of
    /// the query proceeds.
    pub fn hits(&self, kmer: &str) -> Result<Vec<Hit>> {
        let Some(index) = &self.positions else {
            return Ok(Vec::new());
        };
        let Some((kid, _)) = self.table.resolve_text(kmer.as_bytes()) else {
            return Ok(Vec::new());
        };

        let k = self.k();
        let query = kmer.to_ascii_uppercase().into_bytes();
        let query_rc = crate::encoding::reverse_complement_text(&query);

        let mut hits = Vec::new();
        for offset in index.positions_of(kid) {
            let (rid, local) = self.reads.locate(offset)?;
            let record_text = self.reads.read_by_rid(rid);

            // Paired-end projection around the mate separator.
            let (mate, mate_pos, ori) =
                match record_text.iter().position(|&b| b == MATE_SEPARATOR) {
                    Some(sep) if local > sep => (&record_text[sep + 1..], local - sep - 1, 1u8),
                    Some(sep) => (&record_text[..sep], local, 0u8),
                    None => (record_text, local, 0u8),
                };

            let strand = match mate.get(mate_pos..mate_pos + k) {
                Some(window) if window.eq_ignore_ascii_case(&query) => Strand::Forward,
                Some(window) if window.eq_ignore_ascii_case(&query_rc) => Strand::Reverse,
                _ => {
                    warn!(kid, offset, rid, "stored position does not verify; skipping");
                    continue;
                }
            };

            hits.push(Hit {
                rid,
                start: self.reads.records()[rid].start,
                local_pos: mate_pos,
                ori,
                strand,
                read: mate.to_vec(),
            });
        }
        Ok(hits)
    }

    /// Group hit offsets by read id, in the mate-local coordinates of
    /// [`hits`](Self::hits).
    pub fn rid_to_positions(&self, kmer: &str) -> Result<Vec<(usize, Vec<usize>)>> {
        let mut grouped: Vec<(usize, Vec<usize>)> = Vec::new();
        for hit in self.hits(kmer)? {
            match grouped.iter_mut().find(|(rid, _)| *rid == hit.rid) {
                Some((_, poses)) => poses.push(hit.local_pos),
                None => grouped.push((hit.rid, vec![hit.local_pos])),
            }
        }
        Ok(grouped)
    }
}
