//! The aindex: inverted position lists per k-mer id
//!
//! Two mmap'd arrays carry the postings:
//! - `indices[0..n+1]` — monotone prefix-sum bounds; the positions of kid
//!   live in `positions[indices[kid] .. indices[kid+1])`;
//! - `positions[0..m]` — byte offsets into the reads blob, stored 1-based so
//!   that 0 can mark a slot never filled during construction.
//!
//! A third file (`pos.bin`) holds auxiliary build metadata; it is mapped
//! when present but nothing on the query path consumes it.
//!
//! Position lists are truncated: a query yields at most `max_tf - 1`
//! offsets, and a caller cannot distinguish a complete list from a clipped
//! one. The TF value itself is never truncated.

use crate::error::{AindexError, Result};
use crate::files::{self, IndexPaths};
use tracing::info;

/// Read-only view over the aindex arrays of one k-mer id space.
pub struct PositionIndex {
    indices: files::MappedArray<u64>,
    positions: files::MappedArray<u64>,
    aux: Option<files::MappedArray<u64>>,
    max_tf: u32,
}

impl PositionIndex {
    /// Map the `.indices.bin` and `.index.bin` companions of a prefix.
    ///
    /// `num_kids` is the size of the id space the index was built over;
    /// the bounds array must have exactly `num_kids + 1` entries.
    pub fn open(paths: &IndexPaths, num_kids: u64, max_tf: u32) -> Result<Self> {
        let indices = files::MappedArray::<u64>::open(&paths.indices_bin())?;
        let positions = files::MappedArray::<u64>::open(&paths.index_bin())?;

        if indices.len() as u64 != num_kids + 1 {
            return Err(AindexError::format(
                paths.indices_bin(),
                format!(
                    "expected {} bound entries for {} k-mer ids, found {}",
                    num_kids + 1,
                    num_kids,
                    indices.len()
                ),
            ));
        }
        let total = indices.as_slice()[num_kids as usize];
        if total as usize > positions.len() {
            return Err(AindexError::inconsistent(format!(
                "bounds reach {} entries but the position file holds {}",
                total,
                positions.len()
            )));
        }

        // Auxiliary metadata is optional.
        let aux_path = paths.pos_bin();
        let aux = if aux_path.exists() {
            Some(files::MappedArray::<u64>::open(&aux_path)?)
        } else {
            None
        };

        info!(
            "loaded position index: {} stored positions over {} ids",
            total, num_kids
        );
        Ok(Self {
            indices,
            positions,
            aux,
            max_tf,
        })
    }

    /// Size of the id space.
    #[inline]
    pub fn num_kids(&self) -> u64 {
        self.indices.len() as u64 - 1
    }

    /// Total number of posting slots.
    #[inline]
    pub fn total_slots(&self) -> u64 {
        self.indices.as_slice()[self.indices.len() - 1]
    }

    /// The posting-list cap this index was opened with.
    #[inline]
    pub fn max_tf(&self) -> u32 {
        self.max_tf
    }

    /// Whether the auxiliary metadata file was present.
    #[inline]
    pub fn has_aux(&self) -> bool {
        self.aux.is_some()
    }

    /// Byte offsets (0-based) where the k-mer with this id starts.
    ///
    /// Unfilled slots are skipped, and at most `max_tf - 1` offsets are
    /// yielded. Order is the scatter order of construction; callers must
    /// not assume sorted output.
    pub fn positions_of(&self, kid: u64) -> impl Iterator<Item = u64> + '_ {
        let bounds = self.indices.as_slice();
        let lo = bounds[kid as usize] as usize;
        let hi = bounds[kid as usize + 1] as usize;
        self.positions.as_slice()[lo..hi]
            .iter()
            .copied()
            .filter(|&p| p != 0)
            .take((self.max_tf as usize).saturating_sub(1))
            .map(|p| p - 1)
    }

    /// Number of filled slots for an id, before the query-side cap.
    pub fn stored_count(&self, kid: u64) -> usize {
        let bounds = self.indices.as_slice();
        let lo = bounds[kid as usize] as usize;
        let hi = bounds[kid as usize + 1] as usize;
        self.positions.as_slice()[lo..hi]
            .iter()
            .filter(|&&p| p != 0)
            .count()
    }
}

/// Persist the built arrays as the companions of a prefix.
pub fn write_position_files(
    paths: &IndexPaths,
    indices: &[u64],
    positions: &[u64],
    aux: &[u64],
) -> Result<()> {
    files::write_u64s(&paths.indices_bin(), indices)?;
    files::write_u64s(&paths.index_bin(), positions)?;
    files::write_u64s(&paths.pos_bin(), aux)?;
    Ok(())
}
