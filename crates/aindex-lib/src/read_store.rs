//! Memory-mapped reads blob with its record index
//!
//! The reads blob concatenates read texts separated by `'\n'`; a paired-end
//! record joins its two mates with `'~'`. The `.ridx` companion lists one
//! record per line as `rid start end` (whitespace separated, `end` is the
//! byte offset of the record's last base, inclusive). Records are sorted by
//! `start` and tile the blob with exactly one separator byte between them,
//! which makes offset-to-read recovery a binary search; a record list with
//! gaps or overlaps is rejected as corrupt.

use crate::constants::MATE_SEPARATOR;
use crate::error::{AindexError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// One read record: the byte span of its text in the reads blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRecord {
    /// Byte offset of the record's first base.
    pub start: u64,
    /// Byte offset of the record's last base (inclusive).
    pub end: u64,
}

impl ReadRecord {
    /// Record length in bytes (mates and their separator included).
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// The mmap'd reads blob plus its parsed record list.
pub struct ReadStore {
    reads: Mmap,
    records: Vec<ReadRecord>,
}

impl ReadStore {
    /// Map the reads blob and parse the record index.
    pub fn open(reads_path: &Path, ridx_path: &Path) -> Result<Self> {
        let file = File::open(reads_path)?;
        let reads = unsafe { Mmap::map(&file)? };

        let records = parse_record_index(ridx_path, reads.len() as u64)?;
        info!(
            "mapped reads blob: {} bytes, {} records",
            reads.len(),
            records.len()
        );
        Ok(Self { reads, records })
    }

    /// Number of read records.
    #[inline]
    pub fn num_reads(&self) -> usize {
        self.records.len()
    }

    /// Total length of the reads blob in bytes.
    #[inline]
    pub fn blob_len(&self) -> usize {
        self.reads.len()
    }

    /// The whole blob.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.reads[..]
    }

    /// The record table.
    #[inline]
    pub fn records(&self) -> &[ReadRecord] {
        &self.records
    }

    /// The text of a read (mates and separator included for paired records).
    #[inline]
    pub fn read_by_rid(&self, rid: usize) -> &[u8] {
        let record = &self.records[rid];
        &self.reads[record.start as usize..=record.end as usize]
    }

    /// Map a byte offset back to its containing read.
    ///
    /// Returns the read id and the offset local to the record. An offset
    /// covered by no record (a separator byte, or a position past the blob)
    /// indicates a corrupt index and is a hard error.
    pub fn locate(&self, offset: u64) -> Result<(usize, usize)> {
        // Greatest start <= offset.
        let idx = self.records.partition_point(|r| r.start <= offset);
        if idx == 0 {
            return Err(AindexError::UncoveredOffset(offset));
        }
        let rid = idx - 1;
        let record = &self.records[rid];
        if offset > record.end {
            return Err(AindexError::UncoveredOffset(offset));
        }
        Ok((rid, (offset - record.start) as usize))
    }

    /// Split a record's text into its mates at the `'~'` separator.
    /// Single-end records yield themselves with no right mate.
    pub fn mates(read: &[u8]) -> (&[u8], Option<&[u8]>) {
        match read.iter().position(|&b| b == MATE_SEPARATOR) {
            Some(sep) => (&read[..sep], Some(&read[sep + 1..])),
            None => (read, None),
        }
    }
}

/// Parse a `.ridx` file, validating order and bounds.
fn parse_record_index(path: &Path, blob_len: u64) -> Result<Vec<ReadRecord>> {
    let text = std::fs::read_to_string(path)?;
    let mut records: Vec<ReadRecord> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let rid: usize = next_field(&mut fields, line_no, "rid")?;
        let start: u64 = next_field(&mut fields, line_no, "start")?;
        let end: u64 = next_field(&mut fields, line_no, "end")?;

        if rid != records.len() {
            return Err(AindexError::record_index(
                line_no,
                format!("expected rid {}, found {}", records.len(), rid),
            ));
        }
        if end < start || end >= blob_len {
            return Err(AindexError::record_index(
                line_no,
                format!("span {start}..{end} does not fit a {blob_len}-byte blob"),
            ));
        }
        // Records cover the blob without gaps: one separator byte sits
        // between a record's last base and the next record's first.
        if let Some(prev) = records.last() {
            if start != prev.end + 2 {
                return Err(AindexError::record_index(
                    line_no,
                    format!(
                        "start {} is not adjacent to previous record ending at {}",
                        start, prev.end
                    ),
                ));
            }
        } else if start != 0 {
            return Err(AindexError::record_index(
                line_no,
                format!("first record starts at {start}, expected 0"),
            ));
        }
        records.push(ReadRecord { start, end });
    }

    Ok(records)
}

fn next_field<T: std::str::FromStr>(
    fields: &mut std::str::SplitWhitespace<'_>,
    line_no: usize,
    name: &str,
) -> Result<T> {
    fields
        .next()
        .ok_or_else(|| AindexError::record_index(line_no, format!("missing {name} field")))?
        .parse()
        .map_err(|_| AindexError::record_index(line_no, format!("bad {name} field")))
}
