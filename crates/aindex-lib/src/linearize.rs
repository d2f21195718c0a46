//! Reads linearization: FASTA/FASTQ to the flat `.reads` + `.ridx` pair
//!
//! Each record becomes one line of bases in the blob. Paired FASTQ joins the
//! two mates with `'~'`, reverse-complementing mate 2 before emission so
//! both mates read in the same orientation. FASTA input additionally gets a
//! `.header` companion (`header \t start \t length` per record).

use crate::constants::MATE_SEPARATOR;
use crate::encoding::reverse_complement_text;
use crate::error::{AindexError, Result};
use crate::files;
use needletail::parse_fastx_file;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Input shapes the linearizer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadsFormat {
    /// Paired FASTQ: two files, mates joined with the separator.
    Fastq,
    /// FASTA: single file, headers preserved in the companion.
    Fasta,
    /// Single-end: one FASTA/FASTQ file, records passed through.
    Se,
}

impl std::str::FromStr for ReadsFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fastq" => Ok(Self::Fastq),
            "fasta" => Ok(Self::Fasta),
            "se" => Ok(Self::Se),
            other => Err(format!("unsupported reads format: {other}")),
        }
    }
}

/// What a linearization produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearizeSummary {
    /// Number of records emitted.
    pub n_reads: u64,
    /// Total bytes of the reads blob.
    pub blob_len: u64,
}

/// Emits the blob line by line and keeps the record index in step.
struct BlobWriter {
    blob: BufWriter<File>,
    ridx: BufWriter<File>,
    next_start: u64,
    n_reads: u64,
}

impl BlobWriter {
    fn create(output_prefix: &Path) -> Result<Self> {
        let blob = BufWriter::new(File::create(files::reads_path(output_prefix))?);
        let ridx = BufWriter::new(File::create(files::ridx_path(output_prefix))?);
        Ok(Self {
            blob,
            ridx,
            next_start: 0,
            n_reads: 0,
        })
    }

    /// Write one record (mates already joined) and index it. Returns the
    /// record's start offset.
    fn push(&mut self, record: &[u8]) -> Result<u64> {
        let start = self.next_start;
        let end = start + record.len() as u64 - 1;
        self.blob.write_all(record)?;
        self.blob.write_all(b"\n")?;
        writeln!(self.ridx, "{}\t{}\t{}", self.n_reads, start, end)?;
        self.next_start = end + 2;
        self.n_reads += 1;
        Ok(start)
    }

    fn finish(mut self) -> Result<LinearizeSummary> {
        self.blob.flush()?;
        self.ridx.flush()?;
        Ok(LinearizeSummary {
            n_reads: self.n_reads,
            blob_len: self.next_start,
        })
    }
}

/// Linearize reads into `<output_prefix>.reads` + `<output_prefix>.ridx`
/// (+ `<output_prefix>.header` for FASTA).
pub fn compute_reads(
    input1: &Path,
    input2: Option<&Path>,
    format: ReadsFormat,
    output_prefix: &Path,
) -> Result<LinearizeSummary> {
    let summary = match format {
        ReadsFormat::Fastq => {
            let input2 = input2.ok_or_else(|| {
                AindexError::inconsistent("paired fastq mode needs a second mate file")
            })?;
            linearize_paired(input1, input2, output_prefix)
        }
        ReadsFormat::Fasta => linearize_fasta(input1, output_prefix),
        ReadsFormat::Se => linearize_single(input1, output_prefix),
    }?;
    info!(
        "linearized {} records into {} bytes",
        summary.n_reads, summary.blob_len
    );
    Ok(summary)
}

fn linearize_paired(input1: &Path, input2: &Path, output_prefix: &Path) -> Result<LinearizeSummary> {
    let mut reader1 = parse_fastx_file(input1)?;
    let mut reader2 = parse_fastx_file(input2)?;
    let mut writer = BlobWriter::create(output_prefix)?;

    let mut joined = Vec::new();
    loop {
        match (reader1.next(), reader2.next()) {
            (Some(rec1), Some(rec2)) => {
                let rec1 = rec1?;
                let rec2 = rec2?;
                joined.clear();
                joined.extend_from_slice(&rec1.seq());
                joined.push(MATE_SEPARATOR);
                joined.extend_from_slice(&reverse_complement_text(&rec2.seq()));
                writer.push(&joined)?;
            }
            (None, None) => break,
            _ => {
                return Err(AindexError::inconsistent(
                    "mate files differ in record count",
                ))
            }
        }
    }
    writer.finish()
}

fn linearize_fasta(input: &Path, output_prefix: &Path) -> Result<LinearizeSummary> {
    let mut reader = parse_fastx_file(input)?;
    let mut writer = BlobWriter::create(output_prefix)?;
    let mut headers = BufWriter::new(File::create(files::header_path(output_prefix))?);

    while let Some(record) = reader.next() {
        let record = record?;
        let seq = record.seq();
        let start = writer.push(&seq)?;
        headers.write_all(record.id())?;
        writeln!(headers, "\t{}\t{}", start, seq.len())?;
    }
    headers.flush()?;
    writer.finish()
}

fn linearize_single(input: &Path, output_prefix: &Path) -> Result<LinearizeSummary> {
    let mut reader = parse_fastx_file(input)?;
    let mut writer = BlobWriter::create(output_prefix)?;

    while let Some(record) = reader.next() {
        let record = record?;
        writer.push(&record.seq())?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_store::ReadStore;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_single_end_fastq() {
        let dir = tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "reads.fastq",
            "@r0\nACGTACGT\n+\nIIIIIIII\n@r1\nTTTT\n+\nIIII\n",
        );
        let prefix = dir.path().join("out");

        let summary = compute_reads(&input, None, ReadsFormat::Se, &prefix).unwrap();
        assert_eq!(summary.n_reads, 2);

        let store =
            ReadStore::open(&files::reads_path(&prefix), &files::ridx_path(&prefix)).unwrap();
        assert_eq!(store.read_by_rid(0), b"ACGTACGT");
        assert_eq!(store.read_by_rid(1), b"TTTT");
    }

    #[test]
    fn test_paired_fastq_joins_and_flips_mate2() {
        let dir = tempdir().unwrap();
        let mate1 = write_file(dir.path(), "r1.fastq", "@p0\nACGT\n+\nIIII\n");
        let mate2 = write_file(dir.path(), "r2.fastq", "@p0\nAACC\n+\nIIII\n");
        let prefix = dir.path().join("out");

        let summary = compute_reads(&mate1, Some(&mate2), ReadsFormat::Fastq, &prefix).unwrap();
        assert_eq!(summary.n_reads, 1);

        let store =
            ReadStore::open(&files::reads_path(&prefix), &files::ridx_path(&prefix)).unwrap();
        // Mate 2 is reverse-complemented before the join.
        assert_eq!(store.read_by_rid(0), b"ACGT~GGTT");
    }

    #[test]
    fn test_paired_fastq_rejects_ragged_mates() {
        let dir = tempdir().unwrap();
        let mate1 = write_file(
            dir.path(),
            "r1.fastq",
            "@p0\nACGT\n+\nIIII\n@p1\nACGT\n+\nIIII\n",
        );
        let mate2 = write_file(dir.path(), "r2.fastq", "@p0\nAACC\n+\nIIII\n");
        let prefix = dir.path().join("out");

        assert!(compute_reads(&mate1, Some(&mate2), ReadsFormat::Fastq, &prefix).is_err());
    }

    #[test]
    fn test_fasta_with_headers() {
        let dir = tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "ref.fasta",
            ">chr1 primary\nACGTACGT\nACGT\n>chr2\nTTTT\n",
        );
        let prefix = dir.path().join("out");

        let summary = compute_reads(&input, None, ReadsFormat::Fasta, &prefix).unwrap();
        assert_eq!(summary.n_reads, 2);

        // Multi-line sequences are flattened into one record.
        let store =
            ReadStore::open(&files::reads_path(&prefix), &files::ridx_path(&prefix)).unwrap();
        assert_eq!(store.read_by_rid(0), b"ACGTACGTACGT");
        assert_eq!(store.read_by_rid(1), b"TTTT");

        let headers = std::fs::read_to_string(files::header_path(&prefix)).unwrap();
        let lines: Vec<&str> = headers.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "chr1 primary\t0\t12");
        assert_eq!(lines[1], "chr2\t13\t4");
    }
}
