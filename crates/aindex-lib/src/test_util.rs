//! Shared helpers for unit tests.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a reads blob + record index for a list of record texts. Paired
/// records are given with their `'~'` separator already in place.
pub(crate) fn write_fixture(dir: &Path, reads: &[&str]) -> (PathBuf, PathBuf) {
    let reads_path = dir.join("sample.reads");
    let ridx_path = dir.join("sample.ridx");

    let mut blob = std::fs::File::create(&reads_path).unwrap();
    let mut ridx = std::fs::File::create(&ridx_path).unwrap();
    let mut start = 0u64;
    for (rid, read) in reads.iter().enumerate() {
        blob.write_all(read.as_bytes()).unwrap();
        blob.write_all(b"\n").unwrap();
        let end = start + read.len() as u64 - 1;
        writeln!(ridx, "{}\t{}\t{}", rid, start, end).unwrap();
        start = end + 2;
    }
    (reads_path, ridx_path)
}
