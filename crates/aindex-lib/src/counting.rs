//! K-mer counting over FASTA/FASTQ or plain sequence input
//!
//! Counts the k-mers of a corpus — canonical by default, plain forward on
//! request — into a compact `encoding -> count` map, merged from per-chunk
//! maps built in parallel. The result feeds the perfect-hash build and can
//! be dumped as text (sorted by descending count), as the binary companion
//! consumed by `build-hash`, or in a Jellyfish-style FASTA.

use crate::constants::is_valid_k;
use crate::encoding::{decode_kmer_text, encode_kmer_bits};
use crate::error::{AindexError, Result};
use crate::kmer::{scan_canonical, scan_forward};
use ahash::AHashMap;
use needletail::parse_fastx_file;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

/// Counting parameters.
#[derive(Debug, Clone)]
pub struct CountConfig {
    /// K-mer width (13 or 23).
    pub k: usize,
    /// Collapse each window to its canonical form before counting.
    pub canonical: bool,
    /// Drop k-mers occurring fewer than this many times.
    pub min_count: u64,
    /// Number of threads (0 = all available cores).
    pub num_threads: usize,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            k: crate::constants::LARGE_K,
            canonical: true,
            min_count: 1,
            num_threads: 0,
        }
    }
}

/// Count the k-mers of a sequence file.
///
/// FASTA/FASTQ input (gzipped or not) is detected from its leading byte;
/// anything else is treated as plain text with one sequence per line, which
/// covers the linearized reads blob. Returns `(encoding, count)` entries
/// sorted by descending count, ties broken by encoding, with the
/// `min_count` filter applied.
pub fn count_kmers(input: &Path, config: &CountConfig) -> Result<Vec<(u64, u64)>> {
    if !is_valid_k(config.k) {
        return Err(AindexError::UnsupportedK(config.k));
    }

    let sequences = collect_sequences(input)?;
    info!(
        "counting {}-mers over {} sequences",
        config.k,
        sequences.len()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()
        .map_err(|e| AindexError::inconsistent(e.to_string()))?;

    let counts = pool.install(|| match config.k {
        13 => count_sequences::<13>(&sequences, config.canonical),
        _ => count_sequences::<23>(&sequences, config.canonical),
    });

    let mut entries: Vec<(u64, u64)> = counts
        .into_iter()
        .filter(|&(_, count)| count >= config.min_count)
        .collect();
    entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    info!("found {} distinct k-mers", entries.len());
    Ok(entries)
}

/// Load the sequences of a FASTA/FASTQ or plain-text file.
fn collect_sequences(input: &Path) -> Result<Vec<Vec<u8>>> {
    let mut first = [0u8; 1];
    let n = File::open(input)?.read(&mut first)?;
    let fastx = n == 1 && (first[0] == b'>' || first[0] == b'@' || first[0] == 0x1f);

    let mut sequences = Vec::new();
    if fastx {
        let mut reader = parse_fastx_file(input)?;
        while let Some(record) = reader.next() {
            sequences.push(record?.seq().into_owned());
        }
    } else {
        for line in BufReader::new(File::open(input)?).lines() {
            let line = line?;
            if !line.is_empty() {
                sequences.push(line.into_bytes());
            }
        }
    }
    Ok(sequences)
}

fn count_sequences<const K: usize>(sequences: &[Vec<u8>], canonical: bool) -> AHashMap<u64, u64> {
    sequences
        .par_chunks(256)
        .fold(AHashMap::new, |mut local: AHashMap<u64, u64>, chunk| {
            for seq in chunk {
                if canonical {
                    scan_canonical::<K>(seq, |_, bits| *local.entry(bits).or_insert(0) += 1);
                } else {
                    scan_forward::<K>(seq, |_, bits| *local.entry(bits).or_insert(0) += 1);
                }
            }
            local
        })
        .reduce(AHashMap::new, |mut a, b| {
            for (bits, count) in b {
                *a.entry(bits).or_insert(0) += count;
            }
            a
        })
}

/// Write `kmer \t count` lines, most frequent first.
pub fn write_text(path: &Path, k: usize, entries: &[(u64, u64)]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for &(bits, count) in entries {
        out.write_all(&decode_kmer_text(bits, k))?;
        writeln!(out, "\t{count}")?;
    }
    out.flush()?;
    Ok(())
}

/// Write the binary counts companion: entry count and k as u64, then per
/// entry the ASCII k-mer followed by its u64 count.
pub fn write_binary(path: &Path, k: usize, entries: &[(u64, u64)]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&(entries.len() as u64).to_le_bytes())?;
    out.write_all(&(k as u64).to_le_bytes())?;
    for &(bits, count) in entries {
        out.write_all(&decode_kmer_text(bits, k))?;
        out.write_all(&count.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Read a binary counts companion back as `(k, entries)`.
pub fn read_binary(path: &Path) -> Result<(usize, Vec<(u64, u64)>)> {
    let mut input = BufReader::new(File::open(path)?);

    let mut word = [0u8; 8];
    input.read_exact(&mut word)?;
    let num_entries = u64::from_le_bytes(word) as usize;
    input.read_exact(&mut word)?;
    let k = u64::from_le_bytes(word) as usize;
    if !is_valid_k(k) {
        return Err(AindexError::format(path, format!("unsupported k {k}")));
    }

    let mut entries = Vec::with_capacity(num_entries);
    let mut text = vec![0u8; k];
    for _ in 0..num_entries {
        input.read_exact(&mut text)?;
        let bits = encode_kmer_bits(&text)
            .map_err(|e| AindexError::format(path, format!("bad k-mer entry: {e}")))?;
        input.read_exact(&mut word)?;
        entries.push((bits, u64::from_le_bytes(word)));
    }
    Ok((k, entries))
}

/// Write a Jellyfish-style dump: `>count` then the k-mer, per entry.
pub fn write_jellyfish(path: &Path, k: usize, min_count: u64, entries: &[(u64, u64)]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, ">jellyfish_k{k}_min{min_count}")?;
    for &(bits, count) in entries {
        writeln!(out, ">{count}")?;
        out.write_all(&decode_kmer_text(bits, k))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
