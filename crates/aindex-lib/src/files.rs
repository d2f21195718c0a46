//! Companion-file naming and binary array I/O
//!
//! Every index lives as a family of flat files next to a common prefix:
//!
//! ```text
//! <prefix>.reads            linearized reads blob
//! <prefix>.ridx             record index (text: rid, start, end per line)
//! <prefix>.header           FASTA headers (optional)
//! <prefix>.<k>.pf           serialized perfect hash
//! <prefix>.<k>.tf.bin       u32 term frequencies, kid order
//! <prefix>.<k>.kmers.bin    u64 canonical encodings, kid order (checker)
//! <prefix>.<k>.kmers.txt    optional text dump, one k-mer per line
//! <prefix>.<k>.index.bin    u64 positions, 1-based, 0 = empty slot
//! <prefix>.<k>.indices.bin  u64 prefix-sum bounds, n + 1 entries
//! <prefix>.<k>.pos.bin      u64 per-read start offsets (auxiliary)
//! ```
//!
//! On-disk integers are little-endian; mapped access assumes a little-endian
//! 64-bit host.

use crate::error::{AindexError, Result};
use bytemuck::Pod;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Append a suffix to a path without touching its existing extension.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// Path of the linearized reads blob for a prefix.
pub fn reads_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, ".reads")
}

/// Path of the record index for a prefix.
pub fn ridx_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, ".ridx")
}

/// Path of the FASTA header companion for a prefix.
pub fn header_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, ".header")
}

/// Names of the per-k companion files of one index.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    base: PathBuf,
}

impl IndexPaths {
    /// Companion names under `<prefix>.<k>.*`.
    pub fn new(prefix: &Path, k: usize) -> Self {
        Self {
            base: with_suffix(prefix, &format!(".{k}")),
        }
    }

    /// Serialized perfect hash.
    pub fn pf(&self) -> PathBuf {
        with_suffix(&self.base, ".pf")
    }

    /// Term-frequency array.
    pub fn tf_bin(&self) -> PathBuf {
        with_suffix(&self.base, ".tf.bin")
    }

    /// Checker array (canonical encodings in kid order).
    pub fn kmers_bin(&self) -> PathBuf {
        with_suffix(&self.base, ".kmers.bin")
    }

    /// Optional text dump of the k-mers in kid order.
    pub fn kmers_txt(&self) -> PathBuf {
        with_suffix(&self.base, ".kmers.txt")
    }

    /// Position entries (1-based byte offsets).
    pub fn index_bin(&self) -> PathBuf {
        with_suffix(&self.base, ".index.bin")
    }

    /// Prefix-sum bounds over the position entries.
    pub fn indices_bin(&self) -> PathBuf {
        with_suffix(&self.base, ".indices.bin")
    }

    /// Auxiliary per-read metadata.
    pub fn pos_bin(&self) -> PathBuf {
        with_suffix(&self.base, ".pos.bin")
    }
}

/// Write a slice of u32 values as little-endian binary.
pub fn write_u32s(path: &Path, values: &[u32]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for v in values {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Write a slice of u64 values as little-endian binary.
pub fn write_u64s(path: &Path, values: &[u64]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for v in values {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// A read-only memory-mapped array of plain values.
///
/// The mapping is private and page-aligned, so casting the mapped bytes to
/// `&[T]` is sound for the element types used here (u32/u64). Zero-length
/// files map to the empty slice.
pub struct MappedArray<T> {
    path: PathBuf,
    mmap: Option<Mmap>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> MappedArray<T> {
    /// Map a file and validate that its size is a whole number of elements.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len() as usize;
        let elem = std::mem::size_of::<T>();
        if file_len % elem != 0 {
            return Err(AindexError::format(
                path,
                format!("size {file_len} is not a multiple of element size {elem}"),
            ));
        }
        let mmap = if file_len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            len: file_len / elem,
            _marker: PhantomData,
        })
    }

    /// View the mapped file as a slice of elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match &self.mmap {
            Some(mmap) => bytemuck::cast_slice(&mmap[..]),
            None => &[],
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The file this array was mapped from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
