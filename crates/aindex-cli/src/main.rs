use aindex_lib::builder::{AindexBuilder, BuildConfiguration};
use aindex_lib::constants::{DEFAULT_MAX_TF, DENSE_ID_SPACE, LARGE_K, SMALL_K};
use aindex_lib::counting::{self, CountConfig};
use aindex_lib::dense_table::{write_dense_tf, DenseIdSpace};
use aindex_lib::files::IndexPaths;
use aindex_lib::kmer_table::{KidSpace, KmerTable, KmerTableBuilder};
use aindex_lib::linearize::{compute_reads, ReadsFormat};
use aindex_lib::read_store::ReadStore;
use aindex_lib::{AindexError, QueryEngine};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "aindex")]
#[command(version = "0.1.0")]
#[command(about = "Associative k-mer index over a short-read corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Linearize FASTA/FASTQ reads into a flat blob with a record index
    ComputeReads {
        /// First (or only) input file
        file1: PathBuf,

        /// Second mate file for paired fastq mode, or "-"
        file2: String,

        /// Input shape: fastq (paired), fasta, or se
        format: String,

        /// Output prefix: writes <prefix>.reads, <prefix>.ridx
        /// (and <prefix>.header for fasta)
        output: PathBuf,
    },

    /// Count k-mers of a sequence file
    CountKmers {
        /// Input file (FASTA/FASTQ, gzipped or not, or plain lines)
        input: PathBuf,

        /// K-mer width (13 or 23)
        k: usize,

        /// Output text file; <output>.bin is written alongside
        output: PathBuf,

        /// Number of threads (0 = all available cores)
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,

        /// Minimum count to keep
        #[arg(short = 'm', long, default_value = "1")]
        min_count: u64,

        /// Count canonical k-mers (the default)
        #[arg(short = 'c', long)]
        canonical: bool,

        /// Disable canonicalization
        #[arg(short = 'n', long, conflicts_with = "canonical")]
        non_canonical: bool,

        /// Also write a Jellyfish-style dump to <output>.jf
        #[arg(short = 'j', long)]
        jellyfish: bool,
    },

    /// Build the perfect hash and TF/checker companions from counted k-mers
    BuildHash {
        /// Binary counts file produced by count-kmers
        counts: PathBuf,

        /// Output prefix for the <prefix>.<k>.* companions
        output: PathBuf,

        /// Number of threads (0 = all available cores)
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,

        /// Skip the <prefix>.<k>.kmers.txt dump
        #[arg(long)]
        skip_text: bool,
    },

    /// Build the inverted position index over a linearized reads corpus
    BuildAindex {
        /// Prefix of the <prefix>.reads / <prefix>.ridx pair
        reads: PathBuf,

        /// Prefix of the hash companions (defaults to the reads prefix)
        #[arg(long)]
        hash: Option<PathBuf>,

        /// Output prefix (defaults to the reads prefix)
        #[arg(long)]
        output: Option<PathBuf>,

        /// K-mer width (13 or 23)
        #[arg(short, long, default_value_t = LARGE_K)]
        k: usize,

        /// Per-k-mer cap on stored posting-list length
        #[arg(long, default_value_t = DEFAULT_MAX_TF)]
        max_tf: u32,

        /// Number of threads (0 = all available cores)
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,
    },

    /// Query TF, positions or read hits for k-mers
    Query {
        /// Index prefix
        prefix: PathBuf,

        /// K-mer width (13 or 23)
        #[arg(short, long, default_value_t = LARGE_K)]
        k: usize,

        /// Per-k-mer cap on reported positions
        #[arg(long, default_value_t = DEFAULT_MAX_TF)]
        max_tf: u32,

        /// What to report per k-mer
        #[arg(long, value_enum, default_value = "tf")]
        report: Report,

        /// K-mers given inline
        kmers: Vec<String>,

        /// File with one k-mer per line
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Report {
    /// Term frequency
    Tf,
    /// Byte offsets in the reads blob
    Positions,
    /// Projected read hits
    Hits,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Usage problems exit 1; everything else maps through exit_code.
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(1);
    });

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

/// 2 for unsupported formats, 10 for I/O and mmap failures, 3 for invariant
/// violations detected in index data.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AindexError>() {
        Some(AindexError::UnsupportedK(_)) | Some(AindexError::Parse(_)) => 2,
        Some(AindexError::Io(_)) => 10,
        Some(_) => 3,
        None => 10,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::ComputeReads {
            file1,
            file2,
            format,
            output,
        } => compute_reads_command(&file1, &file2, &format, &output),
        Commands::CountKmers {
            input,
            k,
            output,
            threads,
            min_count,
            canonical: _,
            non_canonical,
            jellyfish,
        } => count_kmers_command(&input, k, &output, threads, min_count, !non_canonical, jellyfish),
        Commands::BuildHash {
            counts,
            output,
            threads,
            skip_text,
        } => build_hash_command(&counts, &output, threads, skip_text),
        Commands::BuildAindex {
            reads,
            hash,
            output,
            k,
            max_tf,
            threads,
        } => {
            let hash = hash.unwrap_or_else(|| reads.clone());
            let output = output.unwrap_or_else(|| reads.clone());
            build_aindex_command(&reads, &hash, &output, k, max_tf, threads)
        }
        Commands::Query {
            prefix,
            k,
            max_tf,
            report,
            kmers,
            file,
        } => query_command(&prefix, k, max_tf, report, kmers, file.as_deref()),
    }
}

fn compute_reads_command(
    file1: &Path,
    file2: &str,
    format: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let format: ReadsFormat = match format.parse() {
        Ok(format) => format,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };
    let mate2 = (file2 != "-").then(|| PathBuf::from(file2));

    let summary = compute_reads(file1, mate2.as_deref(), format, output)
        .with_context(|| format!("linearizing {}", file1.display()))?;
    info!(
        "wrote {} records ({} bytes) under {}",
        summary.n_reads,
        summary.blob_len,
        output.display()
    );
    Ok(())
}

fn count_kmers_command(
    input: &Path,
    k: usize,
    output: &Path,
    threads: usize,
    min_count: u64,
    canonical: bool,
    jellyfish: bool,
) -> anyhow::Result<()> {
    let config = CountConfig {
        k,
        canonical,
        min_count,
        num_threads: threads,
    };
    let entries =
        counting::count_kmers(input, &config).with_context(|| format!("counting {k}-mers"))?;

    counting::write_text(output, k, &entries)?;
    let mut bin = output.as_os_str().to_os_string();
    bin.push(".bin");
    counting::write_binary(Path::new(&bin), k, &entries)?;
    if jellyfish {
        let mut jf = output.as_os_str().to_os_string();
        jf.push(".jf");
        counting::write_jellyfish(Path::new(&jf), k, min_count, &entries)?;
    }

    info!("wrote {} k-mers to {}", entries.len(), output.display());
    Ok(())
}

fn build_hash_command(
    counts: &Path,
    output: &Path,
    threads: usize,
    skip_text: bool,
) -> anyhow::Result<()> {
    let (k, entries) = counting::read_binary(counts)
        .with_context(|| format!("reading counts from {}", counts.display()))?;
    let paths = IndexPaths::new(output, k);

    if k == SMALL_K {
        // The dense universe needs no hash, only the scattered TF array.
        let mut tf = vec![0u32; DENSE_ID_SPACE];
        for (bits, count) in entries {
            tf[bits as usize] = count.min(u32::MAX as u64) as u32;
        }
        write_dense_tf(&paths, &tf)?;
        info!("wrote dense TF array under {}", output.display());
    } else {
        let capped: Vec<(u64, u32)> = entries
            .into_iter()
            .map(|(bits, count)| (bits, count.min(u32::MAX as u64) as u32))
            .collect();
        let n = KmerTableBuilder {
            threads,
            dump_text: !skip_text,
        }
        .write(&paths, &capped)?;
        info!("wrote hash companions for {} k-mers under {}", n, output.display());
    }
    Ok(())
}

fn build_aindex_command(
    reads_prefix: &Path,
    hash_prefix: &Path,
    output_prefix: &Path,
    k: usize,
    max_tf: u32,
    threads: usize,
) -> anyhow::Result<()> {
    let config = BuildConfiguration {
        k,
        max_tf,
        num_threads: threads,
    };
    config.validate()?;
    config.print();

    let store = ReadStore::open(
        &aindex_lib::files::reads_path(reads_prefix),
        &aindex_lib::files::ridx_path(reads_prefix),
    )
    .with_context(|| format!("opening reads under {}", reads_prefix.display()))?;
    let starts: Vec<u64> = store.records().iter().map(|r| r.start).collect();
    let out_paths = IndexPaths::new(output_prefix, k);

    if k == SMALL_K {
        let kids = DenseIdSpace;
        let built = AindexBuilder::new(&store, &kids, &config).build::<SMALL_K>()?;
        built.persist(&out_paths, &starts)?;
    } else {
        let table = KmerTable::open(&IndexPaths::new(hash_prefix, k))
            .with_context(|| format!("opening hash companions under {}", hash_prefix.display()))?;
        info!("indexing {} canonical k-mers", table.num_kids());
        let built = AindexBuilder::new(&store, &table, &config).build::<LARGE_K>()?;
        built.persist(&out_paths, &starts)?;
    }

    info!("position index written under {}", output_prefix.display());
    Ok(())
}

fn query_command(
    prefix: &Path,
    k: usize,
    max_tf: u32,
    report: Report,
    mut kmers: Vec<String>,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(path) = file {
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            let kmer = line.trim();
            if !kmer.is_empty() {
                kmers.push(kmer.to_string());
            }
        }
    }
    if kmers.is_empty() {
        anyhow::bail!("no k-mers given (pass them inline or via --file)");
    }

    let engine = QueryEngine::open(prefix, k, max_tf)
        .with_context(|| format!("opening index under {}", prefix.display()))?;

    for kmer in &kmers {
        match report {
            Report::Tf => println!("{}\t{}", kmer, engine.tf(kmer)),
            Report::Positions => {
                let positions = engine.positions(kmer);
                let rendered: Vec<String> =
                    positions.iter().map(|p| p.to_string()).collect();
                println!("{}\t{}", kmer, rendered.join(","));
            }
            Report::Hits => {
                for hit in engine.hits(kmer)? {
                    println!(
                        "{}\t{}\t{}\t{}\t{}\t{}",
                        kmer,
                        hit.rid,
                        hit.local_pos,
                        hit.ori,
                        match hit.strand {
                            aindex_lib::Strand::Forward => '+',
                            aindex_lib::Strand::Reverse => '-',
                        },
                        String::from_utf8_lossy(&hit.read),
                    );
                }
            }
        }
    }
    Ok(())
}
