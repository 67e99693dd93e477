//! CLI surface (A1) and config validation (A2): a `clap` derive `Cli`
//! mirroring the original's `argument_parser.hpp` flags exactly (long
//! names, short names, defaults), turned into a validated [`Config`]
//! before any file is opened, per spec.md §7's error-ordering requirement.

use clap::Parser;

use crate::classify::ScoreMethod;
use crate::codec::MAX_K;
use crate::error::ShrakError;

/// Mapping-free filtering of RNA-Seq reads against reference gene
/// sequences via a Sequence Bloom Tree.
#[derive(Parser, Debug)]
#[command(name = "shark", author, version, about, long_about = None)]
pub struct Cli {
    /// Reference sequences in FASTA format (can be gzipped).
    #[arg(short = 'r', long)]
    pub reference: String,

    /// Sample in FASTQ format (can be gzipped).
    #[arg(short = '1', long)]
    pub sample1: String,

    /// Second sample in FASTQ format (optional, can be gzipped). Enables
    /// paired mode.
    #[arg(short = '2', long)]
    pub sample2: Option<String>,

    /// First output sample in FASTQ.
    #[arg(short = 'o', long, default_value = "sharked_sample.1")]
    pub out1: String,

    /// Second output sample in FASTQ.
    #[arg(short = 'p', long, default_value = "sharked_sample.2")]
    pub out2: String,

    /// Size of the k-mers to index.
    #[arg(short = 'k', long = "kmer-size", default_value_t = 17)]
    pub k: usize,

    /// Confidence for associating a read to a gene.
    #[arg(short = 'c', long = "confidence", default_value_t = 0.6)]
    pub c: f64,

    /// Bloom filter size in KiB.
    #[arg(short = 'b', long = "bf-size", default_value_t = 1024)]
    pub bf_size_kib: u64,

    /// Minimum base quality (Phred+33).
    #[arg(short = 'q', long = "min-base-quality", default_value_t = 0)]
    pub min_base_quality: u8,

    /// Report an association only if a single gene is found.
    #[arg(short = 's', long)]
    pub single: bool,

    /// Number of worker threads.
    #[arg(short = 't', long, default_value_t = 1)]
    pub threads: usize,

    /// Scoring method: "base" or "kmer".
    #[arg(short = 'm', long, default_value = "base")]
    pub method: String,

    /// Number of hash functions.
    #[arg(short = 'x', long = "xxhash", default_value_t = 1)]
    pub n_hash: usize,

    /// Verbose mode: log the resolved configuration before the index
    /// phase starts.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// The validated, ready-to-run configuration derived from [`Cli`]. Every
/// field here has already passed its range check (spec.md §6's
/// Constraint column); constructing a `Config` can only fail with
/// [`ShrakError::ConfigurationInvalid`].
pub struct Config {
    pub reference: String,
    pub sample1: String,
    pub sample2: Option<String>,
    pub out1: String,
    pub out2: String,
    pub k: usize,
    pub confidence: f64,
    pub bf_size_bits: usize,
    pub min_base_quality: u8,
    pub only_single: bool,
    pub threads: usize,
    pub method: ScoreMethod,
    pub n_hash: usize,
    pub verbose: bool,
}

/// Largest power of two that is `<= x` (`x` must be nonzero).
fn prev_power_of_two(x: usize) -> usize {
    debug_assert!(x > 0);
    1usize << (usize::BITS - 1 - x.leading_zeros())
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ShrakError> {
        if cli.k == 0 || cli.k > MAX_K {
            return Err(ShrakError::ConfigurationInvalid(format!(
                "k must be in the range [1, {MAX_K}], got {}",
                cli.k
            )));
        }
        if !(0.0..=1.0).contains(&cli.c) {
            return Err(ShrakError::ConfigurationInvalid(format!(
                "c must be in the range [0, 1], got {}",
                cli.c
            )));
        }
        if cli.threads == 0 {
            return Err(ShrakError::ConfigurationInvalid("at least 1 thread is required".into()));
        }
        if cli.n_hash == 0 {
            return Err(ShrakError::ConfigurationInvalid("at least 1 hash function is required".into()));
        }
        if cli.bf_size_kib == 0 {
            return Err(ShrakError::ConfigurationInvalid("bf-size must be greater than 0".into()));
        }
        let method: ScoreMethod = cli.method.parse().map_err(ShrakError::ConfigurationInvalid)?;

        // Literal-kilobits interpretation (spec.md §9 Open Question),
        // rounded down to the nearest power of two so the SBT's root size
        // invariant (spec.md §3) holds without a separate resize step at
        // the CLI boundary.
        let bf_size_bits = prev_power_of_two(cli.bf_size_kib as usize * 1024);

        Ok(Config {
            reference: cli.reference,
            sample1: cli.sample1,
            sample2: cli.sample2,
            out1: cli.out1,
            out2: cli.out2,
            k: cli.k,
            confidence: cli.c,
            bf_size_bits,
            min_base_quality: cli.min_base_quality,
            only_single: cli.single,
            threads: cli.threads,
            method,
            n_hash: cli.n_hash,
            verbose: cli.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            reference: "ref.fa".into(),
            sample1: "s1.fq".into(),
            sample2: None,
            out1: "sharked_sample.1".into(),
            out2: "sharked_sample.2".into(),
            k: 17,
            c: 0.6,
            bf_size_kib: 1024,
            min_base_quality: 0,
            single: false,
            threads: 1,
            method: "base".into(),
            n_hash: 1,
            verbose: false,
        }
    }

    #[test]
    fn defaults_validate_and_resolve_bf_size() {
        let cfg = Config::from_cli(base_cli()).unwrap();
        assert_eq!(cfg.bf_size_bits, 1024 * 1024);
        assert_eq!(cfg.method, ScoreMethod::Base);
    }

    #[test]
    fn bf_size_rounds_down_to_power_of_two() {
        let mut cli = base_cli();
        cli.bf_size_kib = 1500; // 1500 * 1024 = 1_536_000, not a power of two
        let cfg = Config::from_cli(cli).unwrap();
        assert_eq!(cfg.bf_size_bits, prev_power_of_two(1500 * 1024));
        assert!(cfg.bf_size_bits.is_power_of_two());
    }

    #[test]
    fn k_out_of_range_is_rejected() {
        let mut cli = base_cli();
        cli.k = 32;
        assert!(Config::from_cli(cli).is_err());
        let mut cli = base_cli();
        cli.k = 0;
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        let mut cli = base_cli();
        cli.c = 1.5;
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn zero_threads_or_hashes_is_rejected() {
        let mut cli = base_cli();
        cli.threads = 0;
        assert!(Config::from_cli(cli).is_err());

        let mut cli = base_cli();
        cli.n_hash = 0;
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let mut cli = base_cli();
        cli.method = "exact".into();
        assert!(Config::from_cli(cli).is_err());
    }
}
