//! shark: mapping-free filtering of RNA-Seq reads against a reference gene
//! set via a Sequence Bloom Tree, without full alignment.
//!
//! Two phases share one [`RunContext`]: index construction (reference
//! FASTA -> SBT) and read classification (sample FASTQ(s) -> labelled
//! output FASTQ(s)). See `SPEC_FULL.md` for the full module breakdown.

mod classify;
mod cli;
mod codec;
mod context;
mod error;
mod hash;
mod index;
mod io;
mod kmer;
mod pipeline;
mod sbt;

use std::cell::RefCell;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;

use classify::{classify_batch, quality_masked_seq, ClassifierConfig, ClassifyScratch, ReadItem, ReadPayload};
use cli::{Cli, Config};
use context::RunContext;
use index::{build_index, IndexBuildConfig};
use io::fastq::{next_synchronized_batch, read_reference, OwnedRecord, SampleReader};
use io::writer::FastqWriter;
use pipeline::emit::Emitter;
use pipeline::ErrorSlot;

/// Batch size for the reference k-mer fill pipeline, matching the
/// original's `FastaSplitter(refseq, 100)`.
const REFERENCE_BATCH_SIZE: usize = 100;

/// Batch size for the sample classification pipeline, matching the
/// original's `FastqSplitter(sseq1, sseq2, 50000, ...)`.
const SAMPLE_BATCH_SIZE: usize = 50_000;

thread_local! {
    static CLASSIFY_SCRATCH: RefCell<ClassifyScratch> = RefCell::new(ClassifyScratch::default());
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::from_cli(cli).map_err(|e| anyhow!(e))?;
    let ctx = RunContext::start();

    if cfg.verbose {
        info!("Reference texts: {}", cfg.reference);
        info!("Sample 1: {}", cfg.sample1);
        if let Some(sample2) = &cfg.sample2 {
            info!("Sample 2: {sample2}");
        }
        info!("K-mer length: {}", cfg.k);
        info!("Threshold value: {}", cfg.confidence);
        info!("Only single associations: {}", if cfg.only_single { "Yes" } else { "No" });
        info!("Minimum base quality: {}", cfg.min_base_quality);
        info!("Method: {:?}", cfg.method);
        info!("Hash functions: {}", cfg.n_hash);
        info!("Threads: {}", cfg.threads);
    }

    let references = read_reference(&cfg.reference)?;
    let gene_names: Vec<String> = references.iter().map(|rec| rec.id_str()).collect();

    let build_cfg = IndexBuildConfig {
        k: cfg.k,
        n_hash: cfg.n_hash,
        bf_size_bits: cfg.bf_size_bits,
        batch_size: REFERENCE_BATCH_SIZE,
        threads: cfg.threads,
    };
    let tree = build_index(&references, &build_cfg, &ctx);

    let mut sample1 = SampleReader::open(&cfg.sample1)?;
    let mut sample2 = match &cfg.sample2 {
        Some(path) => Some(SampleReader::open(path)?),
        None => None,
    };

    let mut out1 = FastqWriter::create(&cfg.out1)?;
    let mut out2 = match &cfg.sample2 {
        Some(_) => Some(FastqWriter::create(&cfg.out2)?),
        None => None,
    };

    let classifier_cfg = ClassifierConfig {
        k: cfg.k,
        n_hash: cfg.n_hash,
        confidence: cfg.confidence,
        only_single: cfg.only_single,
        method: cfg.method,
    };

    let read_error = ErrorSlot::new();
    let mut exhausted = false;

    let split = || -> Option<Vec<ReadItem>> {
        if exhausted {
            return None;
        }
        let batch = match next_synchronized_batch(&mut sample1, sample2.as_mut(), SAMPLE_BATCH_SIZE) {
            Ok(batch) => batch,
            Err(err) => {
                read_error.set(err);
                exhausted = true;
                return None;
            }
        };
        let (batch1, batch2) = batch;
        if batch1.is_empty() {
            exhausted = true;
            return None;
        }
        Some(build_read_items(batch1, batch2, cfg.min_base_quality))
    };

    let map = |batch: Vec<ReadItem>| -> Vec<(usize, ReadPayload)> {
        CLASSIFY_SCRATCH.with(|scratch| classify_batch(&tree, &classifier_cfg, batch, &mut scratch.borrow_mut()))
    };

    let mut emitter = Emitter::new(&mut out1, out2.as_mut(), &gene_names);
    let sink = |batch: Vec<(usize, ReadPayload)>| {
        if let Err(err) = emitter.emit_batch(batch) {
            read_error.set(err);
        }
    };

    pipeline::run(cfg.threads, split, map, sink);

    if let Some(err) = read_error.take() {
        return Err(err);
    }

    emitter.flush()?;
    ctx.checkpoint("sample completed");
    ctx.checkpoint("association done");
    Ok(())
}

/// Turns one synchronized batch of raw sample records into the
/// classifier's input view: quality-masked sequence for scoring, original
/// unmasked record(s) as the emission payload (spec.md §7).
fn build_read_items(batch1: Vec<OwnedRecord>, batch2: Vec<OwnedRecord>, min_quality: u8) -> Vec<ReadItem> {
    if batch2.is_empty() {
        batch1
            .into_iter()
            .map(|rec| {
                let seq = quality_masked_seq(&rec.seq, rec.qual.as_deref(), min_quality);
                ReadItem { seq, payload: ReadPayload::Single(rec) }
            })
            .collect()
    } else {
        batch1
            .into_iter()
            .zip(batch2)
            .map(|(mate1, mate2)| {
                let masked1 = quality_masked_seq(&mate1.seq, mate1.qual.as_deref(), min_quality);
                let masked2 = quality_masked_seq(&mate2.seq, mate2.qual.as_deref(), min_quality);
                let seq = classify::paired_classification_view(&masked1, &masked2);
                ReadItem { seq, payload: ReadPayload::Paired(mate1, mate2) }
            })
            .collect()
    }
}
