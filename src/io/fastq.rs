//! Sequence file reading: the reference FASTA (genes) and one or two FASTQ
//! samples. Built on `needletail`, which handles FASTA/FASTQ and transparent
//! gzip decompression uniformly.

use anyhow::Result;
use log::info;
use needletail::{parse_fastx_file, FastxReader};
use std::path::Path;

use crate::error::ShrakError;

/// An owned sequence record: FASTA records carry `qual: None`.
#[derive(Debug, Clone)]
pub struct OwnedRecord {
    pub id: Vec<u8>,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

impl OwnedRecord {
    pub fn id_str(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }
}

/// Reads an entire reference FASTA into memory, gene order preserved.
/// The reference is assumed small enough to hold in memory at once (the
/// sample streams, read one batch at a time, are what can be arbitrarily
/// large).
pub fn read_reference(path: &str) -> Result<Vec<OwnedRecord>> {
    if !Path::new(path).is_file() {
        return Err(ShrakError::InputNotFound(path.to_string()).into());
    }
    let mut reader = parse_fastx_file(path)
        .map_err(|e| ShrakError::InputMalformed(format!("failed to open reference FASTA {path}: {e}")))?;

    let mut records = Vec::new();
    while let Some(rec) = reader.next() {
        let rec = rec
            .map_err(|e| ShrakError::InputMalformed(format!("malformed record in reference FASTA {path}: {e}")))?;
        records.push(OwnedRecord {
            id: rec.id().to_vec(),
            seq: rec.seq().into_owned(),
            qual: None,
        });
    }

    if records.is_empty() {
        return Err(ShrakError::InputMalformed(format!("reference FASTA {path} contains no records")).into());
    }
    info!("loaded {} reference gene(s) from {}", records.len(), path);
    Ok(records)
}

/// A streaming reader over one FASTQ sample.
pub struct SampleReader {
    reader: Box<dyn FastxReader>,
    path: String,
}

impl SampleReader {
    pub fn open(path: &str) -> Result<Self> {
        if !Path::new(path).is_file() {
            return Err(ShrakError::InputNotFound(path.to_string()).into());
        }
        let reader = parse_fastx_file(path)
            .map_err(|e| ShrakError::InputMalformed(format!("failed to open sample FASTQ {path}: {e}")))?;
        Ok(SampleReader { reader, path: path.to_string() })
    }

    /// Reads up to `batch_size` records, or fewer at end of file. An empty
    /// result means the file is exhausted.
    pub fn next_batch(&mut self, batch_size: usize) -> Result<Vec<OwnedRecord>> {
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            let Some(rec) = self.reader.next() else { break };
            let rec = rec.map_err(|e| {
                ShrakError::InputMalformed(format!("malformed record in sample FASTQ {}: {e}", self.path))
            })?;
            batch.push(OwnedRecord {
                id: rec.id().to_vec(),
                seq: rec.seq().into_owned(),
                qual: rec.qual().map(|q| q.to_vec()),
            });
        }
        Ok(batch)
    }
}

/// Reads a synchronized batch from one or two samples. In paired mode both
/// streams must advance the same number of records each call; a length
/// mismatch at end of file is an input error (truncated mate file).
pub fn next_synchronized_batch(
    r1: &mut SampleReader,
    r2: Option<&mut SampleReader>,
    batch_size: usize,
) -> Result<(Vec<OwnedRecord>, Vec<OwnedRecord>)> {
    let batch1 = r1.next_batch(batch_size)?;
    match r2 {
        None => Ok((batch1, Vec::new())),
        Some(r2) => {
            let batch2 = r2.next_batch(batch_size)?;
            if batch1.len() != batch2.len() {
                return Err(ShrakError::InputMalformed(format!(
                    "paired samples desynchronized: read {} records from mate 1 and {} from mate 2",
                    batch1.len(),
                    batch2.len()
                ))
                .into());
            }
            Ok((batch1, batch2))
        }
    }
}
