//! Writes classified reads back out as FASTQ, each header suffixed with
//! the matched gene name (or left bare when no gene matched and the read
//! is still emitted, depending on the classifier's discard policy).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::io::fastq::OwnedRecord;

pub struct FastqWriter {
    inner: BufWriter<File>,
}

impl FastqWriter {
    pub fn create(path: &str) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("failed to create output file {path}"))?;
        Ok(FastqWriter { inner: BufWriter::new(file) })
    }

    /// Writes one record, appending ` <gene>` to the header when `gene` is
    /// `Some`. The sequence and quality are written exactly as received
    /// (the caller is responsible for ensuring this is the original,
    /// unmasked record rather than the quality-masked classification view).
    pub fn write_labeled(&mut self, record: &OwnedRecord, gene: Option<&str>) -> Result<()> {
        let qual = record
            .qual
            .as_deref()
            .context("cannot write a FASTQ record with no quality string")?;

        self.inner.write_all(b"@")?;
        self.inner.write_all(&record.id)?;
        if let Some(gene) = gene {
            self.inner.write_all(b" ")?;
            self.inner.write_all(gene.as_bytes())?;
        }
        self.inner.write_all(b"\n")?;
        self.inner.write_all(&record.seq)?;
        self.inner.write_all(b"\n+\n")?;
        self.inner.write_all(qual)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("failed to flush output FASTQ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn labeled_header_carries_gene_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.fq");
        {
            let mut w = FastqWriter::create(path.to_str().unwrap()).unwrap();
            let rec = OwnedRecord { id: b"read1".to_vec(), seq: b"ACGT".to_vec(), qual: Some(b"IIII".to_vec()) };
            w.write_labeled(&rec, Some("geneA")).unwrap();
            w.flush().unwrap();
        }
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "@read1 geneA\nACGT\n+\nIIII\n");
    }

    #[test]
    fn unlabeled_header_has_no_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.fq");
        {
            let mut w = FastqWriter::create(path.to_str().unwrap()).unwrap();
            let rec = OwnedRecord { id: b"read1".to_vec(), seq: b"ACGT".to_vec(), qual: Some(b"IIII".to_vec()) };
            w.write_labeled(&rec, None).unwrap();
            w.flush().unwrap();
        }
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "@read1\nACGT\n+\nIIII\n");
    }
}
