//! Classify-phase sink (C8 Stage 3): writes each surviving `(gene, payload)`
//! association to the output FASTQ stream(s), labelled with the matched
//! gene's name. Runs as the pipeline's serial-in-order sink, so output
//! record order always matches input record order (required for
//! paired-end pairing, spec.md §5) and an empty batch — no read in this
//! batch matched anything — simply writes nothing.

use anyhow::Result;

use crate::classify::ReadPayload;
use crate::io::writer::FastqWriter;

/// Labels and writes association batches produced by [`crate::classify`].
pub struct Emitter<'a> {
    out1: &'a mut FastqWriter,
    out2: Option<&'a mut FastqWriter>,
    gene_names: &'a [String],
}

impl<'a> Emitter<'a> {
    pub fn new(out1: &'a mut FastqWriter, out2: Option<&'a mut FastqWriter>, gene_names: &'a [String]) -> Self {
        Emitter { out1, out2, gene_names }
    }

    /// Writes one batch of associations, in order. Single-end payloads
    /// write one labelled record to `out1`; paired-end payloads write the
    /// labelled mate to `out1` and, when a second output is configured,
    /// its mate to `out2` — both members of the pair are written together
    /// whenever either mate drove the match.
    pub fn emit_batch(&mut self, batch: Vec<(usize, ReadPayload)>) -> Result<()> {
        for (gene_id, payload) in batch {
            let gene = self.gene_names[gene_id].as_str();
            match payload {
                ReadPayload::Single(rec) => {
                    self.out1.write_labeled(&rec, Some(gene))?;
                }
                ReadPayload::Paired(mate1, mate2) => {
                    self.out1.write_labeled(&mate1, Some(gene))?;
                    if let Some(out2) = self.out2.as_deref_mut() {
                        out2.write_labeled(&mate2, Some(gene))?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out1.flush()?;
        if let Some(out2) = self.out2.as_deref_mut() {
            out2.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fastq::OwnedRecord;
    use tempfile::tempdir;

    fn record(id: &str, seq: &str) -> OwnedRecord {
        OwnedRecord { id: id.as_bytes().to_vec(), seq: seq.as_bytes().to_vec(), qual: Some(vec![b'I'; seq.len()]) }
    }

    #[test]
    fn paired_batch_writes_both_mates_labelled() {
        let dir = tempdir().unwrap();
        let p1 = dir.path().join("o1.fq");
        let p2 = dir.path().join("o2.fq");
        let mut w1 = FastqWriter::create(p1.to_str().unwrap()).unwrap();
        let mut w2 = FastqWriter::create(p2.to_str().unwrap()).unwrap();
        let genes = vec!["geneA".to_string(), "geneB".to_string()];

        {
            let mut emitter = Emitter::new(&mut w1, Some(&mut w2), &genes);
            let batch = vec![(1usize, ReadPayload::Paired(record("r1", "ACGT"), record("r1", "TTTT")))];
            emitter.emit_batch(batch).unwrap();
            emitter.flush().unwrap();
        }

        let out1 = std::fs::read_to_string(&p1).unwrap();
        let out2 = std::fs::read_to_string(&p2).unwrap();
        assert_eq!(out1, "@r1 geneB\nACGT\n+\nIIII\n");
        assert_eq!(out2, "@r1 geneB\nTTTT\n+\nIIII\n");
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempdir().unwrap();
        let p1 = dir.path().join("o1.fq");
        let mut w1 = FastqWriter::create(p1.to_str().unwrap()).unwrap();
        let genes = vec!["geneA".to_string()];
        {
            let mut emitter = Emitter::new(&mut w1, None, &genes);
            emitter.emit_batch(Vec::new()).unwrap();
            emitter.flush().unwrap();
        }
        assert_eq!(std::fs::read_to_string(&p1).unwrap(), "");
    }
}
