//! Sequence file I/O: reference FASTA and sample FASTQ reading, classified
//! FASTQ output writing.

pub mod fastq;
pub mod writer;
