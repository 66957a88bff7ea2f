// src/samples/naming.rs

//! Sample-id inference from file names.
//!
//! Inference is a heuristic, so it sits behind [`SampleIdStrategy`]; the
//! default [`SequencingFileNames`] understands Illumina-style FASTQ names.

use std::fmt::Debug;
use std::sync::LazyLock;

use regex::Regex;

use crate::paths::template::file_name;
use crate::types::SampleId;

/// Derives a sample id from a single input file location.
pub trait SampleIdStrategy: Send + Sync + Debug {
    fn infer(&self, path: &str) -> SampleId;
}

/// Tiers are tried in order; the first tier with a match wins and the name
/// is cut at its last occurrence.
static SEQUENCING_SUFFIX_TIERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // sample_S1_L001, sample_S12_R1, sample_S3_I2
        r"(?i)_S\d+_(?:L00[1-4]|R[12]|I[12])",
        // lane marker
        r"(?i)_L00[1-4]",
        // read / index marker
        r"(?i)[_.\-](?:R[12]|I[12])",
    ]
    .into_iter()
    .map(|re| Regex::new(re).expect("static sequencing suffix regex"))
    .collect()
});

const FASTQ_SUFFIXES: [&str; 7] = [
    ".fastq", ".fastq.gz", ".fq", ".fq.gz", ".fq.bz2", ".fastq.bz2", ".fqz",
];
const FASTA_SUFFIXES: [&str; 6] = [
    ".fasta", ".fasta.gz", ".fa", ".fa.gz", ".fa.bz2", ".fasta.bz2",
];

/// Default naming convention for sequencing runs.
///
/// - FASTQ/FASTA names lose their lane/read/index suffix:
///   `sample1_S1_L001_R1_001.fastq.gz` → `sample1`, `test.R1.fastq.gz` → `test`.
/// - Anything else keeps the part before the first dot:
///   `test.bwamem.bam` → `test`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequencingFileNames;

impl SampleIdStrategy for SequencingFileNames {
    fn infer(&self, path: &str) -> SampleId {
        let name = file_name(path.trim_end_matches('/'));
        if name.is_empty() {
            return String::new();
        }

        if is_read_file(name) {
            for tier in SEQUENCING_SUFFIX_TIERS.iter() {
                if let Some(found) = tier.find_iter(name).last() {
                    if found.start() > 0 {
                        return name[..found.start()].to_string();
                    }
                }
            }
        }

        match name.split('.').next() {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => name.to_string(),
        }
    }
}

fn is_read_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    FASTQ_SUFFIXES
        .iter()
        .chain(FASTA_SUFFIXES.iter())
        .any(|s| lower.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(name: &str) -> String {
        SequencingFileNames.infer(name)
    }

    #[test]
    fn strips_read_markers() {
        assert_eq!(infer("test_R1.fastq.gz"), "test");
        assert_eq!(infer("test-R1.fastq.gz"), "test");
        assert_eq!(infer("test.R2.fastq.gz"), "test");
        assert_eq!(infer("s3://bucket/fastq/test_I1.fq"), "test");
    }

    #[test]
    fn illumina_sample_sheet_names() {
        assert_eq!(infer("sample1_S1_L001_R1_001.fastq.gz"), "sample1");
        assert_eq!(infer("sample1_S1_L001_R2_001.fastq.gz"), "sample1");
        assert_eq!(infer("run_a_S117_R1_001.fastq.gz"), "run_a");
        assert_eq!(infer("liver_L002_R1.fastq"), "liver");
    }

    #[test]
    fn non_read_files_use_first_dot() {
        assert_eq!(infer("test.bwamem.bam"), "test");
        assert_eq!(infer("/out/s1.counts.txt"), "s1");
        assert_eq!(infer("noext"), "noext");
    }

    #[test]
    fn fastq_without_markers_falls_back_to_stem() {
        assert_eq!(infer("s1.fastq"), "s1");
    }

    #[test]
    fn empty_and_directory_locations() {
        assert_eq!(infer(""), "");
        assert_eq!(infer("/data/s1/"), "s1");
    }
}
