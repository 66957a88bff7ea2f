// tests/fs_abstraction.rs

mod common;

use std::fs;
use std::sync::Arc;

use common::{PipelineBuilder, RecordingSubmitter, StageConfigBuilder, init_tracing, request, with_timeout};
use pipedag::engine::Orchestrator;
use pipedag::fs::{FileSystem, RealFileSystem, list_files};
use pipedag::paths::FilePattern;
use pipedag::report::write_report;
use pipedag::samples::{InputSpec, SequencingFileNames, initial_groups};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn real_directory_listing_and_grouping() -> TestResult {
    let dir = tempfile::tempdir()?;
    for name in [
        "liver_S1_L001_R1_001.fastq.gz",
        "liver_S1_L001_R2_001.fastq.gz",
        "kidney_S2_L001_R1_001.fastq.gz",
        "run.log",
    ] {
        fs::write(dir.path().join(name), b"")?;
    }
    fs::create_dir(dir.path().join("nested"))?;

    let root = dir.path().display().to_string();
    let fastq = list_files(&RealFileSystem, &root, &[FilePattern::parse("^fastq.gz")?], &[])?;
    assert_eq!(fastq.len(), 3);

    let specs = vec![InputSpec::parse(&format!("{root}/*"))?];
    let groups = initial_groups(&specs, &[], &RealFileSystem, &SequencingFileNames)?;
    assert_eq!(groups.sample_ids(), vec!["kidney", "liver", "run"]);
    assert_eq!(groups.files("liver").len(), 2);

    let folder = vec![InputSpec::parse(&format!("{root}/**"))?];
    let groups = initial_groups(&folder, &[], &RealFileSystem, &SequencingFileNames)?;
    assert_eq!(groups.files("kidney"), &[format!("{root}/")]);
    Ok(())
}

#[tokio::test]
async fn run_over_real_files_and_write_report() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("fastq");
    fs::create_dir(&input)?;
    fs::write(input.join("s1_R1.fastq.gz"), b"")?;
    fs::write(input.join("s2_R1.fastq.gz"), b"")?;

    let cfg = PipelineBuilder::new(&["align"])
        .with_stage("align", StageConfigBuilder::linear().output("<sample_id>.bam").build())
        .build();
    let submitter = Arc::new(RecordingSubmitter::new());
    let orch = Orchestrator::new(cfg.graph, Arc::clone(&submitter));

    let location = format!("{}/^fastq.gz", input.display());
    let outcome = with_timeout(orch.run(request(&["align"], &[location.as_str()]))).await?;
    assert_eq!(outcome.submitted_count(), 2);

    let report = dir.path().join("reports").join("run1.toml");
    write_report(&RealFileSystem, &report, &outcome)?;
    let text = RealFileSystem.read_to_string(&report)?;
    assert!(text.contains("run_id = \"run1\""));
    assert!(text.contains("job-align-s1"));
    Ok(())
}
