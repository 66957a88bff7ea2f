// tests/runtime_recording_submitter.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    PipelineBuilder, RecordingSubmitter, StageConfigBuilder, finished, first_event, init_tracing,
    last_event, paired_fastq_fs, request, started, with_timeout,
};
use pipedag::config::PipelineFile;
use pipedag::engine::{Orchestrator, UnitStatus};
use pipedag::errors::UnitFailure;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// `*fastqc` is a side branch: bwamem reads the raw inputs, deseq2 merges
/// bwamem's BAMs.
fn rnaseq_pipeline() -> PipelineBuilder {
    PipelineBuilder::new(&["*fastqc", "bwamem", "deseq2"])
        .with_stage("fastqc", StageConfigBuilder::linear().output("<sample_id>_fastqc.html").build())
        .with_stage(
            "bwamem",
            StageConfigBuilder::linear()
                .input("^.fastq.gz")
                .output("<sample_id>.bam")
                .build(),
        )
        .with_stage(
            "deseq2",
            StageConfigBuilder::merge().input("^.bam").output("deseq2.tsv").build(),
        )
}

fn orchestrator(cfg: PipelineFile, submitter: &Arc<RecordingSubmitter>) -> Orchestrator<RecordingSubmitter> {
    let options = cfg.backend.run_options();
    Orchestrator::new(cfg.graph, Arc::clone(submitter))
        .with_fs(paired_fastq_fs())
        .with_options(options)
}

#[tokio::test]
async fn fastqc_bwamem_deseq2_scenario() -> TestResult {
    init_tracing();
    let submitter = Arc::new(RecordingSubmitter::new());
    let orch = orchestrator(rnaseq_pipeline().build(), &submitter);

    let outcome = with_timeout(orch.run(request(
        &["fastqc", "bwamem", "deseq2"],
        &["/in/^fastq.gz"],
    )))
    .await?;

    assert!(outcome.is_success(), "failures: {:?}", outcome.failures);

    let fastqc = submitter.requests_for("fastqc");
    let bwamem = submitter.requests_for("bwamem");
    let deseq2 = submitter.requests_for("deseq2");
    assert_eq!(fastqc.len(), 2);
    assert_eq!(bwamem.len(), 2);
    assert_eq!(deseq2.len(), 1);

    assert_eq!(bwamem[0].sample_id, "s1");
    assert_eq!(
        bwamem[0].inputs,
        vec!["/in/s1_R1.fastq.gz", "/in/s1_R2.fastq.gz"]
    );
    assert!(bwamem[0].depends_on.is_empty());
    assert_eq!(bwamem[0].output, "/out/bwamem/");

    let merge = &deseq2[0];
    assert_eq!(merge.sample_id, "run1_combined");
    assert_eq!(merge.depends_on, vec!["job-bwamem-s1", "job-bwamem-s2"]);
    assert_eq!(merge.inputs, vec!["/out/bwamem/s1.bam", "/out/bwamem/s2.bam"]);

    assert_eq!(
        outcome.job_id("deseq2", "run1_combined").map(String::as_str),
        Some("job-deseq2-run1_combined")
    );
    assert_eq!(outcome.submitted_count(), 5);
    Ok(())
}

#[tokio::test]
async fn dry_run_builds_full_map_without_mutating_calls() -> TestResult {
    init_tracing();
    let submitter = Arc::new(RecordingSubmitter::new());
    let orch = orchestrator(rnaseq_pipeline().build(), &submitter);

    let mut req = request(&["fastqc", "bwamem", "deseq2"], &["/in/^fastq.gz"]);
    req.dry_run = true;
    let outcome = with_timeout(orch.run(req)).await?;

    assert_eq!(submitter.mutating_calls(), 0);
    assert!(submitter.requests().iter().all(|r| r.dry_run));
    assert_eq!(outcome.submitted_count(), 5);
    assert_eq!(
        outcome.job_id("bwamem", "s2").map(String::as_str),
        Some("dryrun_bwamem_s2")
    );

    let deseq2 = submitter.requests_for("deseq2");
    assert_eq!(deseq2[0].depends_on, vec!["dryrun_bwamem_s1", "dryrun_bwamem_s2"]);
    Ok(())
}

#[tokio::test]
async fn later_stage_waits_for_every_unit_of_earlier_stage() -> TestResult {
    init_tracing();
    let submitter = Arc::new(
        RecordingSubmitter::new()
            .delayed("fastqc", Duration::from_millis(40))
            .delayed("bwamem", Duration::from_millis(40)),
    );
    let orch = orchestrator(rnaseq_pipeline().build(), &submitter);

    with_timeout(orch.run(request(
        &["fastqc", "bwamem", "deseq2"],
        &["/in/^fastq.gz"],
    )))
    .await?;

    let events = submitter.events();
    assert!(last_event(&events, finished("fastqc")) < first_event(&events, started("bwamem")));
    assert!(last_event(&events, finished("bwamem")) < first_event(&events, started("deseq2")));
    Ok(())
}

#[tokio::test]
async fn units_of_one_stage_run_concurrently() -> TestResult {
    init_tracing();
    let submitter = Arc::new(RecordingSubmitter::new().delayed("bwamem", Duration::from_millis(50)));
    let orch = orchestrator(rnaseq_pipeline().build(), &submitter);

    with_timeout(orch.run(request(&["bwamem"], &["/in/^fastq.gz"]))).await?;

    // Both units start before either finishes.
    let events = submitter.events();
    assert!(last_event(&events, started("bwamem")) < first_event(&events, finished("bwamem")));
    Ok(())
}

#[tokio::test]
async fn max_in_flight_one_serialises_units() -> TestResult {
    init_tracing();
    let submitter = Arc::new(RecordingSubmitter::new().delayed("bwamem", Duration::from_millis(20)));
    let orch = orchestrator(rnaseq_pipeline().max_in_flight(1).build(), &submitter);

    with_timeout(orch.run(request(&["bwamem"], &["/in/^fastq.gz"]))).await?;

    let events = submitter.events();
    assert!(first_event(&events, finished("bwamem")) < last_event(&events, started("bwamem")));
    Ok(())
}

#[tokio::test]
async fn failed_unit_does_not_stop_siblings_or_later_stages() -> TestResult {
    init_tracing();
    let submitter = Arc::new(RecordingSubmitter::new().failing("bwamem", "s2"));
    let orch = orchestrator(rnaseq_pipeline().build(), &submitter);

    let outcome = with_timeout(orch.run(request(&["bwamem", "deseq2"], &["/in/^fastq.gz"]))).await?;

    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        outcome.unit_status("bwamem", "s2"),
        UnitStatus::Failed(UnitFailure::Submission(_))
    ));
    assert!(matches!(
        outcome.unit_status("bwamem", "s1"),
        UnitStatus::Submitted(_)
    ));

    // deseq2 still runs, over what succeeded.
    let deseq2 = submitter.requests_for("deseq2");
    assert_eq!(deseq2.len(), 1);
    assert_eq!(deseq2[0].depends_on, vec!["job-bwamem-s1"]);
    assert_eq!(deseq2[0].inputs, vec!["/out/bwamem/s1.bam"]);
    Ok(())
}

#[tokio::test]
async fn slow_submission_times_out_per_unit() -> TestResult {
    init_tracing();
    let submitter = Arc::new(RecordingSubmitter::new().delayed("bwamem", Duration::from_secs(2)));
    let orch = orchestrator(rnaseq_pipeline().submit_timeout("30ms").build(), &submitter);

    let outcome = with_timeout(orch.run(request(&["bwamem", "deseq2"], &["/in/^fastq.gz"]))).await?;

    assert_eq!(
        outcome.failure("bwamem", "s1"),
        Some(&UnitFailure::Timeout(Duration::from_millis(30)))
    );
    assert_eq!(
        outcome.failure("bwamem", "s2"),
        Some(&UnitFailure::Timeout(Duration::from_millis(30)))
    );
    // Nothing for deseq2 to consume.
    assert!(matches!(
        outcome.failure("deseq2", "run1_combined"),
        Some(UnitFailure::Resolution(_))
    ));
    assert!(submitter.requests_for("deseq2").is_empty());
    Ok(())
}

#[tokio::test]
async fn overrides_and_compute_reach_the_submitter() -> TestResult {
    init_tracing();
    let cfg = rnaseq_pipeline()
        .with_stage(
            "bwamem",
            StageConfigBuilder::linear()
                .input("^.fastq.gz")
                .output("<sample_id>.bam")
                .submodule("mem")
                .compute(16, 32000)
                .build(),
        )
        .default_compute(2, 4000)
        .build();
    let submitter = Arc::new(RecordingSubmitter::new());
    let orch = orchestrator(cfg, &submitter);

    let mut req = request(&["bwamem", "deseq2"], &["/in/^fastq.gz"]);
    req.stage_args.insert("bwamem".into(), "-t 16".into());
    req.alt_inputs
        .insert("bwamem".into(), vec!["s3://ref/<team_id>/hg38.fa".into()]);
    req.alt_outputs
        .insert("deseq2".into(), vec!["s3://res/<user_id>/<run_id>/<sample_id>/".into()]);
    req.queue = Some("spot".into());
    with_timeout(orch.run(req)).await?;

    let bwamem = submitter.requests_for("bwamem");
    assert_eq!(bwamem[0].submodule.as_deref(), Some("mem"));
    assert_eq!(bwamem[0].args.as_deref(), Some("-t 16"));
    assert_eq!(bwamem[0].alt_inputs, vec!["s3://ref/team1/hg38.fa"]);
    assert_eq!(bwamem[0].compute.vcpus, Some(16));
    assert_eq!(bwamem[0].queue.as_deref(), Some("spot"));

    let deseq2 = submitter.requests_for("deseq2");
    assert_eq!(deseq2[0].alt_outputs, vec!["s3://res/user1/run1/run1_combined/"]);
    assert_eq!(deseq2[0].compute.vcpus, Some(2));
    assert_eq!(deseq2[0].compute.memory, Some(4000));
    assert!(deseq2[0].args.is_none());
    Ok(())
}

#[tokio::test]
async fn explicit_predecessor_overrides_declared_order() -> TestResult {
    init_tracing();
    let cfg = PipelineBuilder::new(&["trim", "align", "qc"])
        .with_stage("trim", StageConfigBuilder::linear().output("<sample_id>.trimmed.fq").build())
        .with_stage("align", StageConfigBuilder::linear().output("<sample_id>.bam").build())
        .with_stage("qc", StageConfigBuilder::linear().after("trim").build())
        .build();
    let submitter = Arc::new(RecordingSubmitter::new());
    let orch = orchestrator(cfg, &submitter);

    with_timeout(orch.run(request(&["trim", "align", "qc"], &["/in/^fastq.gz"]))).await?;

    let qc = submitter.requests_for("qc");
    assert_eq!(qc[0].inputs, vec!["/out/trim/s1.trimmed.fq"]);
    assert_eq!(qc[0].depends_on, vec!["job-trim-s1"]);
    Ok(())
}
