#![allow(dead_code)]

use std::sync::Arc;

use pipedag::fs::mock::MockFileSystem;

pub use pipedag_test_utils::{
    PipelineBuilder, RecordingSubmitter, StageConfigBuilder, SubmitEvent, init_tracing, request,
    with_timeout,
};

/// Two paired-end samples, `s1` and `s2`, under `/in/`.
pub fn paired_fastq_fs() -> Arc<MockFileSystem> {
    let fs = MockFileSystem::new();
    for sample in ["s1", "s2"] {
        fs.add_file(format!("/in/{sample}_R1.fastq.gz"), b"@r1".to_vec());
        fs.add_file(format!("/in/{sample}_R2.fastq.gz"), b"@r2".to_vec());
    }
    fs.add_file("/in/README.txt", b"not a read file".to_vec());
    Arc::new(fs)
}

/// Index of the first event matching `pred`.
pub fn first_event(events: &[SubmitEvent], pred: impl Fn(&SubmitEvent) -> bool) -> usize {
    events
        .iter()
        .position(pred)
        .expect("expected event was not recorded")
}

/// Index of the last event matching `pred`.
pub fn last_event(events: &[SubmitEvent], pred: impl Fn(&SubmitEvent) -> bool) -> usize {
    events
        .iter()
        .rposition(pred)
        .expect("expected event was not recorded")
}

pub fn started(stage: &'static str) -> impl Fn(&SubmitEvent) -> bool {
    move |e| matches!(e, SubmitEvent::Started { stage: s, .. } if s == stage)
}

pub fn finished(stage: &'static str) -> impl Fn(&SubmitEvent) -> bool {
    move |e| matches!(e, SubmitEvent::Finished { stage: s, .. } if s == stage)
}
