// src/exec/backend.rs

//! Pluggable job submission abstraction.
//!
//! The orchestrator talks to a `JobSubmitter` instead of a concrete batch
//! client. Production uses [`super::command::CommandSubmitter`]; tests
//! provide their own implementation that records what was submitted.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Error;
use crate::types::{ComputeSizing, JobId, SampleId, StageId};

/// Everything the backend needs to submit one (stage, sample) unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSubmissionRequest {
    pub stage: StageId,
    pub submodule: Option<String>,
    pub sample_id: SampleId,
    pub inputs: Vec<String>,
    /// Output directory for this stage, always ending in `/`.
    pub output: String,
    pub args: Option<String>,
    pub alt_inputs: Vec<String>,
    pub alt_outputs: Vec<String>,
    /// Job ids that must finish before this job may start.
    pub depends_on: Vec<JobId>,
    pub queue: Option<String>,
    pub compute: ComputeSizing,
    pub dry_run: bool,
}

/// Future returned by [`JobSubmitter::submit_job`].
pub type SubmitFuture<'a> = Pin<Box<dyn Future<Output = Result<JobId, Error>> + Send + 'a>>;

/// Trait abstracting how jobs reach the batch backend.
///
/// One call per unit; retries are the backend's business. A dry-run request
/// must not change backend state.
pub trait JobSubmitter: Send + Sync {
    fn submit_job(&self, request: JobSubmissionRequest) -> SubmitFuture<'_>;
}

/// Deterministic job id handed out for dry-run submissions.
pub fn placeholder_job_id(request: &JobSubmissionRequest) -> JobId {
    format!("dryrun_{}_{}", request.stage, request.sample_id)
}

/// Submitter that never talks to a backend and answers with placeholder ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSubmitter;

impl JobSubmitter for DryRunSubmitter {
    fn submit_job(&self, request: JobSubmissionRequest) -> SubmitFuture<'_> {
        Box::pin(async move { Ok(placeholder_job_id(&request)) })
    }
}
