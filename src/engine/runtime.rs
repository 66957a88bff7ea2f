// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::PipelineGraph;
use crate::errors::{PipedagError, Result, UnitFailure};
use crate::exec::JobSubmitter;
use crate::fs::{FileSystem, RealFileSystem};
use crate::samples::{InputSpec, SampleIdStrategy, SequencingFileNames, initial_groups};
use crate::types::SampleId;

use super::core::{DriverCore, StagePlan};
use super::{RunOptions, RunOutcome, RunRequest, UnitResult};

/// Runs requests against one pipeline graph, submitting through `S`.
///
/// This is the async IO shell around [`DriverCore`]: it lists the initial
/// inputs, fans each stage's units out to the submitter, and joins all of
/// them before the next stage is planned. Dropping the future returned by
/// [`Orchestrator::run`] aborts every in-flight submission.
pub struct Orchestrator<S: JobSubmitter + 'static> {
    graph: Arc<PipelineGraph>,
    submitter: Arc<S>,
    fs: Arc<dyn FileSystem>,
    strategy: Arc<dyn SampleIdStrategy>,
    options: RunOptions,
}

impl<S: JobSubmitter + 'static> fmt::Debug for Orchestrator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("graph", &self.graph)
            .field("fs", &self.fs)
            .field("strategy", &self.strategy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: JobSubmitter + 'static> Orchestrator<S> {
    pub fn new(graph: PipelineGraph, submitter: Arc<S>) -> Self {
        Self {
            graph: Arc::new(graph),
            submitter,
            fs: Arc::new(RealFileSystem),
            strategy: Arc::new(SequencingFileNames),
            options: RunOptions::default(),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SampleIdStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Execute one request.
    ///
    /// Configuration problems fail the whole run before anything is
    /// submitted; unit failures are collected in the returned outcome.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        let requested = DriverCore::validate_request(&self.graph, &request)?;

        let specs = request
            .inputs
            .iter()
            .map(|raw| InputSpec::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        let groups = initial_groups(
            &specs,
            &request.sample_ids,
            self.fs.as_ref(),
            self.strategy.as_ref(),
        )?;
        if groups.is_empty() {
            return Err(PipedagError::ConfigError(format!(
                "no input files found in {:?}",
                request.inputs
            )));
        }

        info!(
            run_id = %request.run_id,
            stages = ?request.stages,
            samples = groups.len(),
            dry_run = request.dry_run,
            "pipedag run started"
        );

        let mut core = DriverCore::new(
            Arc::clone(&self.graph),
            request,
            requested,
            groups,
            self.options.compute_defaults,
        );

        while let Some(plan) = core.plan_next_stage() {
            let results = self.submit_stage(&plan).await;
            core.record_stage(&plan.stage, results);
        }

        let outcome = core.finish();
        info!(
            run_id = %outcome.run_id,
            submitted = outcome.submitted_count(),
            failed = outcome.failures.len(),
            "pipedag run finished"
        );
        Ok(outcome)
    }

    /// Submit every unit of `plan` and wait for all of them.
    async fn submit_stage(&self, plan: &StagePlan) -> Vec<UnitResult> {
        let permits = Arc::new(Semaphore::new(self.options.max_in_flight.max(1)));
        let limit = self.options.submit_timeout;
        let mut in_flight: JoinSet<std::result::Result<String, UnitFailure>> = JoinSet::new();
        let mut samples: HashMap<tokio::task::Id, SampleId> = HashMap::new();

        for request in plan.requests().cloned() {
            let submitter = Arc::clone(&self.submitter);
            let permits = Arc::clone(&permits);
            let sample = request.sample_id.clone();

            let handle = in_flight.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| UnitFailure::Submission(e.to_string()))?;

                let call = submitter.submit_job(request);
                let submitted = match limit {
                    Some(limit) => tokio::time::timeout(limit, call)
                        .await
                        .map_err(|_| UnitFailure::Timeout(limit))?,
                    None => call.await,
                };
                submitted.map_err(|e| UnitFailure::Submission(format!("{e:#}")))
            });
            samples.insert(handle.id(), sample);
        }

        debug!(stage = %plan.stage, units = samples.len(), "units submitted, waiting");

        let mut results = Vec::with_capacity(samples.len());
        while let Some(joined) = in_flight.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => {
                    warn!(stage = %plan.stage, error = %e, "submission task did not complete");
                    (e.id(), Err(UnitFailure::Submission(e.to_string())))
                }
            };
            let Some(sample) = samples.remove(&id) else {
                continue;
            };
            match &result {
                Ok(job_id) => info!(stage = %plan.stage, sample = %sample, job_id = %job_id, "job submitted"),
                Err(failure) => warn!(stage = %plan.stage, sample = %sample, error = %failure, "job submission failed"),
            }
            results.push(UnitResult { sample, result });
        }

        results.sort_by(|a, b| a.sample.cmp(&b.sample));
        results
    }
}
