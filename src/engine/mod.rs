// src/engine/mod.rs

//! Orchestration engine for pipedag.
//!
//! This module ties together:
//! - stage planning (sample sets, input resolution, upstream job ids)
//! - per-unit job submission with bounded fan-out
//! - the per-stage barrier that sequences one stage's records before the
//!   next stage is planned
//!
//! The pure state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::UnitFailure;
use crate::types::{ComputeSizing, JobId, SampleId, StageId};

pub mod core;
pub mod resolver;
pub mod runtime;
pub mod tracker;

pub use core::{DriverCore, DriverState, PlannedUnit, StagePlan};
pub use runtime::Orchestrator;
pub use tracker::{DependencyMap, DependencyTracker};

/// One orchestration request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Stages to run, in order. Decoration markers (`*`, `^`, `~`) are
    /// ignored.
    pub stages: Vec<StageId>,
    /// Extra arguments per stage.
    pub stage_args: BTreeMap<StageId, String>,
    /// Alternate input locations per stage; may use `<run_id>`,
    /// `<sample_id>`, `<team_id>` and `<user_id>`.
    pub alt_inputs: BTreeMap<StageId, Vec<String>>,
    pub alt_outputs: BTreeMap<StageId, Vec<String>>,
    /// Initial input locations (files, `dir/*`, `dir/**`, `dir/<pattern>`
    /// or `dir/<glob>`).
    pub inputs: Vec<String>,
    /// Positional sample ids, one per entry of `inputs`.
    pub sample_ids: Vec<SampleId>,
    pub output_dir: String,
    pub run_id: String,
    pub team_id: String,
    pub user_id: String,
    pub queue: Option<String>,
    pub dry_run: bool,
}

/// Knobs for the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Upper bound on concurrent submissions within one stage.
    pub max_in_flight: usize,
    /// Per-call bound on `submit_job`.
    pub submit_timeout: Option<Duration>,
    /// Used where a stage does not size itself.
    pub compute_defaults: ComputeSizing,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            submit_timeout: None,
            compute_defaults: ComputeSizing::default(),
        }
    }
}

/// Result of submitting one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResult {
    pub sample: SampleId,
    pub result: Result<JobId, UnitFailure>,
}

/// A failed (stage, sample) unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitError {
    pub stage: StageId,
    pub sample: SampleId,
    pub failure: UnitFailure,
}

/// Per-unit status looked up from a [`RunOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus<'a> {
    Submitted(&'a JobId),
    Failed(&'a UnitFailure),
    NotRun,
}

/// Everything a run produced: the job ids that were recorded and the units
/// that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: String,
    pub dependencies: DependencyMap,
    pub failures: Vec<UnitError>,
}

impl RunOutcome {
    pub fn job_id(&self, stage: &str, sample: &str) -> Option<&JobId> {
        self.dependencies.get(stage).and_then(|jobs| jobs.get(sample))
    }

    pub fn failure(&self, stage: &str, sample: &str) -> Option<&UnitFailure> {
        self.failures
            .iter()
            .find(|f| f.stage == stage && f.sample == sample)
            .map(|f| &f.failure)
    }

    pub fn unit_status(&self, stage: &str, sample: &str) -> UnitStatus<'_> {
        if let Some(job) = self.job_id(stage, sample) {
            UnitStatus::Submitted(job)
        } else if let Some(failure) = self.failure(stage, sample) {
            UnitStatus::Failed(failure)
        } else {
            UnitStatus::NotRun
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.dependencies.values().map(|jobs| jobs.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
