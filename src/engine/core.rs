// src/engine/core.rs

//! Pure driver state machine.
//!
//! [`DriverCore`] decides what to submit next and records what came back.
//! It has no Tokio types and performs no IO, so the whole planning and
//! bookkeeping logic is unit tested without a submitter.
//!
//! The async shell ([`super::runtime::Orchestrator`]) loops:
//! `plan_next_stage` → submit every unit → `record_stage`, until planning
//! returns `None`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::{PipelineGraph, StageSpec, normalize_stage_name};
use crate::engine::resolver::{resolve_inputs, stage_output_dir};
use crate::engine::tracker::DependencyTracker;
use crate::engine::{RunOutcome, RunRequest, UnitError, UnitResult};
use crate::errors::{PipedagError, Result, UnitFailure};
use crate::exec::JobSubmissionRequest;
use crate::paths::template::{Placeholders, RUN_ID, SAMPLE_ID, TEAM_ID, USER_ID};
use crate::samples::{SampleGroups, next_stage_samples};
use crate::types::{ComputeSizing, SampleId, StageId};

/// Where the driver is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    PerStage { stage_index: usize },
    PerSample { stage_index: usize, sample_index: usize },
    /// Units of the stage are out for submission.
    Submitting { stage_index: usize },
    /// Results of the stage have been recorded.
    Recording { stage_index: usize },
    Done,
}

/// One unit of a planned stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedUnit {
    Submit(JobSubmissionRequest),
    /// Inputs could not be resolved; already recorded as a failure.
    Unresolved { sample: SampleId, failure: UnitFailure },
}

/// Everything to submit for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub stage_index: usize,
    pub stage: StageId,
    pub units: Vec<PlannedUnit>,
}

impl StagePlan {
    pub fn requests(&self) -> impl Iterator<Item = &JobSubmissionRequest> {
        self.units.iter().filter_map(|u| match u {
            PlannedUnit::Submit(req) => Some(req),
            PlannedUnit::Unresolved { .. } => None,
        })
    }
}

#[derive(Debug)]
pub struct DriverCore {
    graph: Arc<PipelineGraph>,
    request: RunRequest,
    requested: Vec<StageId>,
    groups: SampleGroups,
    initial_ids: Vec<SampleId>,
    compute_defaults: ComputeSizing,
    tracker: DependencyTracker,
    failures: Vec<UnitError>,
    state: DriverState,
}

impl DriverCore {
    /// `requested` is what [`Self::validate_request`] returned for `request`.
    pub fn new(
        graph: Arc<PipelineGraph>,
        request: RunRequest,
        requested: Vec<StageId>,
        groups: SampleGroups,
        compute_defaults: ComputeSizing,
    ) -> Self {
        let initial_ids = groups.sample_ids();
        Self {
            graph,
            request,
            requested,
            groups,
            initial_ids,
            compute_defaults,
            tracker: DependencyTracker::new(),
            failures: Vec::new(),
            state: DriverState::Idle,
        }
    }

    /// Check a request against the graph and return the normalised stage
    /// ids. Nothing has been submitted when this fails.
    pub fn validate_request(graph: &PipelineGraph, request: &RunRequest) -> Result<Vec<StageId>> {
        if request.stages.is_empty() {
            return Err(PipedagError::ConfigError("no stages requested".into()));
        }
        if request.run_id.trim().is_empty() {
            return Err(PipedagError::ConfigError("run id must not be empty".into()));
        }
        if request.output_dir.trim().is_empty() {
            return Err(PipedagError::ConfigError(
                "output directory must not be empty".into(),
            ));
        }

        graph.validate()?;

        let mut requested: Vec<StageId> = Vec::with_capacity(request.stages.len());
        let mut positions: Vec<usize> = Vec::with_capacity(request.stages.len());
        for raw in &request.stages {
            let id = normalize_stage_name(raw);
            graph.require_stage(&id)?;
            if requested.contains(&id) {
                return Err(PipedagError::ConfigError(format!(
                    "stage '{id}' requested more than once"
                )));
            }
            positions.push(graph.stage_index(&id)?);
            requested.push(id);
        }

        // Stages run in the requested order, so a predecessor must come first.
        for (i, id) in requested.iter().enumerate() {
            for pred in graph.predecessors_of(id, &requested) {
                if requested[i + 1..].contains(&pred) {
                    return Err(PipedagError::ConfigError(format!(
                        "stage '{id}' is requested before its predecessor '{pred}'"
                    )));
                }
            }
        }

        let overrides = request
            .stage_args
            .keys()
            .chain(request.alt_inputs.keys())
            .chain(request.alt_outputs.keys());
        for key in overrides {
            if !requested.contains(&normalize_stage_name(key)) {
                return Err(PipedagError::ConfigError(format!(
                    "override given for stage '{key}' which is not requested"
                )));
            }
        }

        if positions.windows(2).any(|w| w[0] > w[1]) {
            warn!(stages = ?requested, "requested stages are not in declaration order");
        }

        Ok(requested)
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn requested(&self) -> &[StageId] {
        &self.requested
    }

    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    /// Plan the next requested stage, or `None` once every stage is done.
    ///
    /// Must not be called again before the previous plan was recorded.
    pub fn plan_next_stage(&mut self) -> Option<StagePlan> {
        let stage_index = match self.state {
            DriverState::Idle => 0,
            DriverState::Recording { stage_index } => stage_index + 1,
            DriverState::Done => return None,
            other => {
                warn!(state = ?other, "stage planned before the previous one was recorded");
                return None;
            }
        };

        let Some(stage_id) = self.requested.get(stage_index).cloned() else {
            self.state = DriverState::Done;
            return None;
        };
        self.state = DriverState::PerStage { stage_index };

        let graph = Arc::clone(&self.graph);
        let Some(stage) = graph.stage(&stage_id) else {
            self.state = DriverState::Done;
            return None;
        };
        let predecessors: Vec<&StageSpec> = graph
            .predecessors_of(&stage_id, &self.requested)
            .iter()
            .filter_map(|p| graph.stage(p))
            .collect();

        let samples = next_stage_samples(
            stage,
            &predecessors,
            &self.tracker,
            &self.initial_ids,
            &self.request.run_id,
        );
        info!(
            stage = %stage_id,
            predecessors = ?predecessors.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            samples = samples.len(),
            "planning stage"
        );

        self.tracker.begin_stage(&stage_id);

        let mut units = Vec::with_capacity(samples.len());
        for (sample_index, sample) in samples.iter().enumerate() {
            self.state = DriverState::PerSample {
                stage_index,
                sample_index,
            };
            units.push(self.plan_unit(stage, &predecessors, sample));
        }

        self.state = DriverState::Submitting { stage_index };
        Some(StagePlan {
            stage_index,
            stage: stage_id,
            units,
        })
    }

    fn plan_unit(
        &mut self,
        stage: &StageSpec,
        predecessors: &[&StageSpec],
        sample: &str,
    ) -> PlannedUnit {
        let inputs = match resolve_inputs(
            stage,
            predecessors,
            sample,
            &self.tracker,
            &self.groups,
            &self.request.output_dir,
        ) {
            Ok(inputs) => inputs,
            Err(failure) => {
                warn!(stage = %stage.id, sample, error = %failure, "unit not submitted");
                self.failures.push(UnitError {
                    stage: stage.id.clone(),
                    sample: sample.to_string(),
                    failure: failure.clone(),
                });
                return PlannedUnit::Unresolved {
                    sample: sample.to_string(),
                    failure,
                };
            }
        };

        let vars = Placeholders::new()
            .with(RUN_ID, self.request.run_id.as_str())
            .with(SAMPLE_ID, sample)
            .with(TEAM_ID, self.request.team_id.as_str())
            .with(USER_ID, self.request.user_id.as_str());
        let expand_all = |locations: Option<&Vec<String>>| -> Vec<String> {
            locations
                .map(|locs| locs.iter().map(|l| vars.expand(l)).collect())
                .unwrap_or_default()
        };

        let request = JobSubmissionRequest {
            stage: stage.id.clone(),
            submodule: stage.submodule.clone(),
            sample_id: sample.to_string(),
            inputs,
            output: stage_output_dir(&self.request.output_dir, &stage.id),
            args: self.request.stage_args.get(&stage.id).cloned(),
            alt_inputs: expand_all(self.request.alt_inputs.get(&stage.id)),
            alt_outputs: expand_all(self.request.alt_outputs.get(&stage.id)),
            depends_on: self.tracker.upstream_job_ids(stage, predecessors, sample),
            queue: self.request.queue.clone(),
            compute: stage.compute.or(self.compute_defaults),
            dry_run: self.request.dry_run,
        };
        debug!(stage = %stage.id, sample, depends_on = ?request.depends_on, "unit planned");
        PlannedUnit::Submit(request)
    }

    /// Record the submission results of the stage planned last.
    pub fn record_stage(&mut self, stage: &str, results: Vec<UnitResult>) {
        let stage_index = match self.state {
            DriverState::Submitting { stage_index } => stage_index,
            other => {
                warn!(state = ?other, stage, "results recorded outside of a submission");
                return;
            }
        };

        let mut seen: BTreeSet<SampleId> = BTreeSet::new();
        for UnitResult { sample, result } in results {
            if !seen.insert(sample.clone()) {
                warn!(stage, sample = %sample, "duplicate result for unit");
            }
            match result {
                Ok(job) => self.tracker.record(stage, &sample, job),
                Err(failure) => {
                    warn!(stage, sample = %sample, error = %failure, "unit failed");
                    self.failures.push(UnitError {
                        stage: stage.to_string(),
                        sample,
                        failure,
                    });
                }
            }
        }

        self.state = DriverState::Recording { stage_index };
    }

    /// Final dependency map plus every unit failure.
    pub fn finish(self) -> RunOutcome {
        RunOutcome {
            run_id: self.request.run_id,
            dependencies: self.tracker.into_map(),
            failures: self.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::dag::Slot;
    use crate::types::StageType;

    fn graph() -> Arc<PipelineGraph> {
        let order = ["*fastqc", "bwamem", "deseq2"];
        let slots: Vec<Slot> = order.iter().map(|s| Slot::parse(s)).collect();
        let mut stages = BTreeMap::new();
        stages.insert("fastqc".to_string(), StageSpec::new("fastqc"));
        let mut bwamem = StageSpec::new("bwamem");
        bwamem.output_patterns = vec!["<sample_id>.bam".into()];
        stages.insert("bwamem".to_string(), bwamem);
        let mut deseq2 = StageSpec::new("deseq2");
        deseq2.stage_type = StageType::Merge;
        stages.insert("deseq2".to_string(), deseq2);
        Arc::new(PipelineGraph::new(slots, stages))
    }

    fn groups() -> SampleGroups {
        let mut g = SampleGroups::new();
        g.add("s1", "/in/s1_R1.fastq.gz");
        g.add("s2", "/in/s2_R1.fastq.gz");
        g
    }

    fn request(stages: &[&str]) -> RunRequest {
        RunRequest {
            stages: stages.iter().map(|s| s.to_string()).collect(),
            output_dir: "/out".into(),
            run_id: "r1".into(),
            team_id: "team".into(),
            user_id: "ann".into(),
            ..Default::default()
        }
    }

    fn core_for(request: RunRequest, compute: ComputeSizing) -> DriverCore {
        let g = graph();
        let requested = DriverCore::validate_request(&g, &request).unwrap();
        DriverCore::new(g, request, requested, groups(), compute)
    }

    fn submit_all(core: &mut DriverCore, plan: &StagePlan) {
        let results = plan
            .requests()
            .map(|r| UnitResult {
                sample: r.sample_id.clone(),
                result: Ok(format!("{}-{}", r.stage, r.sample_id)),
            })
            .collect();
        core.record_stage(&plan.stage, results);
    }

    #[test]
    fn rejects_bad_requests() {
        let g = graph();
        assert!(matches!(
            DriverCore::validate_request(&g, &request(&[])),
            Err(PipedagError::ConfigError(_))
        ));
        assert!(matches!(
            DriverCore::validate_request(&g, &request(&["nope"])),
            Err(PipedagError::StageNotFound(_))
        ));
        assert!(matches!(
            DriverCore::validate_request(&g, &request(&["bwamem", "bwamem"])),
            Err(PipedagError::ConfigError(_))
        ));

        let mut r = request(&["bwamem"]);
        r.stage_args.insert("deseq2".into(), "--x".into());
        assert!(matches!(
            DriverCore::validate_request(&g, &r),
            Err(PipedagError::ConfigError(_))
        ));

        let mut r = request(&["bwamem"]);
        r.run_id.clear();
        assert!(DriverCore::validate_request(&g, &r).is_err());
    }

    #[test]
    fn predecessor_must_be_requested_first() {
        let mut stages: BTreeMap<StageId, StageSpec> = BTreeMap::new();
        stages.insert("trim".into(), StageSpec::new("trim"));
        let mut qc = StageSpec::new("qc");
        qc.explicit_predecessors = Some(vec!["trim".into()]);
        stages.insert("qc".into(), qc);
        let explicit = PipelineGraph::new(vec![Slot::parse("trim"), Slot::parse("qc")], stages);

        assert!(matches!(
            DriverCore::validate_request(&explicit, &request(&["qc", "trim"])),
            Err(PipedagError::ConfigError(_))
        ));
        assert!(DriverCore::validate_request(&explicit, &request(&["trim", "qc"])).is_ok());
        // Without trim in the run, qc has nothing to wait for.
        assert!(DriverCore::validate_request(&explicit, &request(&["qc"])).is_ok());
    }

    #[test]
    fn markers_in_requested_ids_are_ignored() {
        let g = graph();
        let ids = DriverCore::validate_request(&g, &request(&["*fastqc", " bwamem"])).unwrap();
        assert_eq!(ids, vec!["fastqc", "bwamem"]);
    }

    #[test]
    fn walks_states_through_a_run() {
        let mut core = core_for(request(&["bwamem", "deseq2"]), ComputeSizing::default());
        assert_eq!(core.state(), DriverState::Idle);

        let plan = core.plan_next_stage().unwrap();
        assert_eq!(core.state(), DriverState::Submitting { stage_index: 0 });
        assert_eq!(plan.stage, "bwamem");
        assert_eq!(plan.requests().count(), 2);
        // A second plan before recording is refused.
        assert!(core.plan_next_stage().is_none());

        submit_all(&mut core, &plan);
        assert_eq!(core.state(), DriverState::Recording { stage_index: 0 });

        let plan = core.plan_next_stage().unwrap();
        let reqs: Vec<_> = plan.requests().collect();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].sample_id, "r1_combined");
        assert_eq!(reqs[0].depends_on, vec!["bwamem-s1", "bwamem-s2"]);
        assert_eq!(reqs[0].inputs, vec!["/out/bwamem/s1.bam", "/out/bwamem/s2.bam"]);
        assert_eq!(reqs[0].output, "/out/deseq2/");
        submit_all(&mut core, &plan);

        assert!(core.plan_next_stage().is_none());
        assert_eq!(core.state(), DriverState::Done);

        let outcome = core.finish();
        assert_eq!(outcome.submitted_count(), 3);
        assert!(outcome.is_success());
    }

    #[test]
    fn overrides_are_expanded_per_unit() {
        let mut r = request(&["bwamem"]);
        r.stage_args.insert("bwamem".into(), "-t 4".into());
        r.alt_outputs
            .insert("bwamem".into(), vec!["s3://b/<team_id>/<run_id>/<sample_id>/".into()]);
        r.queue = Some("spot".into());

        let mut core = core_for(
            r,
            ComputeSizing {
                vcpus: Some(2),
                memory: Some(4000),
            },
        );
        let plan = core.plan_next_stage().unwrap();
        let req = plan.requests().next().unwrap();

        assert_eq!(req.args.as_deref(), Some("-t 4"));
        assert_eq!(req.alt_outputs, vec!["s3://b/team/r1/s1/"]);
        assert_eq!(req.queue.as_deref(), Some("spot"));
        assert_eq!(req.compute.vcpus, Some(2));
        assert_eq!(req.inputs, vec!["/in/s1_R1.fastq.gz"]);
    }

    #[test]
    fn failures_are_kept_per_unit() {
        let mut core = core_for(request(&["bwamem", "deseq2"]), ComputeSizing::default());
        let plan = core.plan_next_stage().unwrap();
        core.record_stage(
            &plan.stage,
            vec![
                UnitResult {
                    sample: "s1".into(),
                    result: Ok("j1".into()),
                },
                UnitResult {
                    sample: "s2".into(),
                    result: Err(UnitFailure::Submission("boom".into())),
                },
            ],
        );

        let plan = core.plan_next_stage().unwrap();
        let req = plan.requests().next().unwrap();
        assert_eq!(req.depends_on, vec!["j1"]);
        submit_all(&mut core, &plan);

        let outcome = core.finish();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(
            outcome.failure("bwamem", "s2"),
            Some(&UnitFailure::Submission("boom".into()))
        );
        assert!(outcome.job_id("deseq2", "r1_combined").is_some());
    }
}
