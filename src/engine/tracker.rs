// src/engine/tracker.rs

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dag::StageSpec;
use crate::types::{JobId, SampleId, StageId, StageType};

/// `{stage → {sample → job id}}` for one run.
pub type DependencyMap = BTreeMap<StageId, BTreeMap<SampleId, JobId>>;

/// Records submitted job ids and answers which upstream jobs a new unit
/// must wait for.
///
/// A stage counts as *tracked* once it has been started in this run, even
/// if every one of its units failed.
#[derive(Debug, Clone, Default)]
pub struct DependencyTracker {
    map: DependencyMap,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `stage` as part of this run.
    pub fn begin_stage(&mut self, stage: &str) {
        self.map.entry(stage.to_string()).or_default();
    }

    /// Store the job id for one unit. A second write for the same key wins.
    pub fn record(&mut self, stage: &str, sample: &str, job: JobId) {
        let jobs = self.map.entry(stage.to_string()).or_default();
        if let Some(previous) = jobs.insert(sample.to_string(), job.clone()) {
            warn!(stage, sample, previous = %previous, job_id = %job, "job id overwritten");
        } else {
            debug!(stage, sample, job_id = %job, "job recorded");
        }
    }

    pub fn is_tracked(&self, stage: &str) -> bool {
        self.map.contains_key(stage)
    }

    pub fn job_id(&self, stage: &str, sample: &str) -> Option<&JobId> {
        self.map.get(stage).and_then(|jobs| jobs.get(sample))
    }

    /// Sample ids recorded under `stage`, in id order.
    pub fn samples_of(&self, stage: &str) -> Vec<SampleId> {
        self.map
            .get(stage)
            .map(|jobs| jobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Job ids recorded under `stage`, in sample-id order.
    pub fn jobs_of(&self, stage: &str) -> Vec<JobId> {
        self.map
            .get(stage)
            .map(|jobs| jobs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Job ids a submission of (`stage`, `sample`) must depend on.
    ///
    /// A merge stage fed by a linear predecessor waits for every job of that
    /// predecessor; otherwise only the job of the same sample counts.
    /// Predecessors without a record contribute nothing.
    pub fn upstream_job_ids(
        &self,
        stage: &StageSpec,
        predecessors: &[&StageSpec],
        sample: &str,
    ) -> Vec<JobId> {
        let mut upstream: Vec<JobId> = Vec::new();

        for pred in predecessors {
            let fan_in = stage.is_merge() && pred.stage_type == StageType::Linear;
            let jobs = if fan_in {
                self.jobs_of(&pred.id)
            } else {
                self.job_id(&pred.id, sample).cloned().into_iter().collect()
            };

            if jobs.is_empty() {
                debug!(stage = %stage.id, predecessor = %pred.id, sample, "no upstream jobs recorded");
            }
            for job in jobs {
                if !upstream.contains(&job) {
                    upstream.push(job);
                }
            }
        }

        upstream
    }

    pub fn map(&self) -> &DependencyMap {
        &self.map
    }

    pub fn into_map(self) -> DependencyMap {
        self.map
    }
}
