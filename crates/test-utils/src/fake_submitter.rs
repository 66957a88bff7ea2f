use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use pipedag::exec::{JobSubmissionRequest, JobSubmitter, SubmitFuture, placeholder_job_id};

/// What the fake submitter saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitEvent {
    Started { stage: String, sample: String },
    Finished { stage: String, sample: String },
}

#[derive(Debug, Default)]
struct State {
    requests: Vec<JobSubmissionRequest>,
    events: Vec<SubmitEvent>,
    mutating_calls: usize,
}

/// A fake submitter that:
/// - records every request and start/finish event
/// - answers `job-<stage>-<sample>` (or the placeholder id for dry runs)
/// - fails or delays selected units on request.
#[derive(Debug, Clone, Default)]
pub struct RecordingSubmitter {
    state: Arc<Mutex<State>>,
    failing: HashSet<(String, String)>,
    delays: HashMap<String, Duration>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make submissions of (`stage`, `sample`) fail.
    pub fn failing(mut self, stage: &str, sample: &str) -> Self {
        self.failing.insert((stage.to_string(), sample.to_string()));
        self
    }

    /// Make every submission of `stage` take `delay`.
    pub fn delayed(mut self, stage: &str, delay: Duration) -> Self {
        self.delays.insert(stage.to_string(), delay);
        self
    }

    pub fn requests(&self) -> Vec<JobSubmissionRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests of one stage, sorted by sample id.
    pub fn requests_for(&self, stage: &str) -> Vec<JobSubmissionRequest> {
        let mut reqs: Vec<_> = self
            .requests()
            .into_iter()
            .filter(|r| r.stage == stage)
            .collect();
        reqs.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));
        reqs
    }

    pub fn events(&self) -> Vec<SubmitEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Calls that were not marked dry-run.
    pub fn mutating_calls(&self) -> usize {
        self.state.lock().unwrap().mutating_calls
    }

    pub fn job_id_for(stage: &str, sample: &str) -> String {
        format!("job-{stage}-{sample}")
    }
}

impl JobSubmitter for RecordingSubmitter {
    fn submit_job(&self, request: JobSubmissionRequest) -> SubmitFuture<'_> {
        let stage = request.stage.clone();
        let sample = request.sample_id.clone();
        let fail = self.failing.contains(&(stage.clone(), sample.clone()));
        let delay = self.delays.get(&stage).copied();

        {
            let mut state = self.state.lock().unwrap();
            if !request.dry_run {
                state.mutating_calls += 1;
            }
            state.events.push(SubmitEvent::Started {
                stage: stage.clone(),
                sample: sample.clone(),
            });
            state.requests.push(request.clone());
        }

        let state = Arc::clone(&self.state);
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            state.lock().unwrap().events.push(SubmitEvent::Finished {
                stage: stage.clone(),
                sample: sample.clone(),
            });

            if fail {
                return Err(anyhow!("backend rejected {stage}/{sample}"));
            }
            if request.dry_run {
                Ok(placeholder_job_id(&request))
            } else {
                Ok(Self::job_id_for(&stage, &sample))
            }
        })
    }
}
