// src/exec/command.rs

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info};

use crate::exec::backend::{JobSubmissionRequest, JobSubmitter, SubmitFuture, placeholder_job_id};
use crate::types::JobId;

/// Submits jobs by running a shell command per unit.
///
/// The request is passed through `PIPEDAG_*` environment variables; list
/// values are comma-joined. The job id is the last non-empty line the command
/// prints on stdout. Dry-run requests never spawn anything.
#[derive(Debug, Clone)]
pub struct CommandSubmitter {
    submit_cmd: String,
}

impl CommandSubmitter {
    pub fn new(submit_cmd: impl Into<String>) -> Self {
        Self {
            submit_cmd: submit_cmd.into(),
        }
    }

    fn command_for(&self, request: &JobSubmissionRequest) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.submit_cmd);

        let optional = |v: &Option<String>| v.clone().unwrap_or_default();
        let number = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();

        cmd.env("PIPEDAG_STAGE", &request.stage)
            .env("PIPEDAG_SUBMODULE", optional(&request.submodule))
            .env("PIPEDAG_SAMPLE_ID", &request.sample_id)
            .env("PIPEDAG_INPUTS", request.inputs.join(","))
            .env("PIPEDAG_OUTPUT", &request.output)
            .env("PIPEDAG_ARGS", optional(&request.args))
            .env("PIPEDAG_ALT_INPUTS", request.alt_inputs.join(","))
            .env("PIPEDAG_ALT_OUTPUTS", request.alt_outputs.join(","))
            .env("PIPEDAG_DEPENDS_ON", request.depends_on.join(","))
            .env("PIPEDAG_QUEUE", optional(&request.queue))
            .env("PIPEDAG_VCPUS", number(request.compute.vcpus))
            .env("PIPEDAG_MEMORY", number(request.compute.memory));

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn submit(&self, request: JobSubmissionRequest) -> Result<JobId> {
        if request.dry_run {
            let job_id = placeholder_job_id(&request);
            info!(stage = %request.stage, sample = %request.sample_id, job_id = %job_id, "dry run, not submitting");
            return Ok(job_id);
        }

        debug!(
            stage = %request.stage,
            sample = %request.sample_id,
            depends_on = ?request.depends_on,
            "running submit command"
        );

        let output = self
            .command_for(&request)
            .output()
            .await
            .with_context(|| format!("spawning submit command for stage '{}'", request.stage))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(stage = %request.stage, sample = %request.sample_id, "stderr: {}", line);
        }

        if !output.status.success() {
            bail!(
                "submit command exited with code {}",
                output.status.code().unwrap_or(-1)
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
            Some(job_id) => Ok(job_id.to_string()),
            None => bail!("submit command printed no job id"),
        }
    }
}

impl JobSubmitter for CommandSubmitter {
    fn submit_job(&self, request: JobSubmissionRequest) -> SubmitFuture<'_> {
        Box::pin(self.submit(request))
    }
}
