// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod report;
pub mod samples;
pub mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::PipelineFile;
use crate::engine::{Orchestrator, RunOutcome, RunRequest};
use crate::exec::{CommandSubmitter, DryRunSubmitter, JobSubmitter};
use crate::fs::RealFileSystem;
use crate::paths::template::ensure_trailing_slash;
use crate::report::write_report;
use crate::types::StageId;

/// Bucket that holds per-team run outputs when `--output` is not given.
pub const DEFAULT_OUTPUT_ROOT: &str = "s3://hubtenants";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline loading
/// - request construction from the CLI
/// - the submitter (shell command or dry run)
/// - Ctrl-C handling
/// - the optional report and the stdout summary
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.pipeline)?;
    let mut request = build_request(&args);
    if request.queue.is_none() {
        request.queue = cfg.backend.queue.clone();
    }

    let outcome = match cfg.backend.submit_cmd.clone() {
        Some(cmd) => run_interruptible(cfg, request, Arc::new(CommandSubmitter::new(cmd))).await?,
        None if request.dry_run => run_interruptible(cfg, request, Arc::new(DryRunSubmitter)).await?,
        None => bail!("[backend].submit_cmd is required unless --dry-run is given"),
    };

    if let Some(path) = &args.report {
        write_report(&RealFileSystem, &PathBuf::from(path), &outcome)?;
    }
    print_summary(&outcome);

    if !outcome.is_success() {
        bail!("{} unit(s) failed", outcome.failures.len());
    }
    Ok(())
}

/// Run `request` against a validated pipeline with the given submitter.
///
/// Library entry point; the CLI goes through [`run`].
pub async fn run_pipeline<S: JobSubmitter + 'static>(
    cfg: PipelineFile,
    request: RunRequest,
    submitter: Arc<S>,
) -> crate::errors::Result<RunOutcome> {
    let options = cfg.backend.run_options();
    info!(pipeline = %cfg.name, "loaded pipeline");
    Orchestrator::new(cfg.graph, submitter)
        .with_options(options)
        .run(request)
        .await
}

async fn run_interruptible<S: JobSubmitter + 'static>(
    cfg: PipelineFile,
    request: RunRequest,
    submitter: Arc<S>,
) -> Result<RunOutcome> {
    tokio::select! {
        outcome = run_pipeline(cfg, request, submitter) => Ok(outcome?),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            warn!("interrupted; in-flight submissions were cancelled");
            bail!("interrupted")
        }
    }
}

/// Translate CLI arguments into a [`RunRequest`], filling in the default
/// run id and output directory.
pub fn build_request(args: &CliArgs) -> RunRequest {
    let run_id = args
        .run_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| default_run_id(&args.user_id));
    let output_dir = match &args.output {
        Some(dir) if !dir.trim().is_empty() => ensure_trailing_slash(dir),
        _ => default_output_dir(&args.team_id, &run_id),
    };

    let split_paths = |pairs: &[(String, String)]| -> BTreeMap<StageId, Vec<String>> {
        pairs
            .iter()
            .map(|(stage, paths)| {
                let list = paths
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
                (stage.clone(), list)
            })
            .collect()
    };

    RunRequest {
        stages: args.stages.clone(),
        stage_args: args.stage_args.iter().cloned().collect(),
        alt_inputs: split_paths(&args.alt_inputs),
        alt_outputs: split_paths(&args.alt_outputs),
        inputs: args
            .input
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        sample_ids: args.sample_ids.clone(),
        output_dir,
        run_id,
        team_id: args.team_id.clone(),
        user_id: args.user_id.clone(),
        queue: args.queue.clone(),
        dry_run: args.dry_run,
    }
}

/// `<user>-<unix seconds>`.
pub fn default_run_id(user_id: &str) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{user_id}-{secs}")
}

/// `s3://hubtenants/<team>/runs/<run_id>/`.
pub fn default_output_dir(team_id: &str, run_id: &str) -> String {
    format!("{DEFAULT_OUTPUT_ROOT}/{team_id}/runs/{run_id}/")
}

fn print_summary(outcome: &RunOutcome) {
    println!("run {}", outcome.run_id);
    for (stage, jobs) in &outcome.dependencies {
        println!("  {stage}:");
        for (sample, job) in jobs {
            println!("    {sample}: {job}");
        }
    }
    if !outcome.failures.is_empty() {
        println!("failed units ({}):", outcome.failures.len());
        for f in &outcome.failures {
            println!("  {} / {}: {}", f.stage, f.sample, f.failure);
        }
    }
}
