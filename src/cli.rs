// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `pipedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipedag",
    version,
    about = "Submit the stages of a sample pipeline as dependent batch jobs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline definition (TOML).
    #[arg(long, short = 'p', value_name = "PATH", default_value = "Pipedag.toml")]
    pub pipeline: String,

    /// Stages to run, in order, comma-separated (e.g. `fastqc,bwamem,deseq2`).
    #[arg(long, short = 'm', value_name = "STAGES", value_delimiter = ',', required = true)]
    pub stages: Vec<String>,

    /// Initial inputs, comma-separated. Each entry is a file, `dir/*`,
    /// `dir/**`, `dir/<pattern>` (e.g. `dir/^fastq.gz`) or `dir/<glob>`.
    #[arg(long, short = 'i', value_name = "LOCATIONS", value_delimiter = ',', required = true)]
    pub input: Vec<String>,

    /// Base output directory. Default: `s3://hubtenants/<team>/runs/<run_id>/`.
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<String>,

    /// Run id. Default: `<user>-<unix seconds>`.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    #[arg(long, value_name = "ID")]
    pub team_id: String,

    #[arg(long, value_name = "ID")]
    pub user_id: String,

    /// Sample ids for the input locations, comma-separated, one per location.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub sample_ids: Vec<String>,

    /// Extra arguments for a stage, as `STAGE=ARGS`. Repeatable.
    #[arg(long, value_name = "STAGE=ARGS", value_parser = parse_stage_value)]
    pub stage_args: Vec<(String, String)>,

    /// Alternate inputs for a stage, as `STAGE=PATH[,PATH...]`. Repeatable.
    #[arg(long, value_name = "STAGE=PATHS", value_parser = parse_stage_value)]
    pub alt_inputs: Vec<(String, String)>,

    /// Alternate outputs for a stage, as `STAGE=PATH[,PATH...]`. Repeatable.
    #[arg(long, value_name = "STAGE=PATHS", value_parser = parse_stage_value)]
    pub alt_outputs: Vec<(String, String)>,

    /// Job queue; overrides `[backend].queue`.
    #[arg(long, value_name = "QUEUE")]
    pub queue: Option<String>,

    /// Plan and report every job without submitting anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the job ids and failures of the run to this TOML file.
    #[arg(long, value_name = "PATH")]
    pub report: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse `STAGE=VALUE`. The value may be empty.
fn parse_stage_value(s: &str) -> Result<(String, String), String> {
    let (stage, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected STAGE=VALUE, got '{s}'"))?;
    let stage = stage.trim();
    if stage.is_empty() {
        return Err(format!("missing stage name in '{s}'"));
    }
    Ok((stage.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
