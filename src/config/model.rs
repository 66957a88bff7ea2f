// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::PipelineGraph;
use crate::engine::RunOptions;
use crate::types::{ComputeSizing, StageType};

/// Pipeline definition exactly as read from TOML.
///
/// ```toml
/// [pipeline]
/// name = "rnaseq"
/// order = ["*fastqc", "rnastar, bwamem", "deseq2"]
///
/// [stage.bwamem]
/// input_file = ["^.fastq.gz"]
/// output = ["<sample_id>.bam"]
///
/// [stage.deseq2]
/// module_type = "merge"
/// input_file = ["^.bam"]
///
/// [backend]
/// submit_cmd = "./submit.sh"
/// submit_timeout = "30s"
/// ```
///
/// Turn it into a [`PipelineFile`] with `PipelineFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineFile {
    pub pipeline: PipelineSection,

    /// All stages from `[stage.<id>]`.
    #[serde(default)]
    pub stage: BTreeMap<String, RawStageConfig>,

    #[serde(default)]
    pub backend: BackendSection,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    #[serde(default)]
    pub name: Option<String>,

    /// Declared positions. Each entry lists one or more alternative stages
    /// separated by commas; a leading `*` keeps a stage out of predecessor
    /// inference.
    pub order: Vec<String>,
}

/// `[stage.<id>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawStageConfig {
    #[serde(default)]
    pub module_type: StageType,

    /// Which predecessor outputs to consume. `<folder>` selects the whole
    /// predecessor output directory.
    #[serde(default)]
    pub input_file: Vec<String>,

    #[serde(default)]
    pub ignore: Vec<String>,

    /// Output templates, e.g. `"<sample_id>.bam"`.
    #[serde(default)]
    pub output: Vec<String>,

    #[serde(default)]
    pub submodule: Option<String>,

    /// Comma-separated explicit predecessors.
    #[serde(default)]
    pub previous_module: Option<String>,

    #[serde(default)]
    pub compute: ComputeSizing,
}

/// `[backend]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    #[serde(default)]
    pub queue: Option<String>,

    /// Shell command run once per unit to submit it.
    #[serde(default)]
    pub submit_cmd: Option<String>,

    /// Duration string such as `"30s"`.
    #[serde(default)]
    pub submit_timeout: Option<String>,

    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default)]
    pub vcpus: Option<u32>,

    /// MiB.
    #[serde(default)]
    pub memory: Option<u32>,
}

fn default_max_in_flight() -> usize {
    8
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            queue: None,
            submit_cmd: None,
            submit_timeout: None,
            max_in_flight: default_max_in_flight(),
            vcpus: None,
            memory: None,
        }
    }
}

/// Validated pipeline definition.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub name: String,
    pub graph: PipelineGraph,
    pub backend: BackendSettings,
}

/// Validated `[backend]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub queue: Option<String>,
    pub submit_cmd: Option<String>,
    pub submit_timeout: Option<Duration>,
    pub max_in_flight: usize,
    pub compute: ComputeSizing,
}

impl BackendSettings {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_in_flight: self.max_in_flight,
            submit_timeout: self.submit_timeout,
            compute_defaults: self.compute,
        }
    }
}
