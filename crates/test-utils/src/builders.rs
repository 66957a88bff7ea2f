#![allow(dead_code)]

use std::collections::BTreeMap;

use pipedag::config::{BackendSection, PipelineFile, PipelineSection, RawPipelineFile, RawStageConfig};
use pipedag::engine::RunRequest;
use pipedag::types::{ComputeSizing, StageType};

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineBuilder {
    raw: RawPipelineFile,
}

impl PipelineBuilder {
    /// `order` entries use the same syntax as `[pipeline].order`.
    pub fn new(order: &[&str]) -> Self {
        Self {
            raw: RawPipelineFile {
                pipeline: PipelineSection {
                    name: Some("test".to_string()),
                    order: order.iter().map(|s| s.to_string()).collect(),
                },
                stage: BTreeMap::new(),
                backend: BackendSection::default(),
            },
        }
    }

    pub fn with_stage(mut self, name: &str, stage: RawStageConfig) -> Self {
        self.raw.stage.insert(name.to_string(), stage);
        self
    }

    pub fn submit_timeout(mut self, duration: &str) -> Self {
        self.raw.backend.submit_timeout = Some(duration.to_string());
        self
    }

    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.raw.backend.max_in_flight = n;
        self
    }

    pub fn default_compute(mut self, vcpus: u32, memory: u32) -> Self {
        self.raw.backend.vcpus = Some(vcpus);
        self.raw.backend.memory = Some(memory);
        self
    }

    pub fn raw(self) -> RawPipelineFile {
        self.raw
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.raw).expect("Failed to build valid pipeline from builder")
    }
}

/// Builder for `RawStageConfig`.
pub struct StageConfigBuilder {
    stage: RawStageConfig,
}

impl StageConfigBuilder {
    pub fn linear() -> Self {
        Self {
            stage: RawStageConfig::default(),
        }
    }

    pub fn merge() -> Self {
        let mut stage = RawStageConfig::default();
        stage.module_type = StageType::Merge;
        Self { stage }
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.stage.input_file.push(pattern.to_string());
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.stage.ignore.push(pattern.to_string());
        self
    }

    pub fn output(mut self, template: &str) -> Self {
        self.stage.output.push(template.to_string());
        self
    }

    pub fn submodule(mut self, name: &str) -> Self {
        self.stage.submodule = Some(name.to_string());
        self
    }

    pub fn after(mut self, predecessors: &str) -> Self {
        self.stage.previous_module = Some(predecessors.to_string());
        self
    }

    pub fn compute(mut self, vcpus: u32, memory: u32) -> Self {
        self.stage.compute = ComputeSizing {
            vcpus: Some(vcpus),
            memory: Some(memory),
        };
        self
    }

    pub fn build(self) -> RawStageConfig {
        self.stage
    }
}

/// A request for `stages` over `inputs`, writing under `/out/`.
pub fn request(stages: &[&str], inputs: &[&str]) -> RunRequest {
    RunRequest {
        stages: stages.iter().map(|s| s.to_string()).collect(),
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
        output_dir: "/out/".to_string(),
        run_id: "run1".to_string(),
        team_id: "team1".to_string(),
        user_id: "user1".to_string(),
        ..Default::default()
    }
}
