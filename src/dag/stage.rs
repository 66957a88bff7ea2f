// src/dag/stage.rs

use crate::paths::patterns::{FilePattern, InputPattern};
use crate::types::{ComputeSizing, StageId, StageType};

/// One validated stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub id: StageId,
    pub stage_type: StageType,
    /// Selects what this stage consumes from its predecessors, in order.
    pub input_patterns: Vec<InputPattern>,
    /// File names matching any of these are dropped from resolved inputs.
    pub ignore_patterns: Vec<FilePattern>,
    /// Output file templates relative to the stage output directory.
    /// May contain `<sample_id>`; `<folder>` stands for the directory itself.
    pub output_patterns: Vec<String>,
    pub submodule: Option<String>,
    /// Overrides declaration-order predecessor inference when set.
    pub explicit_predecessors: Option<Vec<StageId>>,
    pub compute: ComputeSizing,
}

impl StageSpec {
    /// A linear stage with no patterns or overrides.
    pub fn new(id: impl Into<StageId>) -> Self {
        Self {
            id: id.into(),
            stage_type: StageType::Linear,
            input_patterns: Vec::new(),
            ignore_patterns: Vec::new(),
            output_patterns: Vec::new(),
            submodule: None,
            explicit_predecessors: None,
            compute: ComputeSizing::default(),
        }
    }

    pub fn is_merge(&self) -> bool {
        self.stage_type == StageType::Merge
    }
}

/// Marker characters that may decorate a stage name in a declared order or
/// a requested stage list.
pub const STAGE_NAME_MARKERS: [char; 4] = [' ', '^', '*', '~'];

/// Strip decoration markers from both ends of a stage name.
pub fn normalize_stage_name(raw: &str) -> String {
    raw.trim_matches(STAGE_NAME_MARKERS.as_slice()).to_string()
}
