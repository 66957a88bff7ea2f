// src/engine/resolver.rs

//! Input resolution for one (stage, sample) unit.

use tracing::debug;

use crate::dag::StageSpec;
use crate::engine::tracker::DependencyTracker;
use crate::errors::UnitFailure;
use crate::paths::patterns::{FilePattern, InputPattern, matches_any};
use crate::paths::template::{FOLDER, Placeholders, SAMPLE_ID, ensure_trailing_slash, file_name, join};
use crate::samples::SampleGroups;
use crate::types::{SampleId, StageType};

/// `base/stage/`, trailing-slash normalised.
pub fn stage_output_dir(base: &str, stage: &str) -> String {
    ensure_trailing_slash(&join(base, stage))
}

/// Concrete input locations for `stage` processing `sample`.
///
/// Tracked predecessors contribute their declared outputs (or output
/// directories, for `<folder>` patterns). When nothing is contributed the
/// unit falls back to its initial input group. A merge unit without a group
/// of its own takes every initial input, unless a predecessor ran and left
/// nothing to consume.
pub fn resolve_inputs(
    stage: &StageSpec,
    predecessors: &[&StageSpec],
    sample: &str,
    tracker: &DependencyTracker,
    groups: &SampleGroups,
    base_output_dir: &str,
) -> Result<Vec<String>, UnitFailure> {
    let mut inputs: Vec<String> = Vec::new();
    let mut any_tracked = false;

    for pred in predecessors {
        if !tracker.is_tracked(&pred.id) {
            debug!(stage = %stage.id, predecessor = %pred.id, "predecessor not part of this run");
            continue;
        }
        any_tracked = true;

        let fan_in = stage.is_merge() && pred.stage_type == StageType::Linear;
        let upstream_samples: Vec<SampleId> = if fan_in {
            tracker.samples_of(&pred.id)
        } else {
            if tracker.job_id(&pred.id, sample).is_none() {
                return Err(UnitFailure::Resolution(format!(
                    "predecessor '{}' has no job for sample '{sample}'",
                    pred.id
                )));
            }
            vec![sample.to_string()]
        };

        let pred_dir = stage_output_dir(base_output_dir, &pred.id);
        for path in predecessor_outputs(stage, pred, &pred_dir, &upstream_samples) {
            if !inputs.contains(&path) {
                inputs.push(path);
            }
        }
    }

    if !stage.ignore_patterns.is_empty() {
        inputs.retain(|p| !matches_any(entry_name(p), &stage.ignore_patterns));
    }

    if inputs.is_empty() {
        inputs = match groups.files(sample) {
            [] if stage.is_merge() && !any_tracked => groups.all_files(),
            files => files.to_vec(),
        };
        if !inputs.is_empty() {
            debug!(stage = %stage.id, sample, "using initial inputs");
        }
    }

    if inputs.is_empty() {
        return Err(UnitFailure::Resolution(format!(
            "no inputs found for stage '{}' sample '{sample}'",
            stage.id
        )));
    }

    Ok(inputs)
}

fn predecessor_outputs(
    stage: &StageSpec,
    pred: &StageSpec,
    pred_dir: &str,
    samples: &[SampleId],
) -> Vec<String> {
    let any = [InputPattern::File(FilePattern::Any)];
    let patterns: &[InputPattern] = if stage.input_patterns.is_empty() {
        &any
    } else {
        &stage.input_patterns
    };

    let vars_for = |sample: &SampleId| {
        Placeholders::new()
            .with(FOLDER, "")
            .with(SAMPLE_ID, sample.as_str())
    };

    // Declared outputs stay grouped: every sample's `.bam` before any `.bai`.
    let mut out = Vec::new();
    for pattern in patterns {
        match pattern {
            InputPattern::Folder(template) => {
                for sample in samples {
                    let dir = join(pred_dir, &vars_for(sample).expand(template));
                    out.push(ensure_trailing_slash(&dir));
                }
            }
            InputPattern::File(file_pattern) => {
                for template in &pred.output_patterns {
                    for sample in samples {
                        let path = join(pred_dir, &vars_for(sample).expand(template));
                        if file_pattern.matches(entry_name(&path)) {
                            out.push(path);
                        }
                    }
                }
            }
        }
    }
    out
}

/// Name used for pattern matching; directories match by their own name.
fn entry_name(path: &str) -> &str {
    file_name(path.trim_end_matches('/'))
}
