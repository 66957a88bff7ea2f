// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::config::model::{BackendSettings, PipelineFile, RawPipelineFile, RawStageConfig};
use crate::dag::{PipelineGraph, Slot, StageSpec, normalize_stage_name};
use crate::errors::{PipedagError, Result};
use crate::paths::patterns::{FilePattern, InputPattern};
use crate::types::{ComputeSizing, StageId, parse_duration};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = PipedagError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        let slots = parse_order(&raw)?;
        validate_stage_sections(&raw, &slots)?;

        let mut stages: BTreeMap<StageId, StageSpec> = BTreeMap::new();
        for (raw_id, cfg) in raw.stage.iter() {
            let spec = build_stage(raw_id, cfg)?;
            stages.insert(spec.id.clone(), spec);
        }

        let graph = PipelineGraph::new(slots, stages);
        graph.validate()?;
        let backend = build_backend(&raw)?;

        let name = raw
            .pipeline
            .name
            .clone()
            .unwrap_or_else(|| "pipeline".to_string());

        Ok(PipelineFile {
            name,
            graph,
            backend,
        })
    }
}

fn parse_order(raw: &RawPipelineFile) -> Result<Vec<Slot>> {
    let slots: Vec<Slot> = raw
        .pipeline
        .order
        .iter()
        .map(|entry| Slot::parse(entry))
        .filter(|slot| !slot.entries.is_empty())
        .collect();

    if slots.is_empty() {
        return Err(PipedagError::ConfigError(
            "[pipeline].order must list at least one stage".to_string(),
        ));
    }

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for entry in slots.iter().flat_map(|s| s.entries.iter()) {
        if !seen.insert(entry.name.as_str()) {
            warn!(
                stage = %entry.name,
                "stage listed at several positions; its last position is used"
            );
        }
    }

    Ok(slots)
}

fn validate_stage_sections(raw: &RawPipelineFile, slots: &[Slot]) -> Result<()> {
    for entry in slots.iter().flat_map(|s| s.entries.iter()) {
        if !raw
            .stage
            .keys()
            .any(|id| normalize_stage_name(id) == entry.name)
        {
            return Err(PipedagError::ConfigError(format!(
                "stage '{}' is listed in [pipeline].order but has no [stage.{}] section",
                entry.name, entry.name
            )));
        }
    }

    for id in raw.stage.keys() {
        let name = normalize_stage_name(id);
        if name.is_empty() {
            return Err(PipedagError::ConfigError(format!(
                "invalid stage name '{id}'"
            )));
        }
        if !slots.iter().any(|s| s.contains(&name)) {
            return Err(PipedagError::ConfigError(format!(
                "[stage.{id}] is not listed in [pipeline].order"
            )));
        }
    }
    Ok(())
}

fn build_stage(raw_id: &str, cfg: &RawStageConfig) -> Result<StageSpec> {
    let id = normalize_stage_name(raw_id);
    let pattern_error = |field: &str, e: String| {
        PipedagError::ConfigError(format!("stage '{id}' has an invalid `{field}` entry: {e}"))
    };

    let input_patterns = non_empty(&cfg.input_file)
        .map(InputPattern::parse)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| pattern_error("input_file", e))?;
    let ignore_patterns = non_empty(&cfg.ignore)
        .map(FilePattern::parse)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| pattern_error("ignore", e))?;
    let output_patterns = non_empty(&cfg.output).map(str::to_string).collect();

    let explicit_predecessors = cfg.previous_module.as_deref().map(|list| {
        list.split(',')
            .map(normalize_stage_name)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });

    Ok(StageSpec {
        id: id.clone(),
        stage_type: cfg.module_type,
        input_patterns,
        ignore_patterns,
        output_patterns,
        submodule: cfg.submodule.clone().filter(|s| !s.trim().is_empty()),
        explicit_predecessors,
        compute: cfg.compute,
    })
}

fn non_empty(values: &[String]) -> impl Iterator<Item = &str> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn build_backend(raw: &RawPipelineFile) -> Result<BackendSettings> {
    let b = &raw.backend;
    if b.max_in_flight == 0 {
        return Err(PipedagError::ConfigError(
            "[backend].max_in_flight must be >= 1 (got 0)".to_string(),
        ));
    }

    let submit_timeout = b
        .submit_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| PipedagError::ConfigError(format!("[backend].submit_timeout: {e}")))?;

    Ok(BackendSettings {
        queue: b.queue.clone(),
        submit_cmd: b.submit_cmd.clone().filter(|c| !c.trim().is_empty()),
        submit_timeout,
        max_in_flight: b.max_in_flight,
        compute: ComputeSizing {
            vcpus: b.vcpus,
            memory: b.memory,
        },
    })
}
