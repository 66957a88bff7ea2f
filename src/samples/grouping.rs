// src/samples/grouping.rs

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dag::StageSpec;
use crate::engine::tracker::DependencyTracker;
use crate::errors::{PipedagError, Result};
use crate::fs::{FileSystem, list_files, list_files_glob};
use crate::paths::patterns::FilePattern;
use crate::paths::template::{ensure_trailing_slash, file_name, parent_dir};
use crate::samples::naming::SampleIdStrategy;
use crate::types::{SampleId, StageType};

const GLOB_METACHARS: [char; 4] = ['*', '?', '[', '{'];

/// Suffix of the single group a merge stage collapses into.
pub const COMBINED_SUFFIX: &str = "_combined";

/// Synthetic group id of a merge stage: `<run_id>_combined`.
pub fn combined_sample_id(run_id: &str) -> SampleId {
    format!("{run_id}{COMBINED_SUFFIX}")
}

/// One initial input location as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// A single file.
    File(String),
    /// `dir/*` lists all files; `dir/**` lists them for sample inference but
    /// keeps the folder itself as the group's input.
    Directory { dir: String, keep_folder: bool },
    /// `dir/<pattern>` where the last segment uses the `^` vocabulary.
    Pattern { dir: String, pattern: FilePattern },
    /// `dir/<glob>` such as `dir/*_R1.fastq.gz`.
    Glob { dir: String, glob: String },
}

impl InputSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PipedagError::ConfigError("empty input location".into()));
        }

        if let Some(dir) = raw.strip_suffix("/**") {
            return Ok(InputSpec::Directory {
                dir: ensure_trailing_slash(dir),
                keep_folder: true,
            });
        }
        if let Some(dir) = raw.strip_suffix("/*") {
            return Ok(InputSpec::Directory {
                dir: ensure_trailing_slash(dir),
                keep_folder: false,
            });
        }

        let last = file_name(raw);
        let dir = ensure_trailing_slash(parent_dir(raw));
        if last.contains('^') {
            let pattern = FilePattern::parse(last).map_err(PipedagError::ConfigError)?;
            return Ok(InputSpec::Pattern { dir, pattern });
        }
        if last.contains(GLOB_METACHARS) {
            return Ok(InputSpec::Glob {
                dir,
                glob: last.to_string(),
            });
        }

        Ok(InputSpec::File(raw.to_string()))
    }

    /// Parse a comma-delimited list of locations.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(InputSpec::parse)
            .collect()
    }
}

/// Sample id → input files. Files keep insertion order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleGroups {
    groups: BTreeMap<SampleId, Vec<String>>,
}

impl SampleGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sample: &str, file: &str) {
        let files = self.groups.entry(sample.to_string()).or_default();
        if !files.iter().any(|f| f == file) {
            files.push(file.to_string());
        }
    }

    /// Replace the files of `sample` with a single location.
    pub fn set(&mut self, sample: &str, file: &str) {
        self.groups.insert(sample.to_string(), vec![file.to_string()]);
    }

    pub fn files(&self, sample: &str) -> &[String] {
        self.groups.get(sample).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All files of every group, in sample order, without duplicates.
    pub fn all_files(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for f in self.groups.values().flatten() {
            if !all.contains(f) {
                all.push(f.clone());
            }
        }
        all
    }

    pub fn sample_ids(&self) -> Vec<SampleId> {
        self.groups.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SampleId, &Vec<String>)> {
        self.groups.iter()
    }
}

/// Partition the initial inputs into sample groups.
///
/// With `explicit_ids`, the i-th id names every file of the i-th spec and
/// the list must be as long as `specs`. A location that cannot be listed is
/// logged and contributes nothing.
pub fn initial_groups(
    specs: &[InputSpec],
    explicit_ids: &[SampleId],
    fs: &dyn FileSystem,
    strategy: &dyn SampleIdStrategy,
) -> Result<SampleGroups> {
    if !explicit_ids.is_empty() && explicit_ids.len() != specs.len() {
        return Err(PipedagError::ConfigError(format!(
            "{} sample ids given for {} input locations",
            explicit_ids.len(),
            specs.len()
        )));
    }

    let mut groups = SampleGroups::new();
    for (idx, spec) in specs.iter().enumerate() {
        let explicit = explicit_ids.get(idx).map(String::as_str);
        let sample_of = |path: &str| match explicit {
            Some(id) => id.to_string(),
            None => strategy.infer(path),
        };

        let listed = match spec {
            InputSpec::File(path) => {
                groups.add(&sample_of(path), path);
                continue;
            }
            InputSpec::Directory { dir, .. } => list_files(fs, dir, &[], &[]),
            InputSpec::Pattern { dir, pattern } => {
                list_files(fs, dir, std::slice::from_ref(pattern), &[])
            }
            InputSpec::Glob { dir, glob } => list_files_glob(fs, dir, glob),
        };

        let files = match listed {
            Ok(files) => files,
            Err(e) => {
                warn!(?spec, error = %e, "could not list input location");
                continue;
            }
        };
        debug!(?spec, files = files.len(), "listed input location");

        for f in &files {
            let sample = sample_of(f);
            match spec {
                InputSpec::Directory {
                    dir,
                    keep_folder: true,
                } => groups.set(&sample, dir),
                _ => groups.add(&sample, f),
            }
        }
    }

    Ok(groups)
}

/// Sample ids a stage processes, given which predecessors ran.
///
/// - no predecessors: the initial ids
/// - merge stage fed by a linear predecessor: the single combined group
/// - otherwise the union of ids recorded for tracked predecessors, or the
///   initial ids if none of them is tracked
pub fn next_stage_samples(
    stage: &StageSpec,
    predecessors: &[&StageSpec],
    tracker: &DependencyTracker,
    initial_ids: &[SampleId],
    run_id: &str,
) -> Vec<SampleId> {
    if predecessors.is_empty() {
        return initial_ids.to_vec();
    }

    if stage.is_merge()
        && predecessors
            .iter()
            .any(|p| p.stage_type == StageType::Linear)
    {
        return vec![combined_sample_id(run_id)];
    }

    let tracked: Vec<&&StageSpec> = predecessors
        .iter()
        .filter(|p| tracker.is_tracked(&p.id))
        .collect();
    if tracked.is_empty() {
        debug!(stage = %stage.id, "no predecessor ran in this run, using initial samples");
        return initial_ids.to_vec();
    }

    let mut samples: Vec<SampleId> = Vec::new();
    for pred in tracked {
        for s in tracker.samples_of(&pred.id) {
            if !samples.contains(&s) {
                samples.push(s);
            }
        }
    }
    samples
}
