// src/dag/graph.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::stage::{StageSpec, normalize_stage_name};
use crate::errors::{PipedagError, Result};
use crate::types::StageId;

/// One stage name listed at a declared position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    pub name: StageId,
    /// Declared with a leading `*`: never inferred as a predecessor.
    pub excluded_by_default: bool,
}

/// A declared position of the pipeline order. Lists one or more
/// alternative stages, e.g. `"rnastar, bwamem"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub entries: Vec<SlotEntry>,
}

impl Slot {
    /// Parse one entry of the declared order.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SlotEntry {
                name: normalize_stage_name(s),
                excluded_by_default: s.starts_with('*'),
            })
            .filter(|e| !e.name.is_empty())
            .collect();
        Self { entries }
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.entries.iter().any(|e| e.name == stage)
    }
}

/// Ordered pipeline declaration plus the stage table.
///
/// Built from a validated [`crate::config::PipelineFile`]; every name that
/// appears in a slot has a [`StageSpec`].
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    slots: Vec<Slot>,
    stages: BTreeMap<StageId, StageSpec>,
}

impl PipelineGraph {
    pub fn new(slots: Vec<Slot>, stages: BTreeMap<StageId, StageSpec>) -> Self {
        Self { slots, stages }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageSpec> {
        self.stages.values()
    }

    pub fn stage(&self, id: &str) -> Option<&StageSpec> {
        self.stages.get(id)
    }

    /// Like [`Self::stage`], but a missing stage is an error.
    pub fn require_stage(&self, id: &str) -> Result<&StageSpec> {
        self.stage(id)
            .ok_or_else(|| PipedagError::StageNotFound(id.to_string()))
    }

    /// Last declared position that lists `id`.
    ///
    /// A name repeated at several positions resolves to the last one, so the
    /// backward scan starts from its latest occurrence.
    pub fn stage_index(&self, id: &str) -> Result<usize> {
        let id = normalize_stage_name(id);
        self.slots
            .iter()
            .rposition(|slot| slot.contains(&id))
            .ok_or(PipedagError::StageNotFound(id))
    }

    /// Check explicit predecessors: every name must be a known stage other
    /// than the stage itself, and together they must not form a cycle.
    pub fn validate(&self) -> Result<()> {
        for (id, stage) in &self.stages {
            for pred in stage.explicit_predecessors.iter().flatten() {
                if !self.stages.contains_key(pred) {
                    return Err(PipedagError::ConfigError(format!(
                        "stage '{id}' has unknown predecessor '{pred}' in `previous_module`"
                    )));
                }
                if pred == id {
                    return Err(PipedagError::ConfigError(format!(
                        "stage '{id}' cannot be its own predecessor"
                    )));
                }
            }
        }

        // Edge direction: predecessor -> stage.
        let mut deps: DiGraphMap<&str, ()> = DiGraphMap::new();
        for id in self.stages.keys() {
            deps.add_node(id.as_str());
        }
        for (id, stage) in &self.stages {
            for pred in stage.explicit_predecessors.iter().flatten() {
                deps.add_edge(pred.as_str(), id.as_str(), ());
            }
        }

        match toposort(&deps, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(PipedagError::DagCycle(format!(
                "cycle in `previous_module` involving stage '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Stages whose outputs feed `stage` within this run.
    ///
    /// Explicit predecessors are returned as declared. Otherwise the declared
    /// positions before `stage` are scanned backwards, stopping at the
    /// position of the first requested stage; the first alternative that was
    /// requested and is not `*`-marked wins.
    pub fn predecessors_of(&self, stage: &str, requested: &[StageId]) -> Vec<StageId> {
        if let Some(explicit) = self
            .stage(stage)
            .and_then(|s| s.explicit_predecessors.as_ref())
        {
            return explicit.clone();
        }

        let Some(first_requested) = requested.first() else {
            return Vec::new();
        };
        let (Ok(current), Ok(start)) = (self.stage_index(stage), self.stage_index(first_requested))
        else {
            return Vec::new();
        };

        for position in (start..current).rev() {
            let found = self.slots[position]
                .entries
                .iter()
                .find(|e| !e.excluded_by_default && requested.iter().any(|r| *r == e.name));
            if let Some(entry) = found {
                debug!(stage, predecessor = %entry.name, position, "inferred predecessor");
                return vec![entry.name.clone()];
            }
        }

        Vec::new()
    }
}
