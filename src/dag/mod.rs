// src/dag/mod.rs

//! Pipeline DAG representation.
//!
//! - [`graph`] holds the declared stage order and answers predecessor
//!   queries.
//! - [`stage`] defines the validated per-stage metadata.

pub mod graph;
pub mod stage;

pub use graph::{PipelineGraph, Slot, SlotEntry};
pub use stage::{StageSpec, normalize_stage_name};
