// src/samples/mod.rs

//! Sample grouping.
//!
//! - [`naming`] infers sample ids from file names.
//! - [`grouping`] partitions initial inputs into sample groups and decides
//!   which samples each stage processes.

pub mod grouping;
pub mod naming;

pub use grouping::{
    InputSpec, SampleGroups, combined_sample_id, initial_groups, next_stage_samples,
};
pub use naming::{SampleIdStrategy, SequencingFileNames};
