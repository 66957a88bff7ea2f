// src/config/mod.rs

//! Pipeline definition loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file (`loader.rs`).
//! - Validate it into a [`PipelineGraph`](crate::dag::PipelineGraph)
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_pipeline_path, load_and_validate, load_from_path, load_with};
pub use model::{
    BackendSection, BackendSettings, PipelineFile, PipelineSection, RawPipelineFile,
    RawStageConfig,
};
