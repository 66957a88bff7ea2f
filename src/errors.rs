// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("Cycle detected in explicit predecessors: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a single (stage, sample) unit could not be submitted.
///
/// Unit failures never abort a run; they are collected next to the
/// dependency map so callers can re-run only what failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitFailure {
    #[error("could not resolve inputs: {0}")]
    Resolution(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipedagError>;
