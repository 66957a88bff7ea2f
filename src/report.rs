// src/report.rs

//! TOML run report: recorded job ids and failed units.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::engine::RunOutcome;
use crate::errors::Result;
use crate::fs::FileSystem;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    pub submitted: usize,
    pub failed: usize,
    /// stage → sample → job id
    pub jobs: BTreeMap<String, BTreeMap<String, String>>,
    pub failures: Vec<FailedUnit>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedUnit {
    pub stage: String,
    pub sample: String,
    pub reason: String,
}

impl From<&RunOutcome> for RunReport {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            run_id: outcome.run_id.clone(),
            submitted: outcome.submitted_count(),
            failed: outcome.failures.len(),
            jobs: outcome.dependencies.clone(),
            failures: outcome
                .failures
                .iter()
                .map(|f| FailedUnit {
                    stage: f.stage.clone(),
                    sample: f.sample.clone(),
                    reason: f.failure.to_string(),
                })
                .collect(),
        }
    }
}

impl RunReport {
    pub fn to_toml(&self) -> Result<String> {
        let text = toml::to_string(self).context("serializing run report")?;
        Ok(text)
    }
}

/// Write the report for `outcome` to `path`.
pub fn write_report(fs: &dyn FileSystem, path: &Path, outcome: &RunOutcome) -> Result<()> {
    let text = RunReport::from(outcome).to_toml()?;
    fs.write(path, text.as_bytes())?;
    info!(path = %path.display(), "run report written");
    Ok(())
}
